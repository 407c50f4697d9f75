use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Identity,
        dto::{LoginRequest, LoginResponse, MessageResponse, RefreshResponse},
        extractors::AuthUser,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{normalize_email, UserResponse},
        validation::validate_email,
    },
};

const TOKEN_TYPE: &str = "Bearer";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user-login", post(login))
        .route("/user-logout", post(logout))
        .route("/refresh-auth-token", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = normalize_email(&payload.email);
    validate_email(&payload.email)?;

    // Unknown email and wrong password share one answer.
    let user = match state.store.fetch_by_email(&payload.email).await? {
        Some(u) => u,
        None => {
            let err = state.hasher.verify_absent_blocking(payload.password).await?;
            warn!(email = %payload.email, "login unknown email");
            return Err(err.into());
        }
    };

    if let Err(e) = state
        .hasher
        .verify_blocking(payload.password, user.password_hash.clone())
        .await?
    {
        warn!(user_id = user.id, "login invalid password");
        return Err(e.into());
    }

    let issued = state.tokens.issue(&Identity {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    })?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: TOKEN_TYPE,
        expires_in: state.tokens.ttl().whole_seconds(),
        user: UserResponse::from(&user),
    }))
}

/// Tokens cannot be revoked; this only acknowledges the client discarding its token.
#[instrument(skip_all, fields(user_id = auth.user_id))]
pub async fn logout(auth: AuthUser) -> Json<MessageResponse> {
    info!(user_id = auth.user_id, username = %auth.username, "user logged out");
    Json(MessageResponse {
        message: "Logout successful",
    })
}

#[instrument(skip_all, fields(user_id = auth.user_id))]
pub async fn refresh(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<RefreshResponse>, ApiError> {
    let issued = state.tokens.refresh(auth.claims())?;
    info!(user_id = auth.user_id, email = %auth.email, exp = issued.claims.exp, "token refreshed");
    Ok(Json(RefreshResponse {
        token: issued.token,
        token_type: TOKEN_TYPE,
        expires_in: issued.claims.exp - issued.claims.iat,
    }))
}
