use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            normalize_email, RegisterResponse, UserCreateRequest, UserResponse, UserUpdateRequest,
        },
        model::{Gender, NewUser},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user-register", post(register))
        .route("/user-profile", get(get_profile))
        .route("/update-user-profile", post(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.email = normalize_email(&payload.email);

    if let Err(e) = payload.validate() {
        warn!(field = %e.field, rule = ?e.rule, "registration rejected");
        return Err(e.into());
    }

    if state.store.exists_by_username(&payload.username).await? {
        warn!(username = %payload.username, "username already registered");
        return Err(ApiError::Conflict("username"));
    }
    if state.store.exists_by_email(&payload.email).await? {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("email"));
    }

    let password_hash = state.hasher.hash_blocking(payload.password).await?;

    let user = state
        .store
        .persist_new(NewUser {
            username: payload.username,
            email: payload.email,
            gender: Gender::parse(&payload.gender),
            password_hash,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully",
            user: UserResponse::from(&user),
        }),
    ))
}

#[instrument(skip_all, fields(user_id = auth.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .fetch_by_id(auth.user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    Ok(Json(UserResponse::from(&user)))
}

#[instrument(skip_all, fields(user_id = auth.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut payload): Json<UserUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(email) = payload.email.as_mut() {
        *email = normalize_email(email);
    }
    if let Err(e) = payload.validate() {
        warn!(field = %e.field, rule = ?e.rule, "profile update rejected");
        return Err(e.into());
    }

    let mut user = state
        .store
        .fetch_by_id(auth.user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if let Some(username) = payload.username {
        if username != user.username {
            if state.store.exists_by_username(&username).await? {
                return Err(ApiError::Conflict("username"));
            }
            user.username = username;
        }
    }

    if let Some(email) = payload.email {
        if email != user.email {
            if state.store.exists_by_email(&email).await? {
                return Err(ApiError::Conflict("email"));
            }
            user.email = email;
        }
    }

    if let Some(gender) = payload.gender {
        user.gender = Gender::parse(&gender);
    }

    let password_changed = payload.password.is_some();
    if let Some(password) = payload.password {
        user.password_hash = state.hasher.hash_blocking(password).await?;
    }

    let user = state.store.persist_update(&user).await?;
    info!(user_id = user.id, password_changed, "profile updated");
    Ok(Json(UserResponse::from(&user)))
}
