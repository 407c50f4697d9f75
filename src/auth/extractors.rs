use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::{
    claims::Claims,
    jwt::{TokenError, TokenIssuer},
};
use crate::error::error_response;

/// Reasons the gate turns a request away. All of them answer 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("missing Authorization header")]
    MissingCredential,
    #[error("invalid Authorization header")]
    MalformedCredential,
    #[error("invalid or expired token")]
    InvalidOrExpiredCredential(TokenError),
}

impl GateError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GateError::MissingCredential => "MISSING_CREDENTIAL",
            GateError::MalformedCredential => "MALFORMED_CREDENTIAL",
            GateError::InvalidOrExpiredCredential(_) => "INVALID_TOKEN",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let mut res = error_response(
            StatusCode::UNAUTHORIZED,
            self.error_code(),
            self.to_string(),
            None,
        );
        res.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        res
    }
}

/// Caller identity established from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    claims: Claims,
}

impl AuthUser {
    /// The verified claims, for operations that re-mint from them.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
            email: claims.email.clone(),
            claims,
        }
    }
}

/// Pulls the token out of a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, GateError> {
    let raw = header.ok_or(GateError::MissingCredential)?;
    let value = raw.to_str().map_err(|_| GateError::MalformedCredential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(GateError::MalformedCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(GateError::MalformedCredential);
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(GateError::MalformedCredential);
    }
    Ok(token)
}

pub fn authenticate(
    header: Option<&HeaderValue>,
    tokens: &TokenIssuer,
) -> Result<AuthUser, GateError> {
    let token = bearer_token(header)?;
    let claims = tokens
        .verify(token)
        .map_err(GateError::InvalidOrExpiredCredential)?;
    Ok(AuthUser::from(claims))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenIssuer>: FromRef<S>,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenIssuer>::from_ref(state);
        authenticate(parts.headers.get(header::AUTHORIZATION), &tokens).map_err(|e| {
            warn!(reason = ?e, method = %parts.method, uri = %parts.uri, "request rejected by auth gate");
            e
        })
    }
}
