use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::{
    auth::password::CredentialError,
    users::{repo::StoreError, validation::ValidationError},
};

/// Process-level failures. A request that hits one of these fails closed.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("password hashing unavailable: {0}")]
    HashingUnavailable(String),
    #[error("token signing unavailable: {0}")]
    SigningUnavailable(String),
}

/// JSON error envelope returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub(crate) fn error_response(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message: message.into(),
            details,
        },
    };
    (status, Json(body)).into_response()
}

/// Error type returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid email or password")]
    Credential(#[from] CredentialError),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => ApiError::Conflict(field),
            StoreError::NotFound(_) => ApiError::UserNotFound,
            other => ApiError::Storage(other),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Credential(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Fatal(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Credential(_) => "INVALID_CREDENTIALS",
            Self::Conflict("username") => "USERNAME_TAKEN",
            Self::Conflict("email") => "EMAIL_TAKEN",
            Self::Conflict(_) => "CONFLICT",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Fatal(_) | Self::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Fatal(_) | Self::Storage(_) => {
                error!(error = ?self, "internal error");
                error_response(
                    self.status_code(),
                    self.error_code(),
                    "Internal server error",
                    None,
                )
            }
            Self::Validation(v) => {
                let details = serde_json::json!({ "field": v.field, "rule": v.rule });
                error_response(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    v.to_string(),
                    Some(details),
                )
            }
            other => error_response(other.status_code(), other.error_code(), other.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::validation::{Field, Rule};

    #[test]
    fn status_classes_keep_unauthorized_apart_from_internal() {
        assert_eq!(
            ApiError::from(CredentialError::InvalidCredential).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(FatalError::HashingUnavailable("rng".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(FatalError::SigningUnavailable("key".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_duplicates_become_conflicts() {
        let err = ApiError::from(StoreError::Duplicate("email"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "EMAIL_TAKEN");

        let err = ApiError::from(StoreError::NotFound(7));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_error_maps_to_bad_request() {
        let err = ApiError::from(ValidationError {
            field: Field::Username,
            rule: Rule::TooShort,
        });
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
