use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    model::{Gender, User},
    validation::{
        validate_email, validate_gender, validate_password, validate_username, ValidationError,
    },
};

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub gender: String,
    pub password: String,
}

impl UserCreateRequest {
    /// Checks username, email, gender, password in that order; first failure wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_gender(&self.gender)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdateRequest {
    /// Same order as [`UserCreateRequest::validate`], skipping absent fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(gender) = &self.gender {
            validate_gender(gender)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            gender: u.gender,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

/// Trimmed, lower-cased form used for every email comparison.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
