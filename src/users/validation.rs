use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::model::Gender;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;
pub const EMAIL_MAX_LENGTH: usize = 100;
pub const PASSWORD_MIN_LENGTH: usize = 8;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
}

/// Which input field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Username,
    Email,
    Gender,
    Password,
}

/// The rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    TooShort,
    TooLong,
    InvalidCharacters,
    InvalidFormat,
    InvalidEnum,
    InsufficientComplexity,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Gender => "gender",
            Field::Password => "password",
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rule::TooShort => "is too short",
            Rule::TooLong => "is too long",
            Rule::InvalidCharacters => {
                "can only contain alphanumeric characters, underscores, and hyphens"
            }
            Rule::InvalidFormat => "has an invalid format",
            Rule::InvalidEnum => "must be one of: male, female, unknown",
            Rule::InsufficientComplexity => {
                "must contain at least one uppercase letter, one lowercase letter, and one number"
            }
        })
    }
}

/// First rule violated by a candidate identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{field} {rule}")]
pub struct ValidationError {
    pub field: Field,
    pub rule: Rule,
}

impl ValidationError {
    fn new(field: Field, rule: Rule) -> Self {
        Self { field, rule }
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LENGTH {
        return Err(ValidationError::new(Field::Username, Rule::TooShort));
    }
    if len > USERNAME_MAX_LENGTH {
        return Err(ValidationError::new(Field::Username, Rule::TooLong));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new(Field::Username, Rule::InvalidCharacters));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > EMAIL_MAX_LENGTH {
        return Err(ValidationError::new(Field::Email, Rule::TooLong));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new(Field::Email, Rule::InvalidFormat));
    }
    Ok(())
}

/// Empty input is accepted and later stored as [`Gender::Unknown`].
pub fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if gender.is_empty() || Gender::from_name(gender).is_some() {
        return Ok(());
    }
    Err(ValidationError::new(Field::Gender, Rule::InvalidEnum))
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::new(Field::Password, Rule::TooShort));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::new(
            Field::Password,
            Rule::InsufficientComplexity,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_of(res: Result<(), ValidationError>) -> Option<(Field, Rule)> {
        res.err().map(|e| (e.field, e.rule))
    }

    #[test]
    fn username_rules() {
        assert_eq!(
            rule_of(validate_username("ab")),
            Some((Field::Username, Rule::TooShort))
        );
        assert_eq!(
            rule_of(validate_username(&"a".repeat(51))),
            Some((Field::Username, Rule::TooLong))
        );
        assert_eq!(
            rule_of(validate_username("john doe")),
            Some((Field::Username, Rule::InvalidCharacters))
        );
        assert_eq!(
            rule_of(validate_username("jöhn")),
            Some((Field::Username, Rule::InvalidCharacters))
        );
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username("john_doe-42").is_ok());
    }

    #[test]
    fn email_rules() {
        assert_eq!(
            rule_of(validate_email("not-an-email")),
            Some((Field::Email, Rule::InvalidFormat))
        );
        assert_eq!(
            rule_of(validate_email("user@host")),
            Some((Field::Email, Rule::InvalidFormat))
        );
        assert_eq!(
            rule_of(validate_email("user@host.c")),
            Some((Field::Email, Rule::InvalidFormat))
        );
        let long = format!("{}@example.com", "a".repeat(90));
        assert_eq!(rule_of(validate_email(&long)), Some((Field::Email, Rule::TooLong)));

        // "@example.com" is 12 characters
        let at_limit = format!("{}@example.com", "a".repeat(88));
        assert_eq!(at_limit.chars().count(), EMAIL_MAX_LENGTH);
        assert!(validate_email(&at_limit).is_ok());
        let over_limit = format!("{}@example.com", "a".repeat(89));
        assert_eq!(over_limit.chars().count(), EMAIL_MAX_LENGTH + 1);
        assert_eq!(
            rule_of(validate_email(&over_limit)),
            Some((Field::Email, Rule::TooLong))
        );
        assert!(validate_email("john.doe+tag@mail.example.org").is_ok());
        assert!(validate_email("a_b%c@sub-domain.io").is_ok());
    }

    #[test]
    fn gender_rules() {
        assert!(validate_gender("").is_ok());
        assert!(validate_gender("male").is_ok());
        assert!(validate_gender("FEMALE").is_ok());
        assert!(validate_gender("Unknown").is_ok());
        assert_eq!(
            rule_of(validate_gender("robot")),
            Some((Field::Gender, Rule::InvalidEnum))
        );
    }

    #[test]
    fn password_rules() {
        assert_eq!(
            rule_of(validate_password("Ab1")),
            Some((Field::Password, Rule::TooShort))
        );
        assert_eq!(
            rule_of(validate_password("alllowercase1")),
            Some((Field::Password, Rule::InsufficientComplexity))
        );
        assert_eq!(
            rule_of(validate_password("ALLUPPERCASE1")),
            Some((Field::Password, Rule::InsufficientComplexity))
        );
        assert_eq!(
            rule_of(validate_password("NoDigitsHere")),
            Some((Field::Password, Rule::InsufficientComplexity))
        );
        assert!(validate_password("Passw0rd").is_ok());
        assert!(validate_password("Secur3 P@ss w0rd!").is_ok());
    }

    #[test]
    fn error_message_names_field_and_rule() {
        let err = validate_username("ab").unwrap_err();
        assert_eq!(err.to_string(), "username is too short");
    }
}
