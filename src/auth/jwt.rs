use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use super::claims::{Claims, Identity};
use crate::{config::JwtConfig, error::FatalError};

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

impl From<&ErrorKind> for TokenError {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Longest accepted token lifetime (ten years).
pub const MAX_TTL_HOURS: i64 = 24 * 366 * 10;

/// Longest accepted clock-skew allowance (one day).
pub const MAX_LEEWAY_SECS: i64 = 24 * 60 * 60;

/// Rejects anything that is not `header.payload.signature` with a decodable header
/// and a JSON object payload. Runs before any signature work.
fn check_structure(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(TokenError::Malformed),
    };
    decode_header(token).map_err(|_| TokenError::Malformed)?;
    let raw = Base64UrlUnpadded::decode_vec(payload).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&raw)
        .map_err(|_| TokenError::Malformed)?;
    Ok(())
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies HS256 session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    leeway: Duration,
}

impl TokenIssuer {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!cfg.secret.is_empty(), "JWT secret must not be empty");
        anyhow::ensure!(
            cfg.ttl_hours > 0 && cfg.ttl_hours <= MAX_TTL_HOURS,
            "JWT TTL must be between 1 and {MAX_TTL_HOURS} hours"
        );
        anyhow::ensure!(
            (0..=MAX_LEEWAY_SECS).contains(&cfg.leeway_secs),
            "JWT leeway must be between 0 and {MAX_LEEWAY_SECS} seconds"
        );
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::hours(cfg.ttl_hours),
            leeway: Duration::seconds(cfg.leeway_secs),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, FatalError> {
        self.issue_at(identity, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        identity: &Identity,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, FatalError> {
        let iat = now.unix_timestamp();
        self.sign(identity, iat, iat.saturating_add(self.ttl.whole_seconds()))
    }

    /// Mints a new token for already-verified claims. No credential check happens here.
    pub fn refresh(&self, claims: &Claims) -> Result<IssuedToken, FatalError> {
        self.refresh_at(claims, OffsetDateTime::now_utc())
    }

    pub fn refresh_at(
        &self,
        claims: &Claims,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, FatalError> {
        let iat = now.unix_timestamp();
        // The new window must end strictly after the one it replaces.
        let exp = iat
            .saturating_add(self.ttl.whole_seconds())
            .max(claims.exp.saturating_add(1));
        self.sign(&claims.identity(), iat, exp)
    }

    fn sign(&self, identity: &Identity, iat: i64, exp: i64) -> Result<IssuedToken, FatalError> {
        let claims = Claims {
            sub: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode error");
            FatalError::SigningUnavailable(e.to_string())
        })?;
        debug!(user_id = claims.sub, exp = claims.exp, "jwt signed");
        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Expiry is judged against `now` rather than the library's own clock.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        check_structure(token).map_err(|err| {
            debug!(reason = ?err, "jwt rejected before signature check");
            err
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                let err = TokenError::from(e.kind());
                debug!(error = %e, reason = ?err, "jwt rejected");
                err
            })?
            .claims;

        if claims.exp <= claims.iat {
            return Err(TokenError::Malformed);
        }
        if now.unix_timestamp() > claims.exp.saturating_add(self.leeway.whole_seconds()) {
            debug!(user_id = claims.sub, exp = claims.exp, "jwt expired");
            return Err(TokenError::Expired);
        }

        debug!(user_id = claims.sub, "jwt verified");
        Ok(claims)
    }
}
