use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::error;

use crate::{config::HashConfig, error::FatalError};

/// Deliberately says nothing about which half of the credential was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credentials")]
    InvalidCredential,
}

const DUMMY_PASSWORD: &[u8] = b"no-such-account";

/// Argon2id hasher with a fixed work factor.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    // PHC string hashed with this hasher's own params.
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub fn from_config(cfg: &HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(DUMMY_PASSWORD, &salt)
            .map_err(|e| anyhow::anyhow!("argon2 self-test failed: {e}"))?
            .to_string();
        Ok(Self {
            argon2,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<String, FatalError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                FatalError::HashingUnavailable(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Checks `plain` against a stored PHC string using the parameters recorded in it.
    /// A corrupt stored hash fails closed as an invalid credential.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<(), CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            CredentialError::InvalidCredential
        })?;
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| CredentialError::InvalidCredential)
    }

    /// Spends one full verification on the dummy hash and always fails.
    /// For logins whose email matches no account.
    pub fn verify_absent(&self, plain: &str) -> CredentialError {
        let _ = self.verify(plain, &self.dummy_hash);
        CredentialError::InvalidCredential
    }

    /// Runs [`Self::hash`] on the blocking pool so request workers stay free.
    pub async fn hash_blocking(&self, plain: String) -> Result<String, FatalError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| FatalError::HashingUnavailable(e.to_string()))?
    }

    /// Runs [`Self::verify`] on the blocking pool. The outer error is a worker failure.
    pub async fn verify_blocking(
        &self,
        plain: String,
        hash: String,
    ) -> Result<Result<(), CredentialError>, FatalError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| FatalError::HashingUnavailable(e.to_string()))
    }

    /// Runs [`Self::verify_absent`] on the blocking pool.
    pub async fn verify_absent_blocking(&self, plain: String) -> Result<CredentialError, FatalError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_absent(&plain))
            .await
            .map_err(|e| FatalError::HashingUnavailable(e.to_string()))
    }
}
