use std::{fmt, str::FromStr};

use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
    pub leeway_secs: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_hours", &self.ttl_hours)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "wishlist".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "wishlist-users".into()),
            ttl_hours: env_or("JWT_TTL_HOURS", 24),
            leeway_secs: env_or("JWT_LEEWAY_SECS", 0),
        };
        let hash = HashConfig {
            memory_kib: env_or("HASH_MEMORY_KIB", argon2::Params::DEFAULT_M_COST),
            iterations: env_or("HASH_ITERATIONS", argon2::Params::DEFAULT_T_COST),
            parallelism: env_or("HASH_PARALLELISM", argon2::Params::DEFAULT_P_COST),
        };
        let listen_addr = format!(
            "{}:{}",
            std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
        );
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            listen_addr,
            jwt,
            hash,
        })
    }
}
