//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - token signing secret
//!
//! ## Optional
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 8000)
//! - `ACCESS_TOKEN_EXPIRE_MINUTES` - token lifetime (default: 30)
//! - `DATABASE_URL` - Postgres connection string; in-memory store when unset
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 5)
//! - `CORS_ORIGINS` - comma-separated allowed origins
//! - `ADMIN_USERNAME`, `ADMIN_EMAIL`, `ADMIN_PASSWORD` - first administrator,
//!   created at startup when none exists (all three or none)
//! - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS` - password hashing cost (both or none)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use bookstore_auth::DEFAULT_TOKEN_TTL_MINUTES;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:8000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub token_ttl_minutes: i64,
    /// Contains credentials.
    pub database_url: Option<SecretString>,
    pub database_max_connections: u32,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<AdminBootstrap>,
    /// `(memory_kib, iterations)`; argon2 defaults when `None`.
    pub password_cost: Option<(u32, u32)>,
}

/// Credentials for the first administrator.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = parse_or(&get, "HOST", "0.0.0.0".parse::<IpAddr>().ok(), |v| v.parse::<IpAddr>())?;
        let port = parse_or(&get, "PORT", Some(8000), |v| v.parse::<u16>())?;
        let jwt_secret = get("JWT_SECRET")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;
        let token_ttl_minutes = parse_or(
            &get,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            Some(DEFAULT_TOKEN_TTL_MINUTES),
            |v| v.parse::<i64>(),
        )?;
        if token_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }
        let database_url = get("DATABASE_URL").map(SecretString::from);
        let database_max_connections = parse_or(&get, "DATABASE_MAX_CONNECTIONS", Some(5), |v| v.parse::<u32>())?;
        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let bootstrap_admin = match (get("ADMIN_USERNAME"), get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password: SecretString::from(password),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "ADMIN_*".to_string(),
                    "ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
                ));
            }
        };

        let password_cost = match (get("ARGON2_MEMORY_KIB"), get("ARGON2_ITERATIONS")) {
            (Some(memory), Some(iterations)) => Some((
                parse_value("ARGON2_MEMORY_KIB", &memory, |v| v.parse::<u32>())?,
                parse_value("ARGON2_ITERATIONS", &iterations, |v| v.parse::<u32>())?,
            )),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "ARGON2_*".to_string(),
                    "ARGON2_MEMORY_KIB and ARGON2_ITERATIONS must be set together".to_string(),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl_minutes,
            database_url,
            database_max_connections,
            cors_origins,
            bootstrap_admin,
            password_cost,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T, E: std::fmt::Display>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<T>,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => parse_value(key, &raw, parse),
        None => default.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_value<T, E: std::fmt::Display>(
    key: &str,
    raw: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("JWT_SECRET", "s3cr3t")]).unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8000");
        assert_eq!(config.jwt_secret.expose_secret(), "s3cr3t");
        assert_eq!(config.token_ttl_minutes, 30);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "http://localhost:8000"]
        );
        assert!(config.bootstrap_admin.is_none());
        assert!(config.password_cost.is_none());
    }

    #[test]
    fn missing_secret_is_reported() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::MissingEnvVar("JWT_SECRET".to_string())
        );
        assert!(load(&[("JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = load(&[("JWT_SECRET", "x"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "PORT"));

        let err = load(&[("JWT_SECRET", "x"), ("ACCESS_TOKEN_EXPIRE_MINUTES", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }

    #[test]
    fn admin_bootstrap_needs_all_three() {
        let err = load(&[("JWT_SECRET", "x"), ("ADMIN_USERNAME", "root")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));

        let config = load(&[
            ("JWT_SECRET", "x"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "pw"),
        ])
        .unwrap();
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.username, "root");
        assert!(!format!("{admin:?}").contains("pw\""));
    }

    #[test]
    fn origins_and_cost_are_parsed() {
        let config = load(&[
            ("JWT_SECRET", "x"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("ARGON2_MEMORY_KIB", "64"),
            ("ARGON2_ITERATIONS", "2"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.password_cost, Some((64, 2)));
    }
}
