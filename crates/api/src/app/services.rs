//! Service wiring: pick a store, build the token and password collaborators,
//! and make sure an administrator exists.

use std::sync::Arc;

use chrono::Duration;
use secrecy::ExposeSecret;
use thiserror::Error;

use bookstore_auth::{Argon2PasswordService, Hs256TokenService, PasswordError, PasswordService};
use bookstore_infra::{InMemoryStore, PostgresStore, ServiceError, Services, Store, StoreError};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store initialization failed: {0}")]
    Store(#[from] StoreError),
    #[error("password hashing configuration rejected: {0}")]
    Password(#[from] PasswordError),
    #[error("administrator bootstrap failed: {0}")]
    Bootstrap(#[from] ServiceError),
}

pub async fn build_services(config: &AppConfig) -> Result<Services, StartupError> {
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url.expose_secret(), config.database_max_connections).await?;
            store.migrate().await?;
            tracing::info!(max_connections = config.database_max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on exit)");
            Arc::new(InMemoryStore::new())
        }
    };

    let passwords: Arc<dyn PasswordService> = match config.password_cost {
        Some((memory_kib, iterations)) => Arc::new(Argon2PasswordService::with_cost(memory_kib, iterations)?),
        None => Arc::new(Argon2PasswordService::default()),
    };
    let tokens = Arc::new(Hs256TokenService::new(
        &config.jwt_secret,
        Duration::minutes(config.token_ttl_minutes),
    ));

    let services = Services::new(store, tokens, passwords);

    if let Some(admin) = &config.bootstrap_admin {
        services
            .bootstrap_admin(&admin.username, &admin.email, admin.password.expose_secret())
            .await?;
    }

    Ok(services)
}
