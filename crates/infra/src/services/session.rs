//! Login and token resolution.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use bookstore_auth::{Principal, Role};
use bookstore_core::DomainError;

use super::{ServiceError, Services, finish};

const BAD_CREDENTIALS: &str = "Incorrect username or password";
const INVALID_TOKEN: &str = "Could not validate credentials";

/// Issued bearer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_type: Role,
    pub expires_at: DateTime<Utc>,
}

impl Services {
    /// Password login. A non-empty `scopes` list restricts which participant
    /// types may log in through this call.
    #[instrument(skip(self, password, scopes), fields(username = %username), err)]
    pub async fn login(&self, username: &str, password: &str, scopes: &[Role]) -> Result<Session, ServiceError> {
        let mut uow = self.store.begin().await?;
        let lookup = uow.participant_by_name(username.trim()).await.map_err(ServiceError::from);
        let participant = finish(uow, lookup).await?;

        let participant = match participant {
            Some(p) if self.passwords.verify(password, &p.password_digest) => p,
            _ => return Err(DomainError::unauthenticated(BAD_CREDENTIALS).into()),
        };

        if !scopes.is_empty() && !scopes.contains(&participant.role) {
            return Err(DomainError::unauthenticated("User type does not match").into());
        }

        let issued = self.tokens.issue(participant.id, Utc::now())?;
        tracing::info!(participant_id = %participant.id, role = %participant.role, "login succeeded");

        Ok(Session {
            access_token: issued.token,
            token_type: "bearer",
            user_type: participant.role,
            expires_at: issued.expires_at,
        })
    }

    /// Token to principal. Fails closed: bad signature, expiry, garbage, or a
    /// subject that no longer exists all yield `Unauthenticated`.
    pub async fn resolve(&self, token: &str) -> Result<Principal, ServiceError> {
        let id = self.tokens.validate(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            DomainError::unauthenticated(INVALID_TOKEN)
        })?;

        let mut uow = self.store.begin().await?;
        let lookup = uow.participant(id).await.map_err(ServiceError::from);
        let participant = finish(uow, lookup).await?;

        participant
            .map(|p| p.principal())
            .ok_or_else(|| DomainError::unauthenticated(INVALID_TOKEN).into())
    }
}
