use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookstore_core::ParticipantId;

/// Session token claims (transport-agnostic).
///
/// Timestamps are unix seconds, as registered JWT claims expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Participant id, as a decimal string.
    pub sub: String,

    /// Issued-at.
    pub iat: i64,

    /// Expiration.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(subject: ParticipantId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn subject(&self) -> Result<ParticipantId, TokenValidationError> {
        self.sub
            .parse::<ParticipantId>()
            .map_err(|_| TokenValidationError::InvalidSubject)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token subject is not a participant id")]
    InvalidSubject,
}

/// Deterministically validate claims against `now`.
///
/// Signature verification happens in [`crate::token`]; this only looks at the
/// decoded time window and subject.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<ParticipantId, TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    claims.subject()
}
