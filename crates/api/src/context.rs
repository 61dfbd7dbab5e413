use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Response};

use bookstore_auth::Principal;

use crate::app::errors;

/// Principal context for a request (authenticated participant + type).
///
/// Inserted by [`crate::middleware::auth_middleware`] when the request carries
/// a valid bearer token. Handlers that take it as an argument reject
/// anonymous requests with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PrincipalContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .cloned()
            .ok_or_else(errors::not_authenticated)
    }
}
