use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use bookstore_infra::ServiceError;

use crate::app::errors;

pub mod books;
pub mod cart;
pub mod orders;
pub mod participants;
pub mod system;
pub mod users;

/// Every endpoint. Catalog reads, registration and login are anonymous; the
/// rest take a [`crate::context::PrincipalContext`].
pub fn router() -> Router {
    Router::new()
        .merge(participants::router())
        .merge(users::router())
        .merge(books::router())
        .merge(cart::router())
        .merge(orders::router())
}

/// Serialize a service result with `status`, or map the error.
pub(crate) fn reply<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
