use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use bookstore_core::DomainError;
use bookstore_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            internal_error()
        }
        ServiceError::Password(e) => {
            tracing::error!(error = %e, "password hashing failure");
            internal_error()
        }
        ServiceError::Token(e) => {
            tracing::error!(error = %e, "token issuance failure");
            internal_error()
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        DomainError::Unauthenticated(msg) => unauthorized(msg),
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InsufficientInventory { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_inventory", err.to_string())
        }
        DomainError::EmptyCart => json_error(StatusCode::BAD_REQUEST, "empty_cart", "Cart is empty"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 with the bearer challenge header.
fn unauthorized(message: impl Into<String>) -> Response {
    let mut response = json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message);
    response.headers_mut().insert(
        axum::http::header::WWW_AUTHENTICATE,
        axum::http::HeaderValue::from_static("Bearer"),
    );
    response
}

pub fn not_authenticated() -> Response {
    unauthorized("Not authenticated")
}

fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
}

/// Parse a path segment into a typed id, or a 400 response.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_core::ParticipantId;
    use bookstore_infra::StoreError;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::not_found("Order 1"), StatusCode::NOT_FOUND),
            (DomainError::forbidden("no"), StatusCode::FORBIDDEN),
            (DomainError::unauthenticated("no"), StatusCode::UNAUTHORIZED),
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::insufficient_inventory("111", 2, 1), StatusCode::BAD_REQUEST),
            (DomainError::EmptyCart, StatusCode::BAD_REQUEST),
            (DomainError::conflict("dup"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_failures_are_opaque() {
        let response = service_error_to_response(ServiceError::Store(StoreError::Backend(
            "connection refused to 10.0.0.7".into(),
        )));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthenticated_carries_challenge() {
        let response = not_authenticated();
        assert_eq!(response.headers()[axum::http::header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id::<ParticipantId>("7").ok(), Some(ParticipantId::new(7)));
        for raw in ["abc", "0", "-3"] {
            let status = parse_id::<ParticipantId>(raw).err().map(|r| r.status());
            assert_eq!(status, Some(StatusCode::BAD_REQUEST), "{raw}");
        }
    }
}
