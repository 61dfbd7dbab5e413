use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use bookstore_infra::Services;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Services,
}

/// Resolve `Authorization: Bearer <token>` into a [`PrincipalContext`].
///
/// Requests without the header pass through anonymously; routes that need a
/// principal reject them at extraction. A header that is present but
/// malformed, expired or unknown is rejected here.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_bearer(req.headers())? else {
        return Ok(next.run(req).await);
    };

    let principal = state
        .services
        .resolve(token)
        .await
        .map_err(errors::service_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, Response> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| errors::not_authenticated())?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(errors::not_authenticated)?
        .trim();
    if token.is_empty() {
        return Err(errors::not_authenticated());
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert!(matches!(extract_bearer(&headers("Bearer abc.def")), Ok(Some("abc.def"))));
        assert!(matches!(extract_bearer(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn other_schemes_are_rejected() {
        for value in ["Basic dXNlcjpwdw==", "Bearer   ", "abc"] {
            let status = extract_bearer(&headers(value)).err().map(|r| r.status());
            assert_eq!(status, Some(StatusCode::UNAUTHORIZED), "{value}");
        }
    }
}
