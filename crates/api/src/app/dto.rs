use serde::{Deserialize, Serialize};

use bookstore_auth::Role;
use bookstore_core::{OrderId, Page};
use bookstore_participants::ParticipantFilter;
use bookstore_sales::OrderStatus;

use crate::app::errors;

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BookSearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl BookSearchQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LowInventoryQuery {
    pub threshold: Option<u32>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl LowInventoryQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ParticipantSearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl ParticipantSearchQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }

    pub fn filter(&self) -> Result<ParticipantFilter, axum::response::Response> {
        let role = self
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        Ok(ParticipantFilter {
            query: self.q.clone(),
            role,
        })
    }
}

// -------------------------
// Request DTOs
// -------------------------

/// `application/x-www-form-urlencoded` login body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Space-separated participant types allowed to log in.
    #[serde(default)]
    pub scope: Option<String>,
}

impl LoginForm {
    pub fn scopes(&self) -> Result<Vec<Role>, axum::response::Response> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::parse::<Role>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(errors::domain_error_to_response)
    }
}

#[derive(Debug, Deserialize)]
pub struct CartQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn status(&self) -> Result<OrderStatus, axum::response::Response> {
        self.status
            .parse::<OrderStatus>()
            .map_err(errors::domain_error_to_response)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub order_ids: Vec<OrderId>,
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub message: String,
    pub removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_scope_is_space_separated() {
        let form = LoginForm {
            username: "u".into(),
            password: "p".into(),
            scope: Some("store  administrator".into()),
        };
        assert_eq!(form.scopes().ok(), Some(vec![Role::Store, Role::Administrator]));

        let none = LoginForm {
            scope: None,
            ..form
        };
        assert_eq!(none.scopes().ok(), Some(vec![]));
    }

    #[test]
    fn unknown_participant_type_is_rejected() {
        let query = ParticipantSearchQuery {
            role: Some("wizard".into()),
            ..Default::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn page_defaults_and_caps() {
        let page = PageQuery { skip: None, limit: Some(1_000) }.page();
        assert_eq!(page, Page::new(Some(0), Some(100)));
    }
}
