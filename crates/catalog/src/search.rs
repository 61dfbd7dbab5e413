//! Catalog queries.
//!
//! A leading `@` in the search text asks for an exact match on isbn, name or
//! authors; anything else is a case-insensitive substring match on name or
//! authors. Store implementations translate [`BookQuery`] to their own query
//! language; [`BookQuery::matches`] is the reference predicate.

use bookstore_core::ParticipantId;

use crate::Book;

/// Default threshold for the low-inventory report.
pub const LOW_INVENTORY_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// `@term`: equals isbn, name or authors.
    Exact(String),
    /// Lowercased needle contained in name or authors.
    Contains(String),
}

impl TextMatch {
    /// `None` for blank input (including a bare `@`).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix('@') {
            Some(exact) => {
                let exact = exact.trim();
                (!exact.is_empty()).then(|| TextMatch::Exact(exact.to_string()))
            }
            None => (!raw.is_empty()).then(|| TextMatch::Contains(raw.to_lowercase())),
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        match self {
            TextMatch::Exact(term) => {
                book.isbn.as_str() == term || &book.name == term || &book.authors == term
            }
            TextMatch::Contains(needle) => {
                book.name.to_lowercase().contains(needle)
                    || book.authors.to_lowercase().contains(needle)
            }
        }
    }
}

/// Conjunction of optional filters. The empty query matches every book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub text: Option<TextMatch>,
    /// Case-insensitive equality.
    pub category: Option<String>,
    pub store_id: Option<ParticipantId>,
    /// Strictly below this many units.
    pub inventory_below: Option<u32>,
}

impl BookQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(text: Option<&str>, category: Option<&str>) -> Self {
        Self {
            text: text.and_then(TextMatch::parse),
            category: normalize_category(category),
            ..Self::default()
        }
    }

    pub fn by_category(category: &str) -> Self {
        Self {
            category: normalize_category(Some(category)),
            ..Self::default()
        }
    }

    pub fn by_store(store_id: ParticipantId) -> Self {
        Self {
            store_id: Some(store_id),
            ..Self::default()
        }
    }

    pub fn low_inventory(store_id: ParticipantId, threshold: Option<u32>) -> Self {
        Self {
            store_id: Some(store_id),
            inventory_below: Some(threshold.unwrap_or(LOW_INVENTORY_THRESHOLD)),
            ..Self::default()
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        if let Some(text) = &self.text {
            if !text.matches(book) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            let same = book
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == *category);
            if !same {
                return false;
            }
        }
        if self.store_id.is_some_and(|s| s != book.store_id) {
            return false;
        }
        if self.inventory_below.is_some_and(|t| book.inventory >= t) {
            return false;
        }
        true
    }
}

fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
}
