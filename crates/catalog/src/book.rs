use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult, Entity, Isbn, ParticipantId, Price};

/// A catalog entry, owned by exactly one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub name: String,
    pub authors: String,
    pub category: Option<String>,
    pub inventory: u32,
    pub price: Price,
    pub store_id: ParticipantId,
    pub image_url: Option<String>,
}

impl Entity for Book {
    type Id = Isbn;

    fn id(&self) -> &Self::Id {
        &self.isbn
    }
}

/// Creation payload. `store_id` may be omitted when a store creates its own book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub isbn: Isbn,
    pub name: String,
    pub authors: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub inventory: u32,
    pub price: Price,
    #[serde(default)]
    pub store_id: Option<ParticipantId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewBook {
    pub fn into_book(self, store_id: ParticipantId) -> DomainResult<Book> {
        Ok(Book {
            isbn: self.isbn,
            name: required("name", &self.name)?,
            authors: required("authors", &self.authors)?,
            category: optional(self.category),
            inventory: self.inventory,
            price: self.price,
            store_id,
            image_url: optional(self.image_url),
        })
    }
}

/// Partial update; `None` leaves a field unchanged. Ownership cannot move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub inventory: Option<u32>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.authors.is_none()
            && self.category.is_none()
            && self.inventory.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
    }

    pub fn apply_to(&self, book: &mut Book) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }
        if let Some(name) = &self.name {
            book.name = required("name", name)?;
        }
        if let Some(authors) = &self.authors {
            book.authors = required("authors", authors)?;
        }
        if let Some(category) = &self.category {
            book.category = optional(Some(category.clone()));
        }
        if let Some(inventory) = self.inventory {
            book.inventory = inventory;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(image_url) = &self.image_url {
            book.image_url = optional(Some(image_url.clone()));
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
