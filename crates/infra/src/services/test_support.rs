//! Shared fixtures for service tests: an in-memory store, a real HS256 token
//! service, and a trivial password scheme (argon2 is covered in its own crate).

use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use secrecy::SecretString;

use bookstore_auth::{Hs256TokenService, PasswordError, PasswordService, Principal, Role};
use bookstore_catalog::{Book, NewBook};
use bookstore_core::{Isbn, Price};
use bookstore_participants::{NewParticipant, RegistrationChannel};

use crate::services::Services;
use crate::store::InMemoryStore;

pub(crate) struct PlainPasswords;

impl PasswordService for PlainPasswords {
    fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        if secret.is_empty() {
            return Err(PasswordError::Empty);
        }
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        digest == format!("plain${secret}")
    }
}

pub(crate) fn services() -> Services {
    Services::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(Hs256TokenService::new(
            &SecretString::from("test-secret".to_string()),
            Duration::minutes(30),
        )),
        Arc::new(PlainPasswords),
    )
}

pub(crate) struct Fixture {
    pub services: Services,
    pub admin: Principal,
    pub store_a: Principal,
    pub store_b: Principal,
    pub buyer: Principal,
    pub other_buyer: Principal,
}

fn new_participant(name: &str, role: Role) -> NewParticipant {
    NewParticipant {
        name: name.to_string(),
        email: format!("{name}@example.com"),
        password: format!("pw-{name}"),
        address: Some(format!("{name} street 1")),
        role,
    }
}

pub(crate) async fn register(services: &Services, name: &str, role: Role) -> Principal {
    let profile = services
        .create_participant(new_participant(name, role), RegistrationChannel::Admin)
        .await
        .unwrap();
    Principal::new(profile.id, profile.name, profile.role)
}

/// Admin, two stores (`store-a`, `store-b`), two buyers (`buyer-1`, `buyer-2`).
pub(crate) async fn fixture() -> Fixture {
    let services = services();
    let admin = register(&services, "admin", Role::Administrator).await;
    let store_a = register(&services, "store-a", Role::Store).await;
    let store_b = register(&services, "store-b", Role::Store).await;
    let buyer = register(&services, "buyer-1", Role::Buyer).await;
    let other_buyer = register(&services, "buyer-2", Role::Buyer).await;
    Fixture {
        services,
        admin,
        store_a,
        store_b,
        buyer,
        other_buyer,
    }
}

pub(crate) fn isbn(raw: &str) -> Isbn {
    Isbn::parse(raw).unwrap()
}

pub(crate) fn price(raw: &str) -> Price {
    Price::new(Decimal::from_str(raw).unwrap()).unwrap()
}

pub(crate) fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

/// Create a book owned by `store`.
pub(crate) async fn stock(services: &Services, store: &Principal, raw_isbn: &str, unit_price: &str, inventory: u32) -> Book {
    services
        .create_book(
            store,
            NewBook {
                isbn: isbn(raw_isbn),
                name: format!("Book {raw_isbn}"),
                authors: "Some Author".into(),
                category: Some("fiction".into()),
                inventory,
                price: price(unit_price),
                store_id: None,
                image_url: Some(format!("https://img.example/{raw_isbn}.jpg")),
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn inventory_of(services: &Services, raw_isbn: &str) -> u32 {
    services.book(&isbn(raw_isbn)).await.unwrap().inventory
}
