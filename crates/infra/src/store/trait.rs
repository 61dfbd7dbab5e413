use async_trait::async_trait;
use thiserror::Error;

use bookstore_auth::Role;
use bookstore_catalog::{Book, BookQuery};
use bookstore_core::{CartItemId, Isbn, OrderId, Page, ParticipantId};
use bookstore_participants::{Participant, ParticipantFilter};
use bookstore_sales::{CartItem, CartLine, NewOrder, Order, OrderDetail, OrderScope, OrderStatus, OrderView};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key (name, email, isbn, cart line) already exists.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The row is still referenced (a book with order lines).
    #[error("still referenced: {0}")]
    ForeignKeyViolation(String),

    /// Deadlock or serialization failure; the whole unit of work may be retried.
    #[error("concurrent update conflict: {0}")]
    Contention(String),

    /// A row could not be mapped into a domain value.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// The backend failed (connection, pool, any other constraint).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Participant row before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipantRecord {
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub address: Option<String>,
    pub role: Role,
}

/// Entry point to the transactional store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// One transaction.
///
/// Reads observe the transaction's own writes. Inventory writes are
/// conditional so concurrent units of work can never drive a counter negative.
#[async_trait]
pub trait UnitOfWork: Send {
    // ── participants ────────────────────────────────────────────────────────

    async fn participant(&mut self, id: ParticipantId) -> Result<Option<Participant>, StoreError>;

    async fn participant_by_name(&mut self, name: &str) -> Result<Option<Participant>, StoreError>;

    async fn participant_by_email(&mut self, email: &str) -> Result<Option<Participant>, StoreError>;

    async fn insert_participant(&mut self, new: NewParticipantRecord) -> Result<Participant, StoreError>;

    /// Overwrite every mutable column. `false` if the row is gone.
    async fn update_participant(&mut self, participant: &Participant) -> Result<bool, StoreError>;

    /// Cascades to owned books, cart lines, and orders as buyer or store.
    async fn delete_participant(&mut self, id: ParticipantId) -> Result<bool, StoreError>;

    /// Ordered by id.
    async fn list_participants(
        &mut self,
        filter: &ParticipantFilter,
        page: Page,
    ) -> Result<Vec<Participant>, StoreError>;

    async fn administrator_exists(&mut self) -> Result<bool, StoreError>;

    // ── books ───────────────────────────────────────────────────────────────

    async fn book(&mut self, isbn: &Isbn) -> Result<Option<Book>, StoreError>;

    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError>;

    async fn update_book(&mut self, book: &Book) -> Result<bool, StoreError>;

    /// Cascades to cart lines and order details referencing the book.
    async fn delete_book(&mut self, isbn: &Isbn) -> Result<bool, StoreError>;

    /// Ordered by name, then isbn.
    async fn find_books(&mut self, query: &BookQuery, page: Page) -> Result<Vec<Book>, StoreError>;

    /// `inventory -= quantity` only if `inventory >= quantity`.
    /// Returns the remaining stock, or `None` if the book is absent or short.
    async fn take_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError>;

    /// `inventory += quantity`. Returns the new stock, or `None` if the book is absent.
    async fn restore_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError>;

    // ── cart ────────────────────────────────────────────────────────────────

    async fn cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    async fn cart_item_for_book(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
    ) -> Result<Option<CartItem>, StoreError>;

    async fn insert_cart_item(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
        quantity: u32,
    ) -> Result<CartItem, StoreError>;

    async fn set_cart_quantity(&mut self, id: CartItemId, quantity: u32) -> Result<bool, StoreError>;

    async fn delete_cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<bool, StoreError>;

    /// Returns how many lines were removed.
    async fn clear_cart(&mut self, user: ParticipantId) -> Result<u64, StoreError>;

    /// Cart lines joined with current book and store metadata, ordered by line id.
    async fn cart_lines(&mut self, user: ParticipantId) -> Result<Vec<CartLine>, StoreError>;

    // ── orders ──────────────────────────────────────────────────────────────

    /// Inserts the order row and one detail row per line.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn order_details(&mut self, id: OrderId) -> Result<Vec<OrderDetail>, StoreError>;

    async fn order_view(&mut self, id: OrderId) -> Result<Option<OrderView>, StoreError>;

    /// Ordered by `order_date` descending, then id descending.
    async fn order_views(&mut self, scope: OrderScope, page: Page) -> Result<Vec<OrderView>, StoreError>;

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError>;

    /// Cascades to the order's details.
    async fn delete_order(&mut self, id: OrderId) -> Result<bool, StoreError>;

    // ── lifecycle ───────────────────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
