use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult, Entity, Isbn, OrderDetailId, OrderId, ParticipantId, Price};

/// Order status lifecycle. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Completed => 2,
        }
    }

    /// Only pending orders can be cancelled by the buyer.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns whether the status actually changes. Going backwards is rejected.
    pub fn check_transition(&self, next: OrderStatus) -> DomainResult<bool> {
        if next == *self {
            return Ok(false);
        }
        if next.rank() < self.rank() {
            return Err(DomainError::validation(format!(
                "order status cannot move from {} back to {}",
                self.as_str(),
                next.as_str()
            )));
        }
        Ok(true)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(DomainError::validation(format!(
                "invalid order status '{other}', expected one of pending, shipped, completed"
            ))),
        }
    }
}

/// One store's order for one buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user_id")]
    pub buyer_id: ParticipantId,
    pub store_id: ParticipantId,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A line of an order. `unit_price` is the catalog price when the order was
/// placed and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    #[serde(rename = "book_isbn")]
    pub isbn: Isbn,
    pub quantity: u32,
    pub unit_price: Price,
}

impl Entity for OrderDetail {
    type Id = OrderDetailId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Detail line joined with the book's *current* display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineView {
    #[serde(flatten)]
    pub detail: OrderDetail,
    pub book_name: String,
    pub authors: String,
    pub image_url: Option<String>,
}

/// Fully hydrated order as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub buyer_name: String,
    pub shipping_address: Option<String>,
    pub store_name: String,
    pub store_address: Option<String>,
    pub details: Vec<OrderLineView>,
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Buyer(ParticipantId),
    Store(ParticipantId),
    All,
}

impl OrderScope {
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            OrderScope::Buyer(id) => order.buyer_id == *id,
            OrderScope::Store(id) => order.store_id == *id,
            OrderScope::All => true,
        }
    }
}
