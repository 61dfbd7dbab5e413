//! Sales domain module: carts, orders and the checkout grouping rules.
//!
//! This crate contains business rules for buying books, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The transactional
//! workflow that drives these rules lives in `bookstore-infra::services`.

pub mod cart;
pub mod checkout;
pub mod order;

pub use cart::{AddToCart, CartItem, CartLine, merge_quantity};
pub use checkout::{NewOrder, OrderItem, OrderRequest, PricedLine, StoreGroup, group_by_store, stock_moves};
pub use order::{Order, OrderDetail, OrderLineView, OrderScope, OrderStatus, OrderView};
