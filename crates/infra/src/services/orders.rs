//! Order placement, cancellation and fulfilment.
//!
//! Every stock movement goes through the store's conditional decrement, so two
//! buyers racing for the last copy cannot both win: the loser's unit of work
//! fails with `InsufficientInventory` and rolls back whole. Books are always
//! touched in ISBN order.

use chrono::Utc;
use tracing::{Span, instrument};

use bookstore_auth::{Principal, Role, require_order_viewer, require_role};
use bookstore_core::{DomainError, Isbn, OrderId, Page, ParticipantId};
use bookstore_sales::{
    NewOrder, OrderRequest, OrderScope, OrderStatus, OrderView, PricedLine, group_by_store, stock_moves,
};

use super::catalog::load_book;
use super::{ServiceError, Services, finish};
use crate::store::UnitOfWork;

impl Services {
    /// Turn the caller's cart into one pending order per store and empty it.
    #[instrument(skip(self, principal), fields(buyer = %principal.id, orders), err)]
    pub async fn checkout(&self, principal: &Principal) -> Result<Vec<OrderId>, ServiceError> {
        require_role(principal, Role::Buyer)?;

        let mut uow = self.store.begin().await?;
        let result = checkout_cart(uow.as_mut(), principal.id).await;
        let ids = finish(uow, result).await?;

        Span::current().record("orders", ids.len());
        tracing::info!(buyer = %principal.id, orders = ?ids, "checkout completed");
        Ok(ids)
    }

    /// Direct order against one store, bypassing the cart.
    #[instrument(skip(self, principal, request), fields(buyer = %principal.id, store = %request.store_id, order_id), err)]
    pub async fn create_order(&self, principal: &Principal, request: OrderRequest) -> Result<OrderView, ServiceError> {
        require_role(principal, Role::Buyer)?;
        let request = request.validated()?;

        let mut uow = self.store.begin().await?;
        let result = place_order(uow.as_mut(), principal.id, &request).await;
        let view = finish(uow, result).await?;

        Span::current().record("order_id", view.order.id.get());
        Ok(view)
    }

    /// Buyer cancels one of their pending orders; stock goes back on the shelf.
    #[instrument(skip(self, principal), fields(buyer = %principal.id), err)]
    pub async fn cancel_order(&self, principal: &Principal, id: OrderId) -> Result<(), ServiceError> {
        require_role(principal, Role::Buyer)?;

        let mut uow = self.store.begin().await?;
        let result = cancel(uow.as_mut(), principal.id, id).await;
        finish(uow, result).await
    }

    /// The owning store moves an order forward through its lifecycle.
    #[instrument(skip(self, principal), fields(store = %principal.id), err)]
    pub async fn update_order_status(
        &self,
        principal: &Principal,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        require_role(principal, Role::Store)?;

        let mut uow = self.store.begin().await?;
        let result = advance_status(uow.as_mut(), principal.id, id, status).await;
        finish(uow, result).await
    }

    pub async fn order(&self, principal: &Principal, id: OrderId) -> Result<OrderView, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = load_view(uow.as_mut(), id).await;
        let view = finish(uow, result).await?;

        require_order_viewer(principal, view.order.buyer_id, view.order.store_id)?;
        Ok(view)
    }

    pub async fn my_orders(&self, principal: &Principal, page: Page) -> Result<Vec<OrderView>, ServiceError> {
        require_role(principal, Role::Buyer)?;
        self.order_views(OrderScope::Buyer(principal.id), page).await
    }

    pub async fn store_orders(&self, principal: &Principal, page: Page) -> Result<Vec<OrderView>, ServiceError> {
        require_role(principal, Role::Store)?;
        self.order_views(OrderScope::Store(principal.id), page).await
    }

    pub async fn all_orders(&self, principal: &Principal, page: Page) -> Result<Vec<OrderView>, ServiceError> {
        require_role(principal, Role::Administrator)?;
        self.order_views(OrderScope::All, page).await
    }

    async fn order_views(&self, scope: OrderScope, page: Page) -> Result<Vec<OrderView>, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = uow.order_views(scope, page).await.map_err(ServiceError::from);
        finish(uow, result).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit-of-work bodies
// ─────────────────────────────────────────────────────────────────────────────

async fn checkout_cart(uow: &mut dyn UnitOfWork, buyer: ParticipantId) -> Result<Vec<OrderId>, ServiceError> {
    let lines: Vec<PricedLine> = uow.cart_lines(buyer).await?.iter().map(|l| l.priced()).collect();
    if lines.is_empty() {
        return Err(DomainError::EmptyCart.into());
    }

    take_all(uow, &lines).await?;

    let today = Utc::now().date_naive();
    let mut ids = Vec::new();
    for group in group_by_store(lines)? {
        let order = uow.insert_order(&NewOrder::pending(buyer, group, today)).await?;
        ids.push(order.id);
    }

    uow.clear_cart(buyer).await?;
    Ok(ids)
}

async fn place_order(
    uow: &mut dyn UnitOfWork,
    buyer: ParticipantId,
    request: &OrderRequest,
) -> Result<OrderView, ServiceError> {
    let mut lines = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let book = load_book(uow, &item.isbn).await?;
        if book.store_id != request.store_id {
            return Err(DomainError::not_found(format!("Book {} in store {}", item.isbn, request.store_id)).into());
        }
        lines.push(PricedLine {
            isbn: book.isbn,
            quantity: item.quantity,
            unit_price: book.price,
            store_id: book.store_id,
        });
    }
    take_all(uow, &lines).await?;

    let today = Utc::now().date_naive();
    let mut created = Vec::new();
    for group in group_by_store(lines)? {
        created.push(uow.insert_order(&NewOrder::pending(buyer, group, today)).await?);
    }
    let order = created
        .pop()
        .ok_or_else(|| DomainError::validation("an order needs at least one item"))?;
    load_view(uow, order.id).await
}

async fn cancel(uow: &mut dyn UnitOfWork, buyer: ParticipantId, id: OrderId) -> Result<(), ServiceError> {
    // Someone else's order, or one already shipped, is indistinguishable from
    // a missing one.
    let order = uow
        .order(id)
        .await?
        .filter(|o| o.buyer_id == buyer && o.status.is_cancellable())
        .ok_or_else(|| DomainError::not_found(format!("Order {id}")))?;

    let mut details = uow.order_details(order.id).await?;
    details.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    for detail in details {
        if uow.restore_inventory(&detail.isbn, detail.quantity).await?.is_none() {
            tracing::warn!(order_id = %id, isbn = %detail.isbn, "book vanished before stock could be restored");
        }
    }
    uow.delete_order(order.id).await?;
    Ok(())
}

async fn advance_status(
    uow: &mut dyn UnitOfWork,
    store: ParticipantId,
    id: OrderId,
    status: OrderStatus,
) -> Result<OrderView, ServiceError> {
    let order = uow
        .order(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Order {id}")))?;
    if order.store_id != store {
        return Err(DomainError::forbidden("order belongs to another store").into());
    }

    if order.status.check_transition(status)? {
        uow.set_order_status(id, status).await?;
        tracing::info!(order_id = %id, from = %order.status, to = %status, "order status changed");
    }
    load_view(uow, id).await
}

/// Take stock for every line, one decrement per book in ISBN order.
async fn take_all(uow: &mut dyn UnitOfWork, lines: &[PricedLine]) -> Result<(), ServiceError> {
    for (isbn, quantity) in stock_moves(lines)? {
        take_stock(uow, &isbn, quantity).await?;
    }
    Ok(())
}

/// Conditional decrement. On failure, re-read to tell "short" from "gone".
async fn take_stock(uow: &mut dyn UnitOfWork, isbn: &Isbn, quantity: u32) -> Result<u32, ServiceError> {
    if let Some(remaining) = uow.take_inventory(isbn, quantity).await? {
        return Ok(remaining);
    }
    match uow.book(isbn).await? {
        Some(book) => Err(DomainError::insufficient_inventory(isbn.as_str(), quantity, book.inventory).into()),
        None => Err(DomainError::not_found(format!("Book {isbn}")).into()),
    }
}

async fn load_view(uow: &mut dyn UnitOfWork, id: OrderId) -> Result<OrderView, ServiceError> {
    uow.order_view(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Order {id}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{dec, fixture, inventory_of, isbn, price, stock};
    use bookstore_sales::OrderItem;

    fn request(store: ParticipantId, items: &[(&str, u32)]) -> OrderRequest {
        OrderRequest {
            store_id: store,
            items: items
                .iter()
                .map(|(raw, quantity)| OrderItem {
                    isbn: isbn(raw),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn direct_order_snapshots_prices_and_takes_stock() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "12.50", 5).await;
        stock(&f.services, &f.store_a, "222", "3.00", 5).await;

        let view = f
            .services
            .create_order(&f.buyer, request(f.store_a.id, &[("111", 2), ("222", 1)]))
            .await
            .unwrap();

        assert_eq!(view.order.status, OrderStatus::Pending);
        assert_eq!(view.order.total_price, dec("28.00"));
        assert_eq!(view.details.len(), 2);
        assert_eq!(view.buyer_name, "buyer-1");
        assert_eq!(view.shipping_address.as_deref(), Some("buyer-1 street 1"));
        assert_eq!(view.store_name, "store-a");
        assert_eq!(inventory_of(&f.services, "111").await, 3);
        assert_eq!(inventory_of(&f.services, "222").await, 4);
    }

    #[tokio::test]
    async fn direct_order_is_scoped_to_one_store() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 5).await;

        let err = f
            .services
            .create_order(&f.buyer, request(f.store_b.id, &[("111", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::NotFound(_))));
        assert_eq!(inventory_of(&f.services, "111").await, 5);
    }

    #[tokio::test]
    async fn only_buyers_place_orders() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 5).await;
        let err = f
            .services
            .create_order(&f.store_a, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));

        let err = f.services.checkout(&f.admin).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn checkout_of_empty_cart_fails() {
        let f = fixture().await;
        let err = f.services.checkout(&f.buyer).await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::EmptyCart));
    }

    #[tokio::test]
    async fn status_moves_forward_for_the_owning_store() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 5).await;
        let id = f
            .services
            .create_order(&f.buyer, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap()
            .order
            .id;

        let err = f
            .services
            .update_order_status(&f.store_b, id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));

        let shipped = f
            .services
            .update_order_status(&f.store_a, id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.order.status, OrderStatus::Shipped);

        // Idempotent re-submission.
        assert!(
            f.services
                .update_order_status(&f.store_a, id, OrderStatus::Shipped)
                .await
                .is_ok()
        );

        let err = f
            .services
            .update_order_status(&f.store_a, id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        let missing = f
            .services
            .update_order_status(&f.store_a, OrderId::new(9_999), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(missing.domain(), Some(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn order_visibility_follows_the_parties() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 5).await;
        let id = f
            .services
            .create_order(&f.buyer, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap()
            .order
            .id;

        assert!(f.services.order(&f.buyer, id).await.is_ok());
        assert!(f.services.order(&f.store_a, id).await.is_ok());
        assert!(f.services.order(&f.admin, id).await.is_ok());
        for outsider in [&f.other_buyer, &f.store_b] {
            let err = f.services.order(outsider, id).await.unwrap_err();
            assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
        }
    }

    #[tokio::test]
    async fn listings_are_role_scoped_and_newest_first() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 10).await;
        stock(&f.services, &f.store_b, "222", "2.00", 10).await;

        let first = f
            .services
            .create_order(&f.buyer, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap();
        let second = f
            .services
            .create_order(&f.buyer, request(f.store_b.id, &[("222", 1)]))
            .await
            .unwrap();
        f.services
            .create_order(&f.other_buyer, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap();

        let mine = f.services.my_orders(&f.buyer, Page::default()).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|v| v.order.id).collect();
        assert_eq!(ids, vec![second.order.id, first.order.id]);

        assert_eq!(f.services.store_orders(&f.store_a, Page::default()).await.unwrap().len(), 2);
        assert_eq!(f.services.all_orders(&f.admin, Page::default()).await.unwrap().len(), 3);
        assert_eq!(
            f.services
                .all_orders(&f.admin, Page::new(Some(1), Some(1)))
                .await
                .unwrap()
                .len(),
            1
        );

        assert!(f.services.my_orders(&f.store_a, Page::default()).await.is_err());
        assert!(f.services.store_orders(&f.buyer, Page::default()).await.is_err());
        assert!(f.services.all_orders(&f.store_a, Page::default()).await.is_err());
    }

    #[tokio::test]
    async fn detail_lines_keep_the_placement_price() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "10.00", 5).await;
        let view = f
            .services
            .create_order(&f.buyer, request(f.store_a.id, &[("111", 1)]))
            .await
            .unwrap();
        assert_eq!(view.details[0].detail.unit_price, price("10.00"));
    }
}
