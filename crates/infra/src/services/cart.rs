//! Shopping cart. Buyers only.

use tracing::instrument;

use bookstore_auth::{Principal, Role, require_role};
use bookstore_catalog::{ensure_available, validate_quantity};
use bookstore_core::{CartItemId, DomainError};
use bookstore_sales::{AddToCart, CartLine, merge_quantity};

use super::catalog::load_book;
use super::{ServiceError, Services, finish};
use crate::store::UnitOfWork;

impl Services {
    /// Adding a book that is already in the cart adds to that line.
    #[instrument(skip(self, principal, add), fields(buyer = %principal.id, isbn = %add.isbn, quantity = add.quantity), err)]
    pub async fn add_to_cart(&self, principal: &Principal, add: AddToCart) -> Result<CartLine, ServiceError> {
        require_role(principal, Role::Buyer)?;
        validate_quantity(add.quantity)?;

        let mut uow = self.store.begin().await?;
        let result = add_line(uow.as_mut(), principal, &add).await;
        finish(uow, result).await
    }

    pub async fn cart(&self, principal: &Principal) -> Result<Vec<CartLine>, ServiceError> {
        require_role(principal, Role::Buyer)?;

        let mut uow = self.store.begin().await?;
        let result = uow.cart_lines(principal.id).await.map_err(ServiceError::from);
        finish(uow, result).await
    }

    /// Replace a line's quantity.
    #[instrument(skip(self, principal), fields(buyer = %principal.id), err)]
    pub async fn update_cart_quantity(
        &self,
        principal: &Principal,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartLine, ServiceError> {
        require_role(principal, Role::Buyer)?;
        validate_quantity(quantity)?;

        let mut uow = self.store.begin().await?;
        let result = set_line_quantity(uow.as_mut(), principal, id, quantity).await;
        finish(uow, result).await
    }

    pub async fn remove_from_cart(&self, principal: &Principal, id: CartItemId) -> Result<(), ServiceError> {
        require_role(principal, Role::Buyer)?;

        let mut uow = self.store.begin().await?;
        let result = match uow.delete_cart_item(principal.id, id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DomainError::not_found(format!("Cart item {id}")).into()),
            Err(e) => Err(e.into()),
        };
        finish(uow, result).await
    }

    /// Returns the number of lines removed.
    pub async fn clear_cart(&self, principal: &Principal) -> Result<u64, ServiceError> {
        require_role(principal, Role::Buyer)?;

        let mut uow = self.store.begin().await?;
        let result = uow.clear_cart(principal.id).await.map_err(ServiceError::from);
        finish(uow, result).await
    }
}

async fn add_line(uow: &mut dyn UnitOfWork, principal: &Principal, add: &AddToCart) -> Result<CartLine, ServiceError> {
    let book = load_book(uow, &add.isbn).await?;
    let existing = uow.cart_item_for_book(principal.id, &add.isbn).await?;
    let quantity = merge_quantity(existing.as_ref().map(|item| item.quantity), add.quantity)?;
    ensure_available(&book, quantity)?;

    let id = match existing {
        Some(item) => {
            uow.set_cart_quantity(item.id, quantity).await?;
            item.id
        }
        None => uow.insert_cart_item(principal.id, &add.isbn, quantity).await?.id,
    };
    cart_line(uow, principal, id).await
}

async fn set_line_quantity(
    uow: &mut dyn UnitOfWork,
    principal: &Principal,
    id: CartItemId,
    quantity: u32,
) -> Result<CartLine, ServiceError> {
    let item = uow
        .cart_item(principal.id, id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Cart item {id}")))?;
    let book = load_book(uow, &item.isbn).await?;
    ensure_available(&book, quantity)?;

    uow.set_cart_quantity(item.id, quantity).await?;
    cart_line(uow, principal, id).await
}

async fn cart_line(uow: &mut dyn UnitOfWork, principal: &Principal, id: CartItemId) -> Result<CartLine, ServiceError> {
    uow.cart_lines(principal.id)
        .await?
        .into_iter()
        .find(|line| line.id == id)
        .ok_or_else(|| DomainError::not_found(format!("Cart item {id}")).into())
}
