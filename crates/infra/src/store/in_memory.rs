use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bookstore_auth::Role;
use bookstore_catalog::{Book, BookQuery};
use bookstore_core::{CartItemId, Entity, Isbn, OrderDetailId, OrderId, Page, ParticipantId};
use bookstore_participants::{Participant, ParticipantFilter};
use bookstore_sales::{
    CartItem, CartLine, NewOrder, Order, OrderDetail, OrderLineView, OrderScope, OrderStatus, OrderView,
};

use super::r#trait::{NewParticipantRecord, Store, StoreError, UnitOfWork};

/// Rows keyed by entity id, iterated in id order.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self { rows: BTreeMap::new() }
    }
}

impl<E: Entity + Clone> Clone for Table<E> {
    fn clone(&self) -> Self {
        Self { rows: self.rows.clone() }
    }
}

impl<E: Entity> Table<E> {
    fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        self.rows.get_mut(id)
    }

    fn put(&mut self, row: E) {
        self.rows.insert(row.id().clone(), row);
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        self.rows.remove(id)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn find(&self, mut pred: impl FnMut(&E) -> bool) -> Option<&E> {
        self.rows.values().find(|row| pred(row))
    }

    /// Removes rows matching `pred`, returning how many went.
    fn delete_where(&mut self, mut pred: impl FnMut(&E) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !pred(row));
        before - self.rows.len()
    }
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    participant: i64,
    cart_item: i64,
    order: i64,
    order_detail: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct Tables {
    participants: Table<Participant>,
    books: Table<Book>,
    cart_items: Table<CartItem>,
    orders: Table<Order>,
    order_details: Table<OrderDetail>,
    seq: Sequences,
}

impl Tables {
    fn cart_line(&self, item: &CartItem) -> Option<CartLine> {
        let book = self.books.get(&item.isbn)?;
        let store = self.participants.get(&book.store_id)?;
        Some(CartLine {
            id: item.id,
            isbn: item.isbn.clone(),
            quantity: item.quantity,
            book_name: book.name.clone(),
            authors: book.authors.clone(),
            price: book.price,
            inventory: book.inventory,
            store_id: book.store_id,
            store_name: store.name.clone(),
        })
    }

    fn order_view(&self, order: &Order) -> Option<OrderView> {
        let buyer = self.participants.get(&order.buyer_id)?;
        let store = self.participants.get(&order.store_id)?;
        let details = self
            .order_details
            .values()
            .filter(|d| d.order_id == order.id)
            .filter_map(|d| {
                let book = self.books.get(&d.isbn)?;
                Some(OrderLineView {
                    detail: d.clone(),
                    book_name: book.name.clone(),
                    authors: book.authors.clone(),
                    image_url: book.image_url.clone(),
                })
            })
            .collect();

        Some(OrderView {
            order: order.clone(),
            buyer_name: buyer.name.clone(),
            shipping_address: buyer.address.clone(),
            store_name: store.name.clone(),
            store_address: store.address.clone(),
            details,
        })
    }

    fn delete_order_cascade(&mut self, id: OrderId) -> bool {
        self.order_details.delete_where(|d| d.order_id == id);
        self.orders.remove(&id).is_some()
    }

    /// Cart lines go with the book; order lines block the delete.
    fn delete_book_cascade(&mut self, isbn: &Isbn) -> Result<bool, StoreError> {
        if self.order_details.find(|d| &d.isbn == isbn).is_some() {
            return Err(StoreError::ForeignKeyViolation(format!(
                "book {isbn} is referenced by order details"
            )));
        }
        self.cart_items.delete_where(|c| &c.isbn == isbn);
        Ok(self.books.remove(isbn).is_some())
    }
}

/// In-memory transactional store.
///
/// Intended for tests/dev. A unit of work holds the only lock on the tables
/// for its whole lifetime and edits a private copy, so units of work are
/// fully serialized and a dropped one leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn participant(&mut self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.working.participants.get(&id).cloned())
    }

    async fn participant_by_name(&mut self, name: &str) -> Result<Option<Participant>, StoreError> {
        Ok(self.working.participants.find(|p| p.name == name).cloned())
    }

    async fn participant_by_email(&mut self, email: &str) -> Result<Option<Participant>, StoreError> {
        Ok(self.working.participants.find(|p| p.email == email).cloned())
    }

    async fn insert_participant(&mut self, new: NewParticipantRecord) -> Result<Participant, StoreError> {
        if self
            .working
            .participants
            .find(|p| p.name == new.name || p.email == new.email)
            .is_some()
        {
            return Err(StoreError::UniqueViolation(
                "participant name or email already exists".into(),
            ));
        }

        let participant = Participant {
            id: ParticipantId::new(next(&mut self.working.seq.participant)),
            name: new.name,
            email: new.email,
            password_digest: new.password_digest,
            address: new.address,
            role: new.role,
        };
        self.working.participants.put(participant.clone());
        Ok(participant)
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<bool, StoreError> {
        if self
            .working
            .participants
            .find(|p| p.id != participant.id && (p.name == participant.name || p.email == participant.email))
            .is_some()
        {
            return Err(StoreError::UniqueViolation(
                "participant name or email already exists".into(),
            ));
        }

        match self.working.participants.get_mut(&participant.id) {
            Some(row) => {
                *row = participant.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_participant(&mut self, id: ParticipantId) -> Result<bool, StoreError> {
        let t = &mut self.working;

        // Orders first: a store's books are only referenced by that store's orders.
        let orders: Vec<OrderId> = t
            .orders
            .values()
            .filter(|o| o.buyer_id == id || o.store_id == id)
            .map(|o| o.id)
            .collect();
        for order in orders {
            t.delete_order_cascade(order);
        }

        let owned_books: Vec<Isbn> = t
            .books
            .values()
            .filter(|b| b.store_id == id)
            .map(|b| b.isbn.clone())
            .collect();
        for isbn in &owned_books {
            t.delete_book_cascade(isbn)?;
        }

        t.cart_items.delete_where(|c| c.user_id == id);
        Ok(t.participants.remove(&id).is_some())
    }

    async fn list_participants(
        &mut self,
        filter: &ParticipantFilter,
        page: Page,
    ) -> Result<Vec<Participant>, StoreError> {
        Ok(page.apply(
            self.working
                .participants
                .values()
                .filter(|p| filter.matches(p))
                .cloned(),
        ))
    }

    async fn administrator_exists(&mut self) -> Result<bool, StoreError> {
        Ok(self
            .working
            .participants
            .find(|p| p.role == Role::Administrator)
            .is_some())
    }

    async fn book(&mut self, isbn: &Isbn) -> Result<Option<Book>, StoreError> {
        Ok(self.working.books.get(isbn).cloned())
    }

    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError> {
        if self.working.books.get(&book.isbn).is_some() {
            return Err(StoreError::UniqueViolation(format!(
                "book {} already exists",
                book.isbn
            )));
        }
        if self.working.participants.get(&book.store_id).is_none() {
            return Err(StoreError::Backend(format!(
                "store {} does not exist",
                book.store_id
            )));
        }
        self.working.books.put(book.clone());
        Ok(())
    }

    async fn update_book(&mut self, book: &Book) -> Result<bool, StoreError> {
        match self.working.books.get_mut(&book.isbn) {
            Some(row) => {
                *row = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_book(&mut self, isbn: &Isbn) -> Result<bool, StoreError> {
        self.working.delete_book_cascade(isbn)
    }

    async fn find_books(&mut self, query: &BookQuery, page: Page) -> Result<Vec<Book>, StoreError> {
        let mut books: Vec<&Book> = self
            .working
            .books
            .values()
            .filter(|b| query.matches(b))
            .collect();
        books.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(page.apply(books.into_iter().cloned()))
    }

    async fn take_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError> {
        Ok(self.working.books.get_mut(isbn).and_then(|book| {
            let remaining = book.inventory.checked_sub(quantity)?;
            book.inventory = remaining;
            Some(remaining)
        }))
    }

    async fn restore_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError> {
        match self.working.books.get_mut(isbn) {
            Some(book) => {
                let restored = book.inventory.checked_add(quantity).ok_or_else(|| {
                    StoreError::Backend(format!("inventory overflow for book {isbn}"))
                })?;
                book.inventory = restored;
                Ok(Some(restored))
            }
            None => Ok(None),
        }
    }

    async fn cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self
            .working
            .cart_items
            .get(&id)
            .filter(|c| c.user_id == user)
            .cloned())
    }

    async fn cart_item_for_book(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
    ) -> Result<Option<CartItem>, StoreError> {
        Ok(self
            .working
            .cart_items
            .find(|c| c.user_id == user && &c.isbn == isbn)
            .cloned())
    }

    async fn insert_cart_item(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
        quantity: u32,
    ) -> Result<CartItem, StoreError> {
        if self
            .working
            .cart_items
            .find(|c| c.user_id == user && &c.isbn == isbn)
            .is_some()
        {
            return Err(StoreError::UniqueViolation(format!(
                "cart line for book {isbn} already exists"
            )));
        }

        let item = CartItem {
            id: CartItemId::new(next(&mut self.working.seq.cart_item)),
            user_id: user,
            isbn: isbn.clone(),
            quantity,
        };
        self.working.cart_items.put(item.clone());
        Ok(item)
    }

    async fn set_cart_quantity(&mut self, id: CartItemId, quantity: u32) -> Result<bool, StoreError> {
        match self.working.cart_items.get_mut(&id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<bool, StoreError> {
        let owned = self
            .working
            .cart_items
            .get(&id)
            .is_some_and(|c| c.user_id == user);
        Ok(owned && self.working.cart_items.remove(&id).is_some())
    }

    async fn clear_cart(&mut self, user: ParticipantId) -> Result<u64, StoreError> {
        Ok(self.working.cart_items.delete_where(|c| c.user_id == user) as u64)
    }

    async fn cart_lines(&mut self, user: ParticipantId) -> Result<Vec<CartLine>, StoreError> {
        Ok(self
            .working
            .cart_items
            .values()
            .filter(|c| c.user_id == user)
            .filter_map(|c| self.working.cart_line(c))
            .collect())
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, StoreError> {
        let order = Order {
            id: OrderId::new(next(&mut self.working.seq.order)),
            buyer_id: new.buyer_id,
            store_id: new.store_id,
            total_price: new.total_price,
            status: new.status,
            order_date: new.order_date,
        };
        self.working.orders.put(order.clone());

        for line in &new.lines {
            let detail = OrderDetail {
                id: OrderDetailId::new(next(&mut self.working.seq.order_detail)),
                order_id: order.id,
                isbn: line.isbn.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            };
            self.working.order_details.put(detail);
        }
        Ok(order)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn order_details(&mut self, id: OrderId) -> Result<Vec<OrderDetail>, StoreError> {
        Ok(self
            .working
            .order_details
            .values()
            .filter(|d| d.order_id == id)
            .cloned()
            .collect())
    }

    async fn order_view(&mut self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        Ok(self
            .working
            .orders
            .get(&id)
            .and_then(|o| self.working.order_view(o)))
    }

    async fn order_views(&mut self, scope: OrderScope, page: Page) -> Result<Vec<OrderView>, StoreError> {
        let mut orders: Vec<&Order> = self
            .working
            .orders
            .values()
            .filter(|o| scope.includes(o))
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then_with(|| b.id.cmp(&a.id)));

        Ok(page
            .apply(orders)
            .into_iter()
            .filter_map(|o| self.working.order_view(o))
            .collect())
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        match self.working.orders.get_mut(&id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool, StoreError> {
        Ok(self.working.delete_order_cascade(id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
