//! Postgres-backed store.
//!
//! Each [`UnitOfWork`] wraps one sqlx transaction. Inventory decrements are a
//! single conditional `UPDATE … WHERE inventory >= $n`, so two concurrent
//! orders against the same book serialize on the row lock and the loser sees
//! zero affected rows instead of a negative counter.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//! | ColumnDecode / row mapping | N/A | `Decode` |

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{Span, instrument};

use bookstore_auth::Role;
use bookstore_catalog::{Book, BookQuery, TextMatch};
use bookstore_core::{CartItemId, Isbn, OrderDetailId, OrderId, Page, ParticipantId, Price};
use bookstore_participants::{Participant, ParticipantFilter};
use bookstore_sales::{
    CartItem, CartLine, NewOrder, Order, OrderDetail, OrderLineView, OrderScope, OrderStatus, OrderView,
};

use super::r#trait::{NewParticipantRecord, Store, StoreError, UnitOfWork};

const SCHEMA: &str = include_str!("../../migrations/0001_bookstore.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Idempotent (`IF NOT EXISTS` throughout).
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Row types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct ParticipantRow {
    id: i64,
    name: String,
    email: String,
    password_digest: String,
    address: Option<String>,
    participant_type: String,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StoreError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(Participant {
            id: ParticipantId::new(row.id),
            name: row.name,
            email: row.email,
            password_digest: row.password_digest,
            address: row.address,
            role: row
                .participant_type
                .parse::<Role>()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
        })
    }
}

#[derive(FromRow)]
struct BookRow {
    isbn: String,
    name: String,
    authors: String,
    category: Option<String>,
    inventory: i32,
    price: Decimal,
    store_id: i64,
    image_url: Option<String>,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            isbn: decode_isbn(&row.isbn)?,
            name: row.name,
            authors: row.authors,
            category: row.category,
            inventory: from_db_count(row.inventory)?,
            price: decode_price(row.price)?,
            store_id: ParticipantId::new(row.store_id),
            image_url: row.image_url,
        })
    }
}

#[derive(FromRow)]
struct CartItemRow {
    id: i64,
    user_id: i64,
    book_isbn: String,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(CartItem {
            id: CartItemId::new(row.id),
            user_id: ParticipantId::new(row.user_id),
            isbn: decode_isbn(&row.book_isbn)?,
            quantity: from_db_count(row.quantity)?,
        })
    }
}

#[derive(FromRow)]
struct CartLineRow {
    id: i64,
    book_isbn: String,
    quantity: i32,
    book_name: String,
    authors: String,
    price: Decimal,
    inventory: i32,
    store_id: i64,
    store_name: String,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(CartLine {
            id: CartItemId::new(row.id),
            isbn: decode_isbn(&row.book_isbn)?,
            quantity: from_db_count(row.quantity)?,
            book_name: row.book_name,
            authors: row.authors,
            price: decode_price(row.price)?,
            inventory: from_db_count(row.inventory)?,
            store_id: ParticipantId::new(row.store_id),
            store_name: row.store_name,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    store_id: i64,
    total_price: Decimal,
    status: String,
    order_date: NaiveDate,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::new(row.id),
            buyer_id: ParticipantId::new(row.user_id),
            store_id: ParticipantId::new(row.store_id),
            total_price: row.total_price,
            status: row
                .status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            order_date: row.order_date,
        })
    }
}

#[derive(FromRow)]
struct OrderHeaderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    buyer_name: String,
    shipping_address: Option<String>,
    store_name: String,
    store_address: Option<String>,
}

#[derive(FromRow)]
struct OrderDetailRow {
    id: i64,
    order_id: i64,
    book_isbn: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderDetailRow> for OrderDetail {
    type Error = StoreError;

    fn try_from(row: OrderDetailRow) -> Result<Self, Self::Error> {
        Ok(OrderDetail {
            id: OrderDetailId::new(row.id),
            order_id: OrderId::new(row.order_id),
            isbn: decode_isbn(&row.book_isbn)?,
            quantity: from_db_count(row.quantity)?,
            unit_price: decode_price(row.unit_price)?,
        })
    }
}

#[derive(FromRow)]
struct OrderLineRow {
    #[sqlx(flatten)]
    detail: OrderDetailRow,
    book_name: String,
    authors: String,
    image_url: Option<String>,
}

const PARTICIPANT_COLUMNS: &str = "id, name, email, password_digest, address, participant_type";
const BOOK_COLUMNS: &str = "isbn, name, authors, category, inventory, price, store_id, image_url";

// ─────────────────────────────────────────────────────────────────────────────
// Unit of work
// ─────────────────────────────────────────────────────────────────────────────

impl PgUnitOfWork {
    async fn participant_where(&mut self, column: &str, value: &str) -> Result<Option<Participant>, StoreError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE {column} = $1");
        sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("participant_where", e))?
            .map(Participant::try_from)
            .transpose()
    }

    /// Hydrate headers with their detail lines in one extra round trip.
    async fn hydrate(&mut self, headers: Vec<OrderHeaderRow>) -> Result<Vec<OrderView>, StoreError> {
        let ids: Vec<i64> = headers.iter().map(|h| h.order.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT d.id, d.order_id, d.book_isbn, d.quantity, d.unit_price,
                   b.name AS book_name, b.authors, b.image_url
            FROM order_details d
            JOIN books b ON b.isbn = d.book_isbn
            WHERE d.order_id = ANY($1)
            ORDER BY d.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("hydrate_orders", e))?;

        let mut by_order: HashMap<i64, Vec<OrderLineView>> = HashMap::new();
        for line in lines {
            let order_id = line.detail.order_id;
            by_order.entry(order_id).or_default().push(OrderLineView {
                detail: OrderDetail::try_from(line.detail)?,
                book_name: line.book_name,
                authors: line.authors,
                image_url: line.image_url,
            });
        }

        headers
            .into_iter()
            .map(|h| {
                let details = by_order.remove(&h.order.id).unwrap_or_default();
                Ok(OrderView {
                    order: Order::try_from(h.order)?,
                    buyer_name: h.buyer_name,
                    shipping_address: h.shipping_address,
                    store_name: h.store_name,
                    store_address: h.store_address,
                    details,
                })
            })
            .collect()
    }
}

const ORDER_HEADER_SELECT: &str = r#"
    SELECT o.id, o.user_id, o.store_id, o.total_price, o.status, o.order_date,
           buyer.name AS buyer_name, buyer.address AS shipping_address,
           store.name AS store_name, store.address AS store_address
    FROM orders o
    JOIN participants buyer ON buyer.id = o.user_id
    JOIN participants store ON store.id = o.store_id
"#;

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn participant(&mut self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
        sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("participant", e))?
            .map(Participant::try_from)
            .transpose()
    }

    async fn participant_by_name(&mut self, name: &str) -> Result<Option<Participant>, StoreError> {
        self.participant_where("name", name).await
    }

    async fn participant_by_email(&mut self, email: &str) -> Result<Option<Participant>, StoreError> {
        self.participant_where("email", email).await
    }

    #[instrument(skip(self, new), fields(name = %new.name, role = %new.role), err)]
    async fn insert_participant(&mut self, new: NewParticipantRecord) -> Result<Participant, StoreError> {
        let sql = format!(
            "INSERT INTO participants (name, email, password_digest, address, participant_type) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PARTICIPANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_digest)
            .bind(&new.address)
            .bind(new.role.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_participant", e))?;
        Participant::try_from(row)
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET name = $2, email = $3, password_digest = $4, address = $5, participant_type = $6
            WHERE id = $1
            "#,
        )
        .bind(participant.id.get())
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(&participant.password_digest)
        .bind(&participant.address)
        .bind(participant.role.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_participant", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_participant(&mut self, id: ParticipantId) -> Result<bool, StoreError> {
        // Foreign keys cascade to books, cart_items, orders and order_details.
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_participant", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_participants(
        &mut self,
        filter: &ParticipantFilter,
        page: Page,
    ) -> Result<Vec<Participant>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE TRUE"
        ));
        if let Some(role) = filter.role {
            qb.push(" AND participant_type = ").push_bind(role.as_str());
        }
        if let Some(needle) = filter.needle() {
            qb.push(" AND (POSITION(")
                .push_bind(needle.clone())
                .push(" IN LOWER(name)) > 0 OR POSITION(")
                .push_bind(needle)
                .push(" IN LOWER(email)) > 0)");
        }
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.skip));

        qb.build_query_as::<ParticipantRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_participants", e))?
            .into_iter()
            .map(Participant::try_from)
            .collect()
    }

    async fn administrator_exists(&mut self) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM participants WHERE participant_type = 'administrator')",
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("administrator_exists", e))
    }

    async fn book(&mut self, isbn: &Isbn) -> Result<Option<Book>, StoreError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = $1");
        sqlx::query_as::<_, BookRow>(&sql)
            .bind(isbn.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("book", e))?
            .map(Book::try_from)
            .transpose()
    }

    #[instrument(skip(self, book), fields(isbn = %book.isbn, store_id = %book.store_id), err)]
    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO books (isbn, name, authors, category, inventory, price, store_id, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(&book.name)
        .bind(&book.authors)
        .bind(&book.category)
        .bind(to_db_count(book.inventory)?)
        .bind(book.price.amount())
        .bind(book.store_id.get())
        .bind(&book.image_url)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_book", e))?;
        Ok(())
    }

    async fn update_book(&mut self, book: &Book) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET name = $2, authors = $3, category = $4, inventory = $5, price = $6, image_url = $7
            WHERE isbn = $1
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(&book.name)
        .bind(&book.authors)
        .bind(&book.category)
        .bind(to_db_count(book.inventory)?)
        .bind(book.price.amount())
        .bind(&book.image_url)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_book", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_book(&mut self, isbn: &Isbn) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = $1")
            .bind(isbn.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_books(&mut self, query: &BookQuery, page: Page) -> Result<Vec<Book>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE TRUE"));
        match &query.text {
            Some(TextMatch::Exact(term)) => {
                qb.push(" AND (isbn = ")
                    .push_bind(term.clone())
                    .push(" OR name = ")
                    .push_bind(term.clone())
                    .push(" OR authors = ")
                    .push_bind(term.clone())
                    .push(")");
            }
            Some(TextMatch::Contains(needle)) => {
                qb.push(" AND (POSITION(")
                    .push_bind(needle.clone())
                    .push(" IN LOWER(name)) > 0 OR POSITION(")
                    .push_bind(needle.clone())
                    .push(" IN LOWER(authors)) > 0)");
            }
            None => {}
        }
        if let Some(category) = &query.category {
            qb.push(" AND LOWER(category) = ").push_bind(category.clone());
        }
        if let Some(store_id) = query.store_id {
            qb.push(" AND store_id = ").push_bind(store_id.get());
        }
        if let Some(threshold) = query.inventory_below {
            qb.push(" AND inventory < ").push_bind(i64::from(threshold));
        }
        qb.push(" ORDER BY name, isbn LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.skip));

        qb.build_query_as::<BookRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_books", e))?
            .into_iter()
            .map(Book::try_from)
            .collect()
    }

    #[instrument(skip(self), fields(isbn = %isbn, remaining), err)]
    async fn take_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError> {
        let quantity = to_db_count(quantity)?;
        let remaining = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE books
            SET inventory = inventory - $2
            WHERE isbn = $1 AND inventory >= $2
            RETURNING inventory
            "#,
        )
        .bind(isbn.as_str())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("take_inventory", e))?;

        if let Some(remaining) = remaining {
            Span::current().record("remaining", remaining);
        }
        remaining.map(from_db_count).transpose()
    }

    async fn restore_inventory(&mut self, isbn: &Isbn, quantity: u32) -> Result<Option<u32>, StoreError> {
        let restored = sqlx::query_scalar::<_, i32>(
            "UPDATE books SET inventory = inventory + $2 WHERE isbn = $1 RETURNING inventory",
        )
        .bind(isbn.as_str())
        .bind(to_db_count(quantity)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("restore_inventory", e))?;
        restored.map(from_db_count).transpose()
    }

    async fn cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        sqlx::query_as::<_, CartItemRow>(
            "SELECT id, user_id, book_isbn, quantity FROM cart_items WHERE id = $1 AND user_id = $2",
        )
        .bind(id.get())
        .bind(user.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("cart_item", e))?
        .map(CartItem::try_from)
        .transpose()
    }

    async fn cart_item_for_book(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
    ) -> Result<Option<CartItem>, StoreError> {
        sqlx::query_as::<_, CartItemRow>(
            "SELECT id, user_id, book_isbn, quantity FROM cart_items WHERE user_id = $1 AND book_isbn = $2",
        )
        .bind(user.get())
        .bind(isbn.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("cart_item_for_book", e))?
        .map(CartItem::try_from)
        .transpose()
    }

    async fn insert_cart_item(
        &mut self,
        user: ParticipantId,
        isbn: &Isbn,
        quantity: u32,
    ) -> Result<CartItem, StoreError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r#"
            INSERT INTO cart_items (user_id, book_isbn, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, book_isbn, quantity
            "#,
        )
        .bind(user.get())
        .bind(isbn.as_str())
        .bind(to_db_count(quantity)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_cart_item", e))?;
        CartItem::try_from(row)
    }

    async fn set_cart_quantity(&mut self, id: CartItemId, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to_db_count(quantity)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_cart_quantity", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_cart_item(&mut self, user: ParticipantId, id: CartItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id.get())
            .bind(user.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_cart_item", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_cart(&mut self, user: ParticipantId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(result.rows_affected())
    }

    async fn cart_lines(&mut self, user: ParticipantId) -> Result<Vec<CartLine>, StoreError> {
        sqlx::query_as::<_, CartLineRow>(
            r#"
            SELECT c.id, c.book_isbn, c.quantity,
                   b.name AS book_name, b.authors, b.price, b.inventory, b.store_id,
                   s.name AS store_name
            FROM cart_items c
            JOIN books b ON b.isbn = c.book_isbn
            JOIN participants s ON s.id = b.store_id
            WHERE c.user_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(user.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("cart_lines", e))?
        .into_iter()
        .map(CartLine::try_from)
        .collect()
    }

    #[instrument(skip(self, new), fields(buyer_id = %new.buyer_id, store_id = %new.store_id, lines = new.lines.len(), order_id), err)]
    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (user_id, store_id, total_price, status, order_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, store_id, total_price, status, order_date
            "#,
        )
        .bind(new.buyer_id.get())
        .bind(new.store_id.get())
        .bind(new.total_price)
        .bind(new.status.as_str())
        .bind(new.order_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        let order = Order::try_from(row)?;
        Span::current().record("order_id", order.id.get());

        for line in &new.lines {
            sqlx::query(
                r#"
                INSERT INTO order_details (order_id, book_isbn, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id.get())
            .bind(line.isbn.as_str())
            .bind(to_db_count(line.quantity)?)
            .bind(line.unit_price.amount())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_detail", e))?;
        }
        Ok(order)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, store_id, total_price, status, order_date FROM orders WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order", e))?
        .map(Order::try_from)
        .transpose()
    }

    async fn order_details(&mut self, id: OrderId) -> Result<Vec<OrderDetail>, StoreError> {
        sqlx::query_as::<_, OrderDetailRow>(
            "SELECT id, order_id, book_isbn, quantity, unit_price FROM order_details WHERE order_id = $1 ORDER BY id",
        )
        .bind(id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_details", e))?
        .into_iter()
        .map(OrderDetail::try_from)
        .collect()
    }

    async fn order_view(&mut self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        let sql = format!("{ORDER_HEADER_SELECT} WHERE o.id = $1");
        let header = sqlx::query_as::<_, OrderHeaderRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_view", e))?;

        match header {
            Some(header) => Ok(self.hydrate(vec![header]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn order_views(&mut self, scope: OrderScope, page: Page) -> Result<Vec<OrderView>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(ORDER_HEADER_SELECT);
        match scope {
            OrderScope::Buyer(id) => {
                qb.push(" WHERE o.user_id = ").push_bind(id.get());
            }
            OrderScope::Store(id) => {
                qb.push(" WHERE o.store_id = ").push_bind(id.get());
            }
            OrderScope::All => {}
        }
        qb.push(" ORDER BY o.order_date DESC, o.id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.skip));

        let headers = qb
            .build_query_as::<OrderHeaderRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_views", e))?;
        self.hydrate(headers).await
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.get())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_order_status", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

fn to_db_count(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("count {value} exceeds column range")))
}

fn from_db_count(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("negative count {value}")))
}

fn decode_isbn(raw: &str) -> Result<Isbn, StoreError> {
    Isbn::parse(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_price(raw: Decimal) -> Result<Price, StoreError> {
    Price::new(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            classify_sqlstate(db_err.code().as_deref(), msg)
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn classify_sqlstate(code: Option<&str>, msg: String) -> StoreError {
    match code {
        Some("23505") => StoreError::UniqueViolation(msg),
        Some("23503") => StoreError::ForeignKeyViolation(msg),
        Some("40P01") | Some("40001") => StoreError::Contention(msg),
        _ => StoreError::Backend(msg),
    }
}
