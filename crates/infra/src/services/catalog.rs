//! Book catalog: browsing is public, writes
//! belong to the owning store (or an administrator).

use tracing::instrument;

use bookstore_auth::{Principal, Role, require_role, require_store_owner_or_admin};
use bookstore_catalog::{Book, BookChanges, BookQuery, NewBook};
use bookstore_core::{DomainError, Isbn, Page, ParticipantId};

use super::{ServiceError, Services, finish};
use crate::store::{StoreError, UnitOfWork};

impl Services {
    /// Stores list books for themselves; administrators must name the store.
    #[instrument(skip(self, principal, new), fields(caller = %principal.id, isbn = %new.isbn), err)]
    pub async fn create_book(&self, principal: &Principal, new: NewBook) -> Result<Book, ServiceError> {
        let store_id = match principal.role {
            Role::Store => match new.store_id {
                None => principal.id,
                Some(id) if id == principal.id => id,
                Some(_) => {
                    return Err(DomainError::forbidden("stores can only list books for themselves").into());
                }
            },
            Role::Administrator => new
                .store_id
                .ok_or_else(|| DomainError::validation("store_id is required"))?,
            Role::Buyer => {
                return Err(DomainError::forbidden("only stores and administrators can list books").into());
            }
        };
        let book = new.into_book(store_id)?;

        let mut uow = self.store.begin().await?;
        let result = insert_book(uow.as_mut(), book).await;
        finish(uow, result).await
    }

    pub async fn book(&self, isbn: &Isbn) -> Result<Book, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = load_book(uow.as_mut(), isbn).await;
        finish(uow, result).await
    }

    #[instrument(skip(self, principal, changes), fields(caller = %principal.id, isbn = %isbn), err)]
    pub async fn update_book(
        &self,
        principal: &Principal,
        isbn: &Isbn,
        changes: BookChanges,
    ) -> Result<Book, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = update_book(uow.as_mut(), principal, isbn, &changes).await;
        finish(uow, result).await
    }

    #[instrument(skip(self, principal), fields(caller = %principal.id, isbn = %isbn), err)]
    pub async fn delete_book(&self, principal: &Principal, isbn: &Isbn) -> Result<(), ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = delete_book(uow.as_mut(), principal, isbn).await;
        finish(uow, result).await
    }

    pub async fn list_books(&self, page: Page) -> Result<Vec<Book>, ServiceError> {
        self.find_books(BookQuery::all(), page).await
    }

    /// `q` starting with `@` is an exact match; otherwise a substring match.
    pub async fn search_books(
        &self,
        q: Option<&str>,
        category: Option<&str>,
        page: Page,
    ) -> Result<Vec<Book>, ServiceError> {
        self.find_books(BookQuery::search(q, category), page).await
    }

    pub async fn books_by_category(&self, category: &str, page: Page) -> Result<Vec<Book>, ServiceError> {
        self.find_books(BookQuery::by_category(category), page).await
    }

    pub async fn books_by_store(&self, store_id: ParticipantId, page: Page) -> Result<Vec<Book>, ServiceError> {
        self.find_books(BookQuery::by_store(store_id), page).await
    }

    /// The calling store's books with fewer than `threshold` units left.
    pub async fn low_inventory(
        &self,
        principal: &Principal,
        threshold: Option<u32>,
        page: Page,
    ) -> Result<Vec<Book>, ServiceError> {
        require_role(principal, Role::Store)?;
        self.find_books(BookQuery::low_inventory(principal.id, threshold), page)
            .await
    }

    async fn find_books(&self, query: BookQuery, page: Page) -> Result<Vec<Book>, ServiceError> {
        let mut uow = self.store.begin().await?;
        let result = uow.find_books(&query, page).await.map_err(ServiceError::from);
        finish(uow, result).await
    }
}

pub(crate) async fn load_book(uow: &mut dyn UnitOfWork, isbn: &Isbn) -> Result<Book, ServiceError> {
    uow.book(isbn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Book {isbn}")).into())
}

async fn insert_book(uow: &mut dyn UnitOfWork, book: Book) -> Result<Book, ServiceError> {
    let owner = uow.participant(book.store_id).await?;
    if !owner.is_some_and(|p| p.role == Role::Store) {
        return Err(DomainError::validation(format!("participant {} is not a store", book.store_id)).into());
    }
    if uow.book(&book.isbn).await?.is_some() {
        return Err(DomainError::conflict(format!("Book {} already exists", book.isbn)).into());
    }
    uow.insert_book(&book).await?;
    tracing::info!(isbn = %book.isbn, store_id = %book.store_id, "book listed");
    Ok(book)
}

async fn update_book(
    uow: &mut dyn UnitOfWork,
    principal: &Principal,
    isbn: &Isbn,
    changes: &BookChanges,
) -> Result<Book, ServiceError> {
    let mut book = load_book(uow, isbn).await?;
    require_store_owner_or_admin(principal, book.store_id)?;
    changes.apply_to(&mut book)?;
    uow.update_book(&book).await?;
    Ok(book)
}

async fn delete_book(uow: &mut dyn UnitOfWork, principal: &Principal, isbn: &Isbn) -> Result<(), ServiceError> {
    let book = load_book(uow, isbn).await?;
    require_store_owner_or_admin(principal, book.store_id)?;
    match uow.delete_book(isbn).await {
        Ok(_) => Ok(()),
        Err(StoreError::ForeignKeyViolation(_)) => {
            Err(DomainError::conflict(format!("Book {isbn} has orders and cannot be deleted")).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{fixture, isbn, price, stock};

    fn new_book(raw: &str, store_id: Option<ParticipantId>) -> NewBook {
        NewBook {
            isbn: isbn(raw),
            name: "Dune".into(),
            authors: "Frank Herbert".into(),
            category: Some("SciFi".into()),
            inventory: 4,
            price: price("9.99"),
            store_id,
            image_url: None,
        }
    }

    fn kind(err: &ServiceError) -> &DomainError {
        err.domain().expect("domain error")
    }

    #[tokio::test]
    async fn store_lists_for_itself_only() {
        let f = fixture().await;
        let book = f.services.create_book(&f.store_a, new_book("111", None)).await.unwrap();
        assert_eq!(book.store_id, f.store_a.id);

        let err = f
            .services
            .create_book(&f.store_a, new_book("222", Some(f.store_b.id)))
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), DomainError::Forbidden(_)));

        let err = f.services.create_book(&f.buyer, new_book("333", None)).await.unwrap_err();
        assert!(matches!(kind(&err), DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_must_name_an_existing_store() {
        let f = fixture().await;
        let missing = f.services.create_book(&f.admin, new_book("111", None)).await.unwrap_err();
        assert!(matches!(kind(&missing), DomainError::Validation(_)));

        let not_a_store = f
            .services
            .create_book(&f.admin, new_book("111", Some(f.buyer.id)))
            .await
            .unwrap_err();
        assert!(matches!(kind(&not_a_store), DomainError::Validation(_)));

        let book = f
            .services
            .create_book(&f.admin, new_book("111", Some(f.store_b.id)))
            .await
            .unwrap();
        assert_eq!(book.store_id, f.store_b.id);
    }

    #[tokio::test]
    async fn duplicate_isbn_conflicts() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 1).await;
        let err = f.services.create_book(&f.store_b, new_book("111", None)).await.unwrap_err();
        assert!(matches!(kind(&err), DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_edit() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 1).await;
        let changes = BookChanges {
            price: Some(price("2.50")),
            ..Default::default()
        };

        let err = f
            .services
            .update_book(&f.store_b, &isbn("111"), changes.clone())
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), DomainError::Forbidden(_)));

        let updated = f.services.update_book(&f.store_a, &isbn("111"), changes).await.unwrap();
        assert_eq!(updated.price, price("2.50"));
        assert_eq!(f.services.book(&isbn("111")).await.unwrap().price, price("2.50"));

        let err = f.services.delete_book(&f.buyer, &isbn("111")).await.unwrap_err();
        assert!(matches!(kind(&err), DomainError::Forbidden(_)));
        f.services.delete_book(&f.admin, &isbn("111")).await.unwrap();

        let err = f.services.book(&isbn("111")).await.unwrap_err();
        assert_eq!(kind(&err), &DomainError::not_found("Book 111"));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 1).await;
        let err = f
            .services
            .update_book(&f.store_a, &isbn("111"), BookChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn search_category_and_store_views() {
        let f = fixture().await;
        f.services.create_book(&f.store_a, new_book("111", None)).await.unwrap();
        stock(&f.services, &f.store_b, "222", "3.00", 20).await;

        let hits = f.services.search_books(Some("herbert"), None, Page::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].isbn, isbn("111"));

        let exact = f.services.search_books(Some("@Book 222"), None, Page::default()).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert!(
            f.services
                .search_books(Some("@book 222"), None, Page::default())
                .await
                .unwrap()
                .is_empty()
        );

        let scifi = f.services.books_by_category("scifi", Page::default()).await.unwrap();
        assert_eq!(scifi.len(), 1);

        let of_b = f.services.books_by_store(f.store_b.id, Page::default()).await.unwrap();
        assert_eq!(of_b.len(), 1);
        assert_eq!(f.services.list_books(Page::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn low_inventory_is_per_store() {
        let f = fixture().await;
        stock(&f.services, &f.store_a, "111", "1.00", 3).await;
        stock(&f.services, &f.store_a, "222", "1.00", 10).await;
        stock(&f.services, &f.store_b, "333", "1.00", 1).await;

        let low = f.services.low_inventory(&f.store_a, None, Page::default()).await.unwrap();
        assert_eq!(low.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(), vec!["111"]);

        let custom = f.services.low_inventory(&f.store_a, Some(11), Page::default()).await.unwrap();
        assert_eq!(custom.len(), 2);

        let err = f.services.low_inventory(&f.buyer, None, Page::default()).await.unwrap_err();
        assert!(matches!(kind(&err), DomainError::Forbidden(_)));
    }
}
