use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use bookstore_catalog::{BookChanges, NewBook};
use bookstore_core::{Isbn, ParticipantId};
use bookstore_infra::Services;

use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::reply;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/book", get(list_books).post(create_book))
        .route("/book/", get(list_books).post(create_book))
        .route("/book/search", get(search_books))
        .route("/book/category/:category", get(books_by_category))
        .route("/book/store/:id", get(books_by_store))
        .route("/book/inventory/low", get(low_inventory))
        .route("/book/:isbn", get(get_book).put(update_book).delete(delete_book))
}

pub async fn list_books(
    Extension(services): Extension<Services>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(StatusCode::OK, services.list_books(query.page()).await)
}

pub async fn create_book(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    JsonBody(body): JsonBody<NewBook>,
) -> Response {
    reply(StatusCode::CREATED, services.create_book(ctx.principal(), body).await)
}

pub async fn search_books(
    Extension(services): Extension<Services>,
    QueryParams(query): QueryParams<dto::BookSearchQuery>,
) -> Response {
    let result = services
        .search_books(query.q.as_deref(), query.category.as_deref(), query.page())
        .await;
    reply(StatusCode::OK, result)
}

pub async fn books_by_category(
    Extension(services): Extension<Services>,
    Path(category): Path<String>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(
        StatusCode::OK,
        services.books_by_category(&category, query.page()).await,
    )
}

pub async fn books_by_store(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    let store_id: ParticipantId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.books_by_store(store_id, query.page()).await)
}

pub async fn low_inventory(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::LowInventoryQuery>,
) -> Response {
    reply(
        StatusCode::OK,
        services
            .low_inventory(ctx.principal(), query.threshold, query.page())
            .await,
    )
}

pub async fn get_book(Extension(services): Extension<Services>, Path(isbn): Path<String>) -> Response {
    let isbn: Isbn = match errors::parse_id(&isbn) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.book(&isbn).await)
}

pub async fn update_book(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(isbn): Path<String>,
    JsonBody(body): JsonBody<BookChanges>,
) -> Response {
    let isbn: Isbn = match errors::parse_id(&isbn) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.update_book(ctx.principal(), &isbn, body).await)
}

pub async fn delete_book(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(isbn): Path<String>,
) -> Response {
    let isbn: Isbn = match errors::parse_id(&isbn) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let result = services
        .delete_book(ctx.principal(), &isbn)
        .await
        .map(|()| dto::MessageResponse::new(format!("Book {isbn} deleted")));
    reply(StatusCode::OK, result)
}
