use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, put},
};

use bookstore_core::OrderId;
use bookstore_infra::Services;
use bookstore_sales::OrderRequest;

use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::reply;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/bookorders", get(all_orders).post(create_order))
        .route("/bookorders/", get(all_orders).post(create_order))
        .route("/bookorders/my-orders", get(my_orders))
        .route("/bookorders/store-orders", get(store_orders))
        .route("/bookorders/:id/status", put(update_status))
        .route("/bookorders/:id", get(get_order).delete(cancel_order))
}

pub async fn create_order(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    JsonBody(body): JsonBody<OrderRequest>,
) -> Response {
    reply(StatusCode::CREATED, services.create_order(ctx.principal(), body).await)
}

pub async fn my_orders(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(StatusCode::OK, services.my_orders(ctx.principal(), query.page()).await)
}

pub async fn store_orders(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(StatusCode::OK, services.store_orders(ctx.principal(), query.page()).await)
}

pub async fn all_orders(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(StatusCode::OK, services.all_orders(ctx.principal(), query.page()).await)
}

pub async fn update_status(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::StatusRequest>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let status = match body.status() {
        Ok(status) => status,
        Err(response) => return response,
    };
    reply(
        StatusCode::OK,
        services.update_order_status(ctx.principal(), id, status).await,
    )
}

pub async fn get_order(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.order(ctx.principal(), id).await)
}

pub async fn cancel_order(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let result = services
        .cancel_order(ctx.principal(), id)
        .await
        .map(|()| dto::MessageResponse::new(format!("Order {id} cancelled")));
    reply(StatusCode::OK, result)
}
