use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use bookstore_core::CartItemId;
use bookstore_infra::Services;
use bookstore_sales::AddToCart;

use crate::app::extract::JsonBody;
use crate::app::routes::reply;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/cart", get(view_cart).delete(clear_cart))
        .route("/cart/", get(view_cart).delete(clear_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/checkout", post(checkout))
        .route("/cart/:id", put(update_quantity).delete(remove_item))
}

pub async fn add_to_cart(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    JsonBody(body): JsonBody<AddToCart>,
) -> Response {
    reply(StatusCode::CREATED, services.add_to_cart(ctx.principal(), body).await)
}

pub async fn view_cart(Extension(services): Extension<Services>, ctx: PrincipalContext) -> Response {
    reply(StatusCode::OK, services.cart(ctx.principal()).await)
}

pub async fn update_quantity(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::CartQuantityRequest>,
) -> Response {
    let id: CartItemId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(
        StatusCode::OK,
        services
            .update_cart_quantity(ctx.principal(), id, body.quantity)
            .await,
    )
}

pub async fn remove_item(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id: CartItemId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let result = services
        .remove_from_cart(ctx.principal(), id)
        .await
        .map(|()| dto::MessageResponse::new("Item removed from cart"));
    reply(StatusCode::OK, result)
}

pub async fn clear_cart(Extension(services): Extension<Services>, ctx: PrincipalContext) -> Response {
    let result = services
        .clear_cart(ctx.principal())
        .await
        .map(|removed| dto::ClearCartResponse {
            message: "Cart cleared".to_string(),
            removed,
        });
    reply(StatusCode::OK, result)
}

pub async fn checkout(Extension(services): Extension<Services>, ctx: PrincipalContext) -> Response {
    let result = services
        .checkout(ctx.principal())
        .await
        .map(|order_ids| dto::CheckoutResponse {
            message: format!("Checkout created {} order(s)", order_ids.len()),
            order_ids,
        });
    reply(StatusCode::CREATED, result)
}
