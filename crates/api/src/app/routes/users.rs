use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use bookstore_core::ParticipantId;
use bookstore_infra::Services;
use bookstore_participants::{NewParticipant, ParticipantChanges};

use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::reply;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/user", get(list_participants))
        .route("/user/", get(list_participants))
        .route("/user/me", get(me).put(update_me).delete(delete_me))
        .route("/user/stores", get(list_stores))
        .route("/user/search", get(search_participants))
        .route("/user/admin/create", post(admin_create))
        .route("/user/admin/:id", put(admin_update).delete(admin_delete))
        .route("/user/:id", get(get_participant))
}

pub async fn me(Extension(services): Extension<Services>, ctx: PrincipalContext) -> Response {
    reply(StatusCode::OK, services.me(ctx.principal()).await)
}

pub async fn update_me(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    JsonBody(body): JsonBody<ParticipantChanges>,
) -> Response {
    reply(StatusCode::OK, services.update_me(ctx.principal(), body).await)
}

pub async fn delete_me(Extension(services): Extension<Services>, ctx: PrincipalContext) -> Response {
    let result = services
        .delete_me(ctx.principal())
        .await
        .map(|()| dto::MessageResponse::new("Account deleted"));
    reply(StatusCode::OK, result)
}

pub async fn list_stores(
    Extension(services): Extension<Services>,
    _ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(StatusCode::OK, services.list_stores(query.page()).await)
}

pub async fn list_participants(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> Response {
    reply(
        StatusCode::OK,
        services.list_participants(ctx.principal(), query.page()).await,
    )
}

pub async fn search_participants(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    QueryParams(query): QueryParams<dto::ParticipantSearchQuery>,
) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(response) => return response,
    };
    reply(
        StatusCode::OK,
        services
            .search_participants(ctx.principal(), filter, query.page())
            .await,
    )
}

pub async fn get_participant(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id: ParticipantId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.participant(ctx.principal(), id).await)
}

pub async fn admin_create(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    JsonBody(body): JsonBody<NewParticipant>,
) -> Response {
    reply(StatusCode::CREATED, services.admin_create(ctx.principal(), body).await)
}

pub async fn admin_update(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ParticipantChanges>,
) -> Response {
    let id: ParticipantId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    reply(StatusCode::OK, services.admin_update(ctx.principal(), id, body).await)
}

pub async fn admin_delete(
    Extension(services): Extension<Services>,
    ctx: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id: ParticipantId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let result = services
        .admin_delete(ctx.principal(), id)
        .await
        .map(|()| dto::MessageResponse::new(format!("Participant {id} deleted")));
    reply(StatusCode::OK, result)
}
