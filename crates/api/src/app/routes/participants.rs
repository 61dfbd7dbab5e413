use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
};

use bookstore_infra::Services;
use bookstore_participants::NewParticipant;

use crate::app::dto;
use crate::app::extract::{FormBody, JsonBody};
use crate::app::routes::reply;

pub fn router() -> Router {
    Router::new()
        .route("/participants", post(register))
        .route("/participants/", post(register))
        .route("/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Services>,
    JsonBody(body): JsonBody<NewParticipant>,
) -> Response {
    reply(StatusCode::CREATED, services.register(body).await)
}

pub async fn login(
    Extension(services): Extension<Services>,
    FormBody(form): FormBody<dto::LoginForm>,
) -> Response {
    let scopes = match form.scopes() {
        Ok(scopes) => scopes,
        Err(response) => return response,
    };
    reply(
        StatusCode::OK,
        services.login(&form.username, &form.password, &scopes).await,
    )
}
