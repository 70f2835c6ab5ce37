use axum::{http::header::CONTENT_TYPE, response::IntoResponse};

use crate::api::views::STYLESHEET;

#[utoipa::path(
    get,
    path = "/static/style.css",
    responses(
        (status = 200, description = "Stylesheet shared by the views", content_type = "text/css")
    ),
    tag = "assets"
)]
pub async fn stylesheet() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}
