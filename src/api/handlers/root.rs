use axum::response::Response;

use crate::api::found;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 302, description = "Redirect to the login page")
    ),
    tag = "auth"
)]
pub async fn index() -> Response {
    found("/login")
}
