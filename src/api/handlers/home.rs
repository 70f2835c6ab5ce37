use axum::response::Html;

use crate::api::{
    auth::Identity,
    views::{self, RenderError},
};

#[utoipa::path(
    get,
    path = "/home",
    responses(
        (status = 200, description = "Home page for the signed-in user", content_type = "text/html"),
        (status = 302, description = "Not signed in, redirect to the login page"),
        (status = 500, description = "Page could not be rendered", body = String)
    ),
    tag = "auth"
)]
pub async fn home(identity: Identity) -> Result<Html<String>, RenderError> {
    views::home_page(identity.display_name())
}
