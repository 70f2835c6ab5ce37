use axum::{extract::State, response::Html};

use crate::api::{
    state::AppState,
    views::{self, RenderError},
};

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page linking to the gateway", content_type = "text/html"),
        (status = 500, description = "Page could not be rendered", body = String)
    ),
    tag = "auth"
)]
pub async fn login(State(state): State<AppState>) -> Result<Html<String>, RenderError> {
    views::login_page(state.config().authorization_url())
}
