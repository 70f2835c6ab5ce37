//! HTML views rendered from embedded minijinja templates. Template names end
//! in `.html`, so every interpolated value is HTML-escaped.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::{context, Environment};
use std::sync::OnceLock;
use tracing::error;
use url::Url;

pub const STYLESHEET: &str = r"
body {
    font-family: system-ui, -apple-system, sans-serif;
    background: #f6f1eb;
    color: #3b2a1e;
    display: flex;
    align-items: center;
    justify-content: center;
    min-height: 100vh;
    margin: 0;
}

main {
    background: #fff;
    border-radius: 12px;
    box-shadow: 0 4px 20px rgba(59, 42, 30, 0.12);
    padding: 2.5rem 3rem;
    text-align: center;
}

a.button {
    display: inline-block;
    margin-top: 1.5rem;
    padding: 0.75rem 1.5rem;
    border-radius: 8px;
    background: #6b3e26;
    color: #fff;
    text-decoration: none;
}

a.button:hover {
    background: #87502f;
}
";

const BASE_TEMPLATE: &str = include_str!("templates/base.html");
const LOGIN_TEMPLATE: &str = include_str!("templates/login.html");
const HOME_TEMPLATE: &str = include_str!("templates/home.html");

static TEMPLATES: OnceLock<Environment<'static>> = OnceLock::new();

/// Template failure, answered with a plain 500.
#[derive(Debug)]
pub struct RenderError(minijinja::Error);

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "failed to render template");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

fn templates() -> Result<&'static Environment<'static>, minijinja::Error> {
    if let Some(env) = TEMPLATES.get() {
        return Ok(env);
    }
    let mut env = Environment::new();
    env.add_template("base.html", BASE_TEMPLATE)?;
    env.add_template("login.html", LOGIN_TEMPLATE)?;
    env.add_template("home.html", HOME_TEMPLATE)?;
    Ok(TEMPLATES.get_or_init(|| env))
}

/// # Errors
/// Returns [`RenderError`] if the template fails to render.
pub fn login_page(authorization_url: &Url) -> Result<Html<String>, RenderError> {
    let html = templates()?
        .get_template("login.html")?
        .render(context! { authorization_url => authorization_url.as_str() })?;
    Ok(Html(html))
}

/// # Errors
/// Returns [`RenderError`] if the template fails to render.
pub fn home_page(display_name: &str) -> Result<Html<String>, RenderError> {
    let html = templates()?
        .get_template("home.html")?
        .render(context! { display_name => display_name })?;
    Ok(Html(html))
}
