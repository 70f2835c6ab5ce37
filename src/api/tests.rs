use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use tower::ServiceExt;

use super::{
    router,
    state::AuthMode,
    test_support::{app_state, StubGateway},
};

/// Minimal cookie-keeping client around the router.
#[derive(Default)]
struct Browser {
    cookies: BTreeMap<String, String>,
}

impl Browser {
    fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    async fn request(&mut self, app: &Router, method: Method, uri: &str) -> Result<Response> {
        let mut request = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, header);
        }

        let response = app.clone().oneshot(request.body(Body::empty())?).await?;

        for set_cookie in set_cookies(&response) {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                if set_cookie.contains("Max-Age=0") {
                    self.cookies.remove(name);
                } else {
                    self.cookies.insert(name.to_string(), value.to_string());
                }
            }
        }

        Ok(response)
    }

    async fn get(&mut self, app: &Router, uri: &str) -> Result<Response> {
        self.request(app, Method::GET, uri).await
    }

    fn has(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn auth_set_cookie(response: &Response) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|cookie| cookie.starts_with("auth="))
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn app(mode: AuthMode, gateway: &Arc<StubGateway>) -> Result<Router> {
    Ok(router(app_state(mode, gateway.clone())?))
}

#[tokio::test]
async fn index_redirects_to_login() -> Result<()> {
    let app = app(AuthMode::Cookie, &Arc::new(StubGateway::default()))?;
    let response = Browser::default().get(&app, "/").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login"));
    Ok(())
}

#[tokio::test]
async fn login_page_links_to_gateway() -> Result<()> {
    let app = app(AuthMode::Session, &Arc::new(StubGateway::default()))?;
    let response = Browser::default().get(&app, "/login").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("auth?project_uuid=00000000-0000-0000-0000-000000000000"));
    Ok(())
}

#[tokio::test]
async fn home_requires_login_in_both_modes() -> Result<()> {
    for mode in [AuthMode::Session, AuthMode::Cookie] {
        let app = app(mode, &Arc::new(StubGateway::default()))?;
        let response = Browser::default().get(&app, "/home").await?;
        assert_eq!(response.status(), StatusCode::FOUND, "{mode}");
        assert_eq!(location(&response), Some("/login"), "{mode}");
    }
    Ok(())
}

#[tokio::test]
async fn callback_error_policy() -> Result<()> {
    let app = app(AuthMode::Cookie, &Arc::new(StubGateway::default()))?;
    let cases = [
        ("/callback", StatusCode::BAD_REQUEST, "Missing payload"),
        ("/callback?payload=", StatusCode::BAD_REQUEST, "Missing payload"),
        (
            "/callback?payload=garbage",
            StatusCode::BAD_REQUEST,
            "Invalid payload or verification error",
        ),
        (
            "/callback?payload=broken",
            StatusCode::BAD_REQUEST,
            "Invalid payload or verification error",
        ),
        (
            "/callback?payload=denied.u123",
            StatusCode::UNAUTHORIZED,
            "Authentication failed",
        ),
    ];

    for (uri, status, body) in cases {
        let mut browser = Browser::default();
        let response = browser.get(&app, uri).await?;
        assert_eq!(response.status(), status, "{uri}");
        assert!(auth_set_cookie(&response).is_none(), "{uri}");
        assert_eq!(body_text(response).await?, body, "{uri}");

        let response = browser.get(&app, "/home").await?;
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn cookie_mode_sign_in_flow() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Cookie, &gateway)?;
    let mut browser = Browser::default();

    let response = browser.get(&app, "/callback?payload=ok.u123").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/home"));

    let auth = auth_set_cookie(&response).unwrap_or_default();
    assert!(auth.contains("HttpOnly"));
    assert!(auth.contains("Path=/"));
    assert!(auth.contains("SameSite=Lax"));
    assert!(auth.contains("Max-Age=604800"));
    assert!(!auth.contains("Secure"));
    assert!(browser.has("session"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("alice"));

    // The callback lookup is the only one; the session carries the username.
    assert_eq!(gateway.lookups(), 1);
    Ok(())
}

#[tokio::test]
async fn cookie_issue_failure_is_internal_error() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_binary_garbage_tokens());
    let app = app(AuthMode::Cookie, &gateway)?;
    let mut browser = Browser::default();

    let response = browser.get(&app, "/callback?payload=ok.u123").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await?, "Internal server error");

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    Ok(())
}

#[tokio::test]
async fn auth_cookie_restores_login_in_fresh_session() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Cookie, &gateway)?;
    let mut browser = Browser::default().with_cookie("auth", &StubGateway::valid_token("u123"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(browser.has("session"));
    assert!(body_text(response).await?.contains("alice"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(gateway.lookups(), 1);
    Ok(())
}

#[tokio::test]
async fn auth_cookie_restores_without_username() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_failing_lookup());
    let app = app(AuthMode::Cookie, &gateway)?;
    let mut browser = Browser::default().with_cookie("auth", &StubGateway::valid_token("u123"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("u123"));
    Ok(())
}

#[tokio::test]
async fn tampered_cookie_is_deleted() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Cookie, &gateway)?;
    let forged = StubGateway::token_for("u123", "forged");
    let mut browser = Browser::default().with_cookie("auth", &forged);

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login"));
    let removal = auth_set_cookie(&response).unwrap_or_default();
    assert!(removal.contains("Max-Age=0"));
    assert!(!browser.has("auth"));
    assert_eq!(gateway.lookups(), 0);

    let response = browser.get(&app, "/login").await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_twice_redirects_both_times() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Cookie, &gateway)?;
    let mut browser = Browser::default();

    browser.get(&app, "/callback?payload=ok.u123").await?;
    assert!(browser.has("auth"));

    let response = browser.get(&app, "/logout").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login"));
    assert!(auth_set_cookie(&response).is_some_and(|c| c.contains("Max-Age=0")));
    assert!(!browser.has("auth"));

    let response = browser.get(&app, "/logout").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    Ok(())
}

#[tokio::test]
async fn session_mode_sign_in_flow() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Session, &gateway)?;
    let mut browser = Browser::default();

    let response = browser.get(&app, "/callback?payload=ok.u123").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/home"));
    assert!(auth_set_cookie(&response).is_none());

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("u123"));

    let response = browser.get(&app, "/logout").await?;
    assert_eq!(location(&response), Some("/login"));
    assert!(auth_set_cookie(&response).is_none());

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(gateway.lookups(), 0);
    Ok(())
}

#[tokio::test]
async fn session_mode_ignores_auth_cookie() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let app = app(AuthMode::Session, &gateway)?;
    let mut browser = Browser::default().with_cookie("auth", &StubGateway::valid_token("u123"));

    let response = browser.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(auth_set_cookie(&response).is_none());
    assert_eq!(gateway.lookups(), 0);
    Ok(())
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() -> Result<()> {
    let gateway = Arc::new(StubGateway::default());
    let app = app(AuthMode::Session, &gateway)?;
    let mut browser = Browser::default();
    browser.get(&app, "/callback?payload=ok.u123").await?;

    let mut forged = Browser::default().with_cookie("session", &ulid::Ulid::new().to_string());
    let response = forged.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    Ok(())
}

#[tokio::test]
async fn health_reports_mode() -> Result<()> {
    let app = app(AuthMode::Session, &Arc::new(StubGateway::default()))?;
    let mut browser = Browser::default();

    let response = browser.get(&app, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    assert!(set_cookies(&response).is_empty());
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["mode"], "session");

    let response = browser.request(&app, Method::OPTIONS, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    assert!(body_text(response).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn stylesheet_is_served_without_session() -> Result<()> {
    let app = app(AuthMode::Cookie, &Arc::new(StubGateway::default()))?;
    let forged = StubGateway::token_for("u123", "forged");
    let mut browser = Browser::default().with_cookie("auth", &forged);

    let response = browser.get(&app, "/static/style.css").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/css; charset=utf-8")
    );
    assert!(set_cookies(&response).is_empty());
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_leave_no_session() -> Result<()> {
    let state = app_state(AuthMode::Cookie, Arc::new(StubGateway::default()))?;
    let app = router(state.clone());

    for uri in [
        "/",
        "/login",
        "/home",
        "/logout",
        "/callback",
        "/callback?payload=denied.u123",
    ] {
        for _ in 0..10 {
            let response = Browser::default().get(&app, uri).await?;
            assert!(
                set_cookies(&response)
                    .iter()
                    .all(|cookie| !cookie.starts_with("session=")),
                "{uri}"
            );
        }
    }
    assert!(state.sessions().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn login_replaces_planted_session_id() -> Result<()> {
    for mode in [AuthMode::Session, AuthMode::Cookie] {
        let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
        let state = app_state(mode, gateway)?;
        let app = router(state.clone());

        // A live, logged-out session id handed to someone else's browser.
        let mut owner = Browser::default();
        owner.get(&app, "/callback?payload=ok.u999").await?;
        owner.get(&app, "/logout").await?;
        let planted = owner.cookies.get("session").cloned().unwrap_or_default();
        assert!(!planted.is_empty(), "{mode}");

        let mut victim = Browser::default().with_cookie("session", &planted);
        let response = victim.get(&app, "/callback?payload=ok.u123").await?;
        assert_eq!(response.status(), StatusCode::FOUND, "{mode}");
        let issued = victim.cookies.get("session").cloned();
        assert!(issued.is_some(), "{mode}");
        assert_ne!(issued.as_deref(), Some(planted.as_str()), "{mode}");

        let response = victim.get(&app, "/home").await?;
        assert_eq!(response.status(), StatusCode::OK, "{mode}");

        let mut replay = Browser::default().with_cookie("session", &planted);
        let response = replay.get(&app, "/home").await?;
        assert_eq!(response.status(), StatusCode::FOUND, "{mode}");
        assert_eq!(location(&response), Some("/login"), "{mode}");
        assert_eq!(state.sessions().len().await, 1, "{mode}");
    }
    Ok(())
}

#[tokio::test]
async fn auth_cookie_restore_issues_new_session_id() -> Result<()> {
    let gateway = Arc::new(StubGateway::default().with_user("u123", "alice"));
    let state = app_state(AuthMode::Cookie, gateway)?;
    let app = router(state.clone());

    let mut owner = Browser::default();
    owner.get(&app, "/callback?payload=ok.u999").await?;
    owner.get(&app, "/logout").await?;
    let planted = owner.cookies.get("session").cloned().unwrap_or_default();

    let mut victim = Browser::default()
        .with_cookie("session", &planted)
        .with_cookie("auth", &StubGateway::valid_token("u123"));
    let response = victim.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(
        victim.cookies.get("session").map(String::as_str),
        Some(planted.as_str())
    );

    let mut replay = Browser::default().with_cookie("session", &planted);
    let response = replay.get(&app, "/home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    Ok(())
}
