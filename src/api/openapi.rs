use utoipa::{
    openapi::{Contact, License},
    OpenApi,
};

use super::handlers::{assets, callback, health, home, login, logout, root};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::index,
        login::login,
        home::home,
        callback::callback,
        logout::logout,
        health::health,
        assets::stylesheet,
    ),
    components(schemas(health::Health)),
    tags(
        (name = "auth", description = "Sign-in through BrownieGate"),
        (name = "health", description = "Service health"),
        (name = "assets", description = "Static assets")
    )
)]
struct ApiDoc;

/// `OpenAPI` document with info taken from the Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (primary, ""),
    };

    let mut contact = Contact::new();
    contact.name = optional_str(name).map(str::to_string);
    contact.email = optional_str(email).map(str::to_string);
    (contact.name.is_some() || contact.email.is_some()).then_some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );
        let contact = doc.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Permesi"));
        assert_eq!(contact.email.as_deref(), Some("team@permesi.dev"));
        assert_eq!(
            doc.info.license.map(|license| license.name),
            Some("BSD-3-Clause".to_string())
        );
    }

    #[test]
    fn openapi_documents_routes() {
        let doc = openapi();
        for path in [
            "/",
            "/login",
            "/home",
            "/callback",
            "/logout",
            "/health",
            "/static/style.css",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
