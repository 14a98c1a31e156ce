//! Protected HTML pages and the 404 fallback.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Router};
use stockpulse_session::CredentialVerifier;

use super::render::{escape, page};
use super::{AppState, CurrentUser};
use crate::inventory::InventoryStore;

/// Inventory views that need nothing but a logged-in user.
const INVENTORY_PAGES: &[(&str, &str)] = &[
    ("/add-item", "Add item"),
    ("/inventory-list", "Inventory"),
    ("/alerts", "Alerts"),
    ("/edit-item", "Edit item"),
    ("/hazardous-materials", "Hazardous materials"),
    ("/items-available", "Items available"),
    ("/low-stock", "Low stock"),
    ("/reserved-items", "Reserved items"),
    ("/transaction-log", "Transaction log"),
];

pub(crate) fn routes<V, I>() -> Router<Arc<AppState<V, I>>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let mut router = Router::new()
        .route("/home", get(home))
        .route("/profile", get(profile))
        .route("/settings", get(settings));

    for &(path, title) in INVENTORY_PAGES {
        router = router.route(path, get(move || async move { inventory_page(title) }));
    }
    router
}

async fn home(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Html<String> {
    page(
        "Home",
        &format!(
            "<h1>Welcome, {}</h1>\n<nav>{}</nav>",
            escape(user.display_name()),
            nav_links()
        ),
    )
}

async fn profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Html<String> {
    let first_name = user.first_name.as_deref().unwrap_or("");
    page(
        "Profile",
        &format!(
            "<h1>Profile</h1>\n<dl>\n<dt>Username</dt><dd>{}</dd>\n\
             <dt>First name</dt><dd>{}</dd>\n</dl>",
            escape(&user.username),
            escape(first_name)
        ),
    )
}

async fn settings(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Html<String> {
    page(
        "Settings",
        &format!(
            "<h1>Settings</h1>\n<p>Signed in as {}.</p>\n<p><a href=\"/logout\">Log out</a></p>",
            escape(&user.username)
        ),
    )
}

fn inventory_page(title: &str) -> Html<String> {
    page(
        title,
        &format!(
            "<h1>{}</h1>\n<div id=\"app\" data-api=\"/api/items\"></div>\n<nav>{}</nav>",
            escape(title),
            nav_links()
        ),
    )
}

fn nav_links() -> String {
    INVENTORY_PAGES
        .iter()
        .map(|(path, title)| format!("<a href=\"{path}\">{title}</a>"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fallback for every unmatched path.
pub(crate) async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        page("Not found", "<h1>Page not found</h1>"),
    )
}
