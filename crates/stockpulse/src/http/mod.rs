//! The HTTP side of the server: login, protected pages, and the JSON API.
//!
//! Every protected route sits behind [`gate::require_session`], which asks
//! the [`AuthGate`] about the request's session cookie and either attaches a
//! [`CurrentUser`] or redirects to [`LOGIN_PATH`] without running the
//! handler.

mod api;
mod auth;
mod error;
mod gate;
mod pages;
mod render;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Router};
use stockpulse_protocol::RoomName;
use stockpulse_room::Broadcaster;
use stockpulse_session::{AuthGate, CredentialVerifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Environment;
use crate::inventory::InventoryStore;

pub use error::AppError;
pub use gate::CurrentUser;

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/auth/login";

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline' https://fonts.googleapis.com https://cdnjs.cloudflare.com; \
     font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com; \
     img-src 'self' data: https:";

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub(crate) struct CookieSettings {
    pub(crate) name: String,
    pub(crate) secure: bool,
    pub(crate) max_age_secs: u64,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying a fresh session token.
    pub(crate) fn issue(&self, token: &str) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
            self.name, self.max_age_secs
        )
    }

    /// `Set-Cookie` value that makes the browser forget the session.
    pub(crate) fn clear(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name)
    }
}

/// State shared by every HTTP handler.
pub(crate) struct AppState<V, I> {
    pub(crate) gate: AuthGate,
    pub(crate) verifier: V,
    pub(crate) inventory: I,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) inventory_room: RoomName,
    pub(crate) cookie: CookieSettings,
    pub(crate) environment: Environment,
}

/// Builds the full router: public routes, gated pages and API, fallback,
/// and the response layers.
pub(crate) fn build_router<V, I>(state: Arc<AppState<V, I>>) -> Router
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    // `route_layer` so unknown paths still reach the 404 fallback.
    let require_session =
        middleware::from_fn_with_state(Arc::clone(&state), gate::require_session::<V, I>);
    let protected = pages::routes::<V, I>()
        .route_layer(require_session.clone())
        .nest("/api", api::routes::<V, I>().route_layer(require_session));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    auth::routes::<V, I>()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .fallback(pages::not_found)
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
