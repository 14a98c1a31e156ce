//! Session-cookie extraction and the gate middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use stockpulse_session::{CredentialVerifier, GateDecision, Identity};

use super::{AppState, LOGIN_PATH};
use crate::inventory::InventoryStore;

/// The logged-in user, attached to requests that passed the gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Finds the cookie called `name` in the request's `Cookie` headers.
pub(crate) fn session_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Runs the wrapped handler only for requests with a live session.
///
/// Anything else is redirected to the login page before the handler is
/// ever called.
pub(crate) async fn require_session<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let token = session_token(request.headers(), &state.cookie.name).map(str::to_owned);

    match state.gate.check(token.as_deref()).await {
        GateDecision::Proceed(identity) => {
            request.extensions_mut().insert(CurrentUser(identity));
            next.run(request).await
        }
        GateDecision::Redirect => {
            tracing::debug!(path = %request.uri().path(), "redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(values: &[&'static str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append(header::COOKIE, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_session_token_no_cookie_header_returns_none() {
        assert_eq!(session_token(&HeaderMap::new(), "stockpulse.sid"), None);
    }

    #[test]
    fn test_session_token_finds_named_cookie_among_others() {
        let map = headers(&["theme=dark; stockpulse.sid=abc; lang=en"]);
        assert_eq!(session_token(&map, "stockpulse.sid"), Some("abc"));
    }

    #[test]
    fn test_session_token_searches_every_cookie_header() {
        let map = headers(&["theme=dark", "stockpulse.sid=xyz"]);
        assert_eq!(session_token(&map, "stockpulse.sid"), Some("xyz"));
    }

    #[test]
    fn test_session_token_empty_value_returns_none() {
        let map = headers(&["stockpulse.sid="]);
        assert_eq!(session_token(&map, "stockpulse.sid"), None);
    }

    #[test]
    fn test_session_token_prefix_name_does_not_match() {
        let map = headers(&["stockpulse.sidx=abc"]);
        assert_eq!(session_token(&map, "stockpulse.sid"), None);
    }
}
