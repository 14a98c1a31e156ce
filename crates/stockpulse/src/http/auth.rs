//! Public routes: landing page, login, signup, logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use stockpulse_session::{CredentialVerifier, SessionError};

use super::gate::session_token;
use super::{render, AppError, AppState, LOGIN_PATH};
use crate::inventory::InventoryStore;

/// Where a successful login lands.
const HOME_PATH: &str = "/home";

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

pub(crate) fn routes<V, I>() -> Router<Arc<AppState<V, I>>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    Router::new()
        .route("/", get(landing::<V, I>))
        .route("/login", get(|| async { Redirect::to(LOGIN_PATH) }))
        .route("/signup", get(|| async { Redirect::to("/auth/signup") }))
        .route(LOGIN_PATH, get(login_page).post(login::<V, I>))
        .route("/auth/signup", get(signup_page))
        .route("/logout", get(logout::<V, I>))
}

/// `GET /`: logged-in users go straight to their home page.
async fn landing<V, I>(State(state): State<Arc<AppState<V, I>>>, headers: HeaderMap) -> Response
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let token = session_token(&headers, &state.cookie.name);
    if state.gate.check(token).await.identity().is_some() {
        return Redirect::to(HOME_PATH).into_response();
    }
    render::page(
        "Welcome",
        "<h1>Stockpulse</h1>\n<p>Live inventory for your warehouse.</p>\n\
         <p><a href=\"/auth/login\">Log in</a> or <a href=\"/auth/signup\">sign up</a>.</p>",
    )
    .into_response()
}

async fn login_page() -> Html<String> {
    render::login_form(None)
}

async fn signup_page() -> Html<String> {
    render::page(
        "Sign up",
        "<h1>Sign up</h1>\n<p>Accounts are created by your administrator.</p>\n\
         <p><a href=\"/auth/login\">Back to log in</a></p>",
    )
}

/// `POST /auth/login`: verify credentials, open a session, set the cookie.
async fn login<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let identity = match state.verifier.verify(&form.username, &form.password).await {
        Ok(identity) => identity,
        Err(SessionError::AuthFailed(reason)) => {
            tracing::info!(username = %form.username, %reason, "login rejected");
            return Ok((
                StatusCode::UNAUTHORIZED,
                render::login_form(Some("Invalid username or password")),
            )
                .into_response());
        }
        Err(e) => return Err(AppError::internal(e, state.environment)),
    };

    let token = {
        let sessions = state.gate.sessions();
        let mut sessions = sessions.lock().await;
        // A fresh token on every login; the old one dies with it.
        if let Some(previous) = session_token(&headers, &state.cookie.name) {
            sessions.destroy(previous);
        }
        sessions
            .create(identity)
            .map_err(|e| AppError::internal(e, state.environment))?
    };

    tracing::info!(username = %form.username, "user logged in");
    Ok((
        [(header::SET_COOKIE, state.cookie.issue(&token))],
        Redirect::to(HOME_PATH),
    )
        .into_response())
}

/// `GET /logout`: end the session if there is one, then go home.
async fn logout<V, I>(State(state): State<Arc<AppState<V, I>>>, headers: HeaderMap) -> Response
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    if let Some(token) = session_token(&headers, &state.cookie.name) {
        let destroyed = state.gate.sessions().lock().await.destroy(token);
        tracing::debug!(destroyed, "logout");
    }
    (
        [(header::SET_COOKIE, state.cookie.clear())],
        Redirect::to("/"),
    )
        .into_response()
}
