//! JSON API over the inventory.
//!
//! Each successful create, update, or delete is announced to the inventory
//! room exactly once, after the store accepted the change.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use stockpulse_session::{CredentialVerifier, Identity};

use super::{AppError, AppState, CurrentUser};
use crate::inventory::{
    item_event, InventoryStore, Item, ItemDraft, ITEM_ADDED, ITEM_REMOVED, ITEM_UPDATED,
};

type ApiResult<T> = Result<T, AppError>;

pub(crate) fn routes<V, I>() -> Router<Arc<AppState<V, I>>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    Router::new()
        .route("/items", get(list_items::<V, I>).post(create_item::<V, I>))
        .route(
            "/items/:id",
            get(get_item::<V, I>)
                .put(update_item::<V, I>)
                .delete(delete_item::<V, I>),
        )
        .route("/me", get(me))
}

/// GET /api/items
async fn list_items<V, I>(State(state): State<Arc<AppState<V, I>>>) -> ApiResult<Json<Vec<Item>>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let items = state
        .inventory
        .list()
        .await
        .map_err(|e| AppError::internal(e, state.environment))?;
    Ok(Json(items))
}

/// GET /api/items/:id
async fn get_item<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Item>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    state
        .inventory
        .get(id)
        .await
        .map_err(|e| AppError::internal(e, state.environment))?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/items
async fn create_item<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<(StatusCode, Json<Item>)>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    draft.validate().map_err(AppError::BadRequest)?;
    let item = state
        .inventory
        .create(draft)
        .await
        .map_err(|e| AppError::internal(e, state.environment))?;

    tracing::info!(id = item.id, username = %user.username, "item added");
    announce(&state, ITEM_ADDED, &item).await;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/items/:id
async fn update_item<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<Json<Item>>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    draft.validate().map_err(AppError::BadRequest)?;
    let item = state
        .inventory
        .update(id, draft)
        .await
        .map_err(|e| AppError::internal(e, state.environment))?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(id, username = %user.username, "item updated");
    announce(&state, ITEM_UPDATED, &item).await;
    Ok(Json(item))
}

/// DELETE /api/items/:id
async fn delete_item<V, I>(
    State(state): State<Arc<AppState<V, I>>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode>
where
    V: CredentialVerifier,
    I: InventoryStore,
{
    let item = state
        .inventory
        .delete(id)
        .await
        .map_err(|e| AppError::internal(e, state.environment))?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(id, username = %user.username, "item removed");
    announce(&state, ITEM_REMOVED, &item).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/me
async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<Identity> {
    Json(user)
}

async fn announce<V, I>(state: &AppState<V, I>, kind: &str, item: &Item) {
    let event = item_event(&state.inventory_room, kind, item);
    state.broadcaster.broadcast(&state.inventory_room, event).await;
}

fn not_found(id: u64) -> AppError {
    AppError::NotFound(format!("item {id} not found"))
}
