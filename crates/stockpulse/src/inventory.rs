//! Inventory persistence seam and the events its mutations produce.
//!
//! The server only needs create/read/update/delete over items. Business
//! fields beyond `name` and `quantity` ride along opaquely in `details`.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use stockpulse_protocol::{InventoryEvent, RoomName};
use tokio::sync::Mutex;

/// Event kind sent when an item is created.
pub const ITEM_ADDED: &str = "item-added";
/// Event kind sent when an item is changed.
pub const ITEM_UPDATED: &str = "item-updated";
/// Event kind sent when an item is deleted.
pub const ITEM_REMOVED: &str = "item-removed";

/// Errors an inventory backend may report.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// The backing store could not be reached.
    #[error("inventory store unavailable: {0}")]
    Unavailable(String),
}

/// A stock-keeping record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// Client-supplied fields for creating or replacing an item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ItemDraft {
    /// Returns the reason this draft cannot be stored, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("item name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Storage backend for inventory items.
///
/// Implementations must be safe to share between request handlers.
pub trait InventoryStore: Send + Sync + 'static {
    fn list(&self) -> impl Future<Output = Result<Vec<Item>, InventoryError>> + Send;

    fn get(&self, id: u64) -> impl Future<Output = Result<Option<Item>, InventoryError>> + Send;

    fn create(&self, draft: ItemDraft) -> impl Future<Output = Result<Item, InventoryError>> + Send;

    /// Replaces an item's fields. `None` if no such item exists.
    fn update(
        &self,
        id: u64,
        draft: ItemDraft,
    ) -> impl Future<Output = Result<Option<Item>, InventoryError>> + Send;

    /// Deletes an item and returns it. `None` if no such item exists.
    fn delete(&self, id: u64) -> impl Future<Output = Result<Option<Item>, InventoryError>> + Send;
}

/// In-process inventory, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    items: BTreeMap<u64, Item>,
    next_id: u64,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for MemoryInventory {
    async fn list(&self) -> Result<Vec<Item>, InventoryError> {
        Ok(self.inner.lock().await.items.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<Item>, InventoryError> {
        Ok(self.inner.lock().await.items.get(&id).cloned())
    }

    async fn create(&self, draft: ItemDraft) -> Result<Item, InventoryError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let item = Item {
            id: inner.next_id,
            name: draft.name,
            quantity: draft.quantity,
            details: draft.details,
        };
        inner.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, id: u64, draft: ItemDraft) -> Result<Option<Item>, InventoryError> {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.items.get_mut(&id) else {
            return Ok(None);
        };
        item.name = draft.name;
        item.quantity = draft.quantity;
        item.details = draft.details;
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: u64) -> Result<Option<Item>, InventoryError> {
        Ok(self.inner.lock().await.items.remove(&id))
    }
}

/// Builds the room event describing a change to `item`.
pub fn item_event(room: &RoomName, kind: &str, item: &Item) -> InventoryEvent {
    let payload = serde_json::to_value(item).unwrap_or(serde_json::Value::Null);
    InventoryEvent::new(room.clone(), kind, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, quantity: u32) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            quantity,
            details: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryInventory::new();
        let a = store.create(draft("bolts", 10)).await.unwrap();
        let b = store.create(draft("nuts", 5)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_item_returns_none() {
        let store = MemoryInventory::new();
        assert!(store.update(9, draft("x", 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let store = MemoryInventory::new();
        let item = store.create(draft("bolts", 10)).await.unwrap();
        let updated = store.update(item.id, draft("bolts", 3)).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(store.get(item.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_item_once() {
        let store = MemoryInventory::new();
        let item = store.create(draft("bolts", 10)).await.unwrap();
        assert_eq!(store.delete(item.id).await.unwrap(), Some(item.clone()));
        assert_eq!(store.delete(item.id).await.unwrap(), None);
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(draft("   ", 1).validate().is_err());
        assert!(draft("bolts", 0).validate().is_ok());
    }

    #[test]
    fn test_item_event_carries_item_payload() {
        let item = Item {
            id: 4,
            name: "gloves".into(),
            quantity: 12,
            details: serde_json::Value::Null,
        };
        let event = item_event(&RoomName::new("inventory-updates"), ITEM_ADDED, &item);
        assert_eq!(event.kind, ITEM_ADDED);
        assert_eq!(event.room.as_str(), "inventory-updates");
        assert_eq!(event.payload["id"], 4);
        assert_eq!(event.payload["name"], "gloves");
    }
}
