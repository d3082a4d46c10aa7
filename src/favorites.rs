use crate::db::{KeyValueStore, StoreError};
use crate::metadata::{Keyed, ListLayout, MetadataStore};
use crate::observer::SubscriptionToken;
use crate::types::MediaItem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage key of the favorites list
pub const FAVORITES_KEY: &str = "favorite_photos";

/// A favorited media item. `id` is the item's object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub created_at: String,
}

impl FavoriteRecord {
    /// Snapshot an item as a favorite, titled by its file name
    pub fn from_item(item: &MediaItem) -> Self {
        Self {
            id: item.key.clone(),
            url: item.url.clone(),
            title: item.file_name().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn to_item(&self) -> MediaItem {
        MediaItem {
            key: self.id.clone(),
            url: self.url.clone(),
        }
    }
}

impl Keyed for FavoriteRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Favorited items, persisted as one JSON list in insertion order
pub struct FavoritesStore {
    inner: MetadataStore<FavoriteRecord, ListLayout>,
}

impl FavoritesStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: MetadataStore::new(storage, FAVORITES_KEY),
        }
    }

    pub fn list(&self) -> Vec<FavoriteRecord> {
        self.inner
            .entries()
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<FavoriteRecord> {
        self.inner.get(id)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    /// Add a favorite. A record whose id is already present is ignored.
    /// Returns whether the record was added.
    pub fn add(&self, record: FavoriteRecord) -> Result<bool, StoreError> {
        let id = record.id.clone();
        let added = self.inner.insert_if_absent(&id, record)?;
        if added {
            log::debug!("[Favorites] Added {}", id);
        }
        Ok(added)
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.inner.remove(id)
    }

    /// Wipe every favorite at once
    pub fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear()?;
        log::info!("[Favorites] Cleared all favorites");
        Ok(())
    }

    pub fn subscribe<F>(&self, id: &str, callback: F) -> SubscriptionToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.subscribe(id, callback)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.inner.unsubscribe(token)
    }
}
