use crate::db::{KeyValueStore, StoreError};
use crate::metadata::{MetadataStore, ObjectLayout};
use crate::observer::SubscriptionToken;
use crate::types::folder_of;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage key of the folder -> cover map
pub const THUMBNAILS_KEY: &str = "folderThumbnails";

/// The item chosen to represent a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRef {
    pub key: String,
}

/// At most one cover designee per folder, keyed by folder name.
/// Subscribers are notified per folder.
pub struct ThumbnailStore {
    inner: MetadataStore<ThumbnailRef, ObjectLayout>,
}

impl ThumbnailStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: MetadataStore::new(storage, THUMBNAILS_KEY),
        }
    }

    pub fn thumbnail(&self, folder: &str) -> Option<ThumbnailRef> {
        self.inner.get(folder)
    }

    pub fn all(&self) -> HashMap<String, ThumbnailRef> {
        self.inner.get_all()
    }

    /// Make `item_key` the cover of `folder`, replacing any previous one
    pub fn set_thumbnail(&self, folder: &str, item_key: &str) -> Result<(), StoreError> {
        self.inner.set(
            folder,
            ThumbnailRef {
                key: item_key.to_string(),
            },
        )
    }

    pub fn remove_thumbnail(&self, folder: &str) -> Result<(), StoreError> {
        self.inner.remove(folder)
    }

    /// Whether `item_key` is the cover of the folder it lives in
    pub fn is_thumbnail(&self, item_key: &str) -> bool {
        self.thumbnail(folder_of(item_key))
            .map(|thumb| thumb.key == item_key)
            .unwrap_or(false)
    }

    pub fn subscribe<F>(&self, folder: &str, callback: F) -> SubscriptionToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.subscribe(folder, callback)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.inner.unsubscribe(token)
    }
}
