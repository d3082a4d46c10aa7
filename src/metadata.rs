//! Generic persisted id -> value store with change notification.
//!
//! Each store owns exactly one storage key and rewrites the whole collection
//! on every mutation. Reads never fail: a missing, unreadable or corrupt blob
//! is treated as an empty collection.

use crate::db::{KeyValueStore, StoreError};
use crate::observer::{Observer, SubscriptionToken};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

/// Records that carry their own id, for list-shaped storage
pub trait Keyed {
    fn id(&self) -> &str;
}

/// JSON shape of a persisted collection
pub trait Layout<T> {
    fn decode(raw: &str) -> serde_json::Result<Vec<(String, T)>>;
    fn encode(entries: &[(String, T)]) -> serde_json::Result<String>;
}

/// `{"id": value, ...}`
pub struct ObjectLayout;

impl<T: Serialize + DeserializeOwned> Layout<T> for ObjectLayout {
    fn decode(raw: &str) -> serde_json::Result<Vec<(String, T)>> {
        let map: BTreeMap<String, T> = serde_json::from_str(raw)?;
        Ok(map.into_iter().collect())
    }

    fn encode(entries: &[(String, T)]) -> serde_json::Result<String> {
        let map: BTreeMap<&str, &T> = entries.iter().map(|(id, v)| (id.as_str(), v)).collect();
        serde_json::to_string(&map)
    }
}

/// `[record, ...]`, ordered by insertion. Duplicate ids keep the first record.
pub struct ListLayout;

impl<T: Serialize + DeserializeOwned + Keyed> Layout<T> for ListLayout {
    fn decode(raw: &str) -> serde_json::Result<Vec<(String, T)>> {
        let records: Vec<T> = serde_json::from_str(raw)?;
        let mut seen = HashSet::new();
        Ok(records
            .into_iter()
            .filter(|record| seen.insert(record.id().to_string()))
            .map(|record| (record.id().to_string(), record))
            .collect())
    }

    fn encode(entries: &[(String, T)]) -> serde_json::Result<String> {
        let records: Vec<&T> = entries.iter().map(|(_, record)| record).collect();
        serde_json::to_string(&records)
    }
}

pub struct MetadataStore<T, L> {
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    observer: Observer,
    // Serializes read-modify-write cycles on this instance
    write_lock: Mutex<()>,
    _layout: PhantomData<fn() -> (T, L)>,
}

impl<T, L: Layout<T>> MetadataStore<T, L> {
    pub fn new(storage: Arc<dyn KeyValueStore>, storage_key: impl Into<String>) -> Self {
        Self {
            storage,
            storage_key: storage_key.into(),
            observer: Observer::new(),
            write_lock: Mutex::new(()),
            _layout: PhantomData,
        }
    }

    /// All entries in persisted order
    pub fn entries(&self) -> Vec<(String, T)> {
        let raw = match self.storage.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                log::warn!("[MetadataStore] Failed to read {}: {}", self.storage_key, err);
                return Vec::new();
            }
        };

        match L::decode(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(
                    "[MetadataStore] Ignoring corrupt value under {}: {}",
                    self.storage_key,
                    err
                );
                Vec::new()
            }
        }
    }

    pub fn get_all(&self) -> HashMap<String, T> {
        self.entries().into_iter().collect()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.entries()
            .into_iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries().iter().any(|(key, _)| key == id)
    }

    /// Insert or overwrite `id`, persist, then notify subscribers of `id`
    pub fn set(&self, id: &str, value: T) -> Result<(), StoreError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entries = self.entries();
            match entries.iter().position(|(key, _)| key == id) {
                Some(idx) => entries[idx].1 = value,
                None => entries.push((id.to_string(), value)),
            }
            self.persist(&entries)?;
        }
        self.observer.emit(id);
        Ok(())
    }

    /// Insert `id` only if absent. Returns whether it was inserted.
    pub fn insert_if_absent(&self, id: &str, value: T) -> Result<bool, StoreError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entries = self.entries();
            if entries.iter().any(|(key, _)| key == id) {
                return Ok(false);
            }
            entries.push((id.to_string(), value));
            self.persist(&entries)?;
        }
        self.observer.emit(id);
        Ok(true)
    }

    /// Delete `id`. Removing an absent id does nothing.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entries = self.entries();
            let before = entries.len();
            entries.retain(|(key, _)| key != id);
            if entries.len() == before {
                return Ok(());
            }
            self.persist(&entries)?;
        }
        self.observer.emit(id);
        Ok(())
    }

    /// Drop the whole collection in one storage write
    pub fn clear(&self) -> Result<(), StoreError> {
        let ids: Vec<String> = {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let ids = self.entries().into_iter().map(|(id, _)| id).collect();
            self.storage.remove(&self.storage_key)?;
            ids
        };
        for id in &ids {
            self.observer.emit(id);
        }
        Ok(())
    }

    pub fn subscribe<F>(&self, id: &str, callback: F) -> SubscriptionToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observer.register(id, callback)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.observer.unregister(token)
    }

    fn persist(&self, entries: &[(String, T)]) -> Result<(), StoreError> {
        let raw = L::encode(entries)?;
        self.storage.set(&self.storage_key, &raw)
    }
}
