use crate::db::{KeyValueStore, StoreError};
use crate::metadata::{MetadataStore, ObjectLayout};
use crate::observer::SubscriptionToken;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage key of the rotation map
pub const ROTATIONS_KEY: &str = "image_rotations";

/// Degrees added by one rotate action
pub const ROTATION_STEP: i32 = 90;

/// Per-item display rotation in degrees. Purely a presentation transform;
/// the stored media is never touched.
pub struct RotationStore {
    inner: MetadataStore<i32, ObjectLayout>,
}

impl RotationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: MetadataStore::new(storage, ROTATIONS_KEY),
        }
    }

    /// Rotation of `key`, 0 when never rotated
    pub fn rotation(&self, key: &str) -> i32 {
        self.inner.get(key).unwrap_or(0)
    }

    pub fn all(&self) -> HashMap<String, i32> {
        self.inner.get_all()
    }

    /// Store an angle as given; no normalisation happens here
    pub fn set(&self, key: &str, angle: i32) -> Result<(), StoreError> {
        self.inner.set(key, angle)
    }

    /// Turn `key` a quarter clockwise and return the new angle
    pub fn rotate(&self, key: &str) -> Result<i32, StoreError> {
        let angle = next_angle(self.rotation(key));
        self.inner.set(key, angle)?;
        Ok(angle)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    pub fn subscribe<F>(&self, key: &str, callback: F) -> SubscriptionToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.subscribe(key, callback)
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.inner.unsubscribe(token)
    }
}

pub fn next_angle(angle: i32) -> i32 {
    (angle + ROTATION_STEP).rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionStore;

    fn store() -> RotationStore {
        RotationStore::new(Arc::new(SessionStore::new()))
    }

    #[test]
    fn test_unknown_key_defaults_to_zero() {
        assert_eq!(store().rotation("trip2024/a.jpg"), 0);
    }

    #[test]
    fn test_rotate_four_times_returns_to_start() {
        let rotations = store();
        rotations.set("trip2024/a.jpg", 180).unwrap();

        let angles: Vec<i32> = (0..4)
            .map(|_| rotations.rotate("trip2024/a.jpg").unwrap())
            .collect();

        assert_eq!(angles, vec![270, 0, 90, 180]);
        assert_eq!(rotations.rotation("trip2024/a.jpg"), 180);
    }

    #[test]
    fn test_set_accepts_any_angle() {
        let rotations = store();
        rotations.set("trip2024/a.jpg", 45).unwrap();
        assert_eq!(rotations.rotation("trip2024/a.jpg"), 45);

        rotations.set("trip2024/a.jpg", -90).unwrap();
        assert_eq!(rotations.rotate("trip2024/a.jpg").unwrap(), 0);
    }

    #[test]
    fn test_rotations_are_independent_per_key() {
        let rotations = store();
        rotations.rotate("a/1.jpg").unwrap();
        rotations.rotate("a/1.jpg").unwrap();
        rotations.rotate("a/2.jpg").unwrap();

        let all = rotations.all();
        assert_eq!(all.get("a/1.jpg"), Some(&180));
        assert_eq!(all.get("a/2.jpg"), Some(&90));
    }
}
