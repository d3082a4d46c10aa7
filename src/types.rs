use serde::{Deserialize, Serialize};

/// A resolved media object. `key` is the stable identity; `url` is a signed,
/// time-limited link that expires on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub key: String,
    pub url: String,
}

impl MediaItem {
    /// Folder the item lives in (first path segment of the key)
    pub fn folder(&self) -> &str {
        folder_of(&self.key)
    }

    /// Last path segment of the key, used as a human title
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// A top-level folder of the bucket, as shown on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    pub display_name: String,
    /// Signed cover URL, empty when no cover could be resolved
    pub thumbnail_url: String,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            thumbnail_url: String::new(),
        }
    }

    /// Label used for sorting; an empty display name falls back to the name
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Split an object key on its first `/` and return the folder part.
/// Keys without a separator are their own folder.
pub fn folder_of(key: &str) -> &str {
    key.split_once('/').map(|(folder, _)| folder).unwrap_or(key)
}
