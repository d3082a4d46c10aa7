//! User-chosen ordering of the home page folders.

use crate::db::{KeyValueStore, StoreError};
use crate::types::Folder;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Storage key of the persisted folder order
pub const FOLDER_ORDER_KEY: &str = "sortListFolder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

pub struct FolderOrderStore {
    storage: Arc<dyn KeyValueStore>,
}

impl FolderOrderStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Last persisted order, or None if the user never chose one
    pub fn order(&self) -> Option<Vec<String>> {
        let raw = match self.storage.get(FOLDER_ORDER_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("[FolderOrder] Failed to read order: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(order) => Some(order),
            Err(err) => {
                log::warn!("[FolderOrder] Ignoring corrupt order: {}", err);
                None
            }
        }
    }

    pub fn set_order(&self, names: &[String]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(names)?;
        self.storage.set(FOLDER_ORDER_KEY, &raw)
    }

    /// Forget the custom order; callers fall back to remote order
    pub fn clear_order(&self) -> Result<(), StoreError> {
        self.storage.remove(FOLDER_ORDER_KEY)
    }

    /// Apply the persisted order, if any
    pub fn apply_saved(&self, folders: Vec<Folder>) -> Vec<Folder> {
        match self.order() {
            Some(order) => apply_order(folders, &order),
            None => folders,
        }
    }

    /// Sort by label and remember the result as the custom order
    pub fn sort_by_label(
        &self,
        mut folders: Vec<Folder>,
        direction: SortDirection,
    ) -> Result<Vec<Folder>, StoreError> {
        folders.sort_by(|a, b| {
            let ord = compare_labels(a.label(), b.label());
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        self.persist(&folders)?;
        Ok(folders)
    }

    /// Drop the custom order and return folders sorted by name
    pub fn reset(&self, mut folders: Vec<Folder>) -> Result<Vec<Folder>, StoreError> {
        self.clear_order()?;
        folders.sort_by(|a, b| compare_labels(&a.name, &b.name));
        Ok(folders)
    }

    /// Move the folder at `from` to `to` (the outcome of a drag) and persist.
    /// Out-of-range indices leave the order untouched.
    pub fn move_folder(
        &self,
        mut folders: Vec<Folder>,
        from: usize,
        to: usize,
    ) -> Result<Vec<Folder>, StoreError> {
        if from >= folders.len() || to >= folders.len() {
            return Ok(folders);
        }
        let folder = folders.remove(from);
        folders.insert(to, folder);
        self.persist(&folders)?;
        Ok(folders)
    }

    fn persist(&self, folders: &[Folder]) -> Result<(), StoreError> {
        let names: Vec<String> = folders.iter().map(|f| f.name.clone()).collect();
        self.set_order(&names)
    }
}

/// Stable sort of `folders` by their position in `order`.
///
/// Folders missing from `order` go after every listed folder and keep their
/// relative input order. Names in `order` without a folder are ignored.
pub fn apply_order(mut folders: Vec<Folder>, order: &[String]) -> Vec<Folder> {
    let mut rank: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    for (idx, name) in order.iter().enumerate() {
        rank.entry(name.as_str()).or_insert(idx);
    }
    folders.sort_by_key(|folder| rank.get(folder.name.as_str()).copied().unwrap_or(usize::MAX));
    folders
}

/// Vietnamese alphabetical order. Tone marks only break ties; the letters
/// ă â đ ê ô ơ ư sort right after their base letter.
fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// (base letter, variant) per letter, with 0 for the plain letter
fn collation_key(label: &str) -> Vec<(char, u8)> {
    let mut key: Vec<(char, u8)> = Vec::with_capacity(label.len());
    for c in label.nfd().flat_map(char::to_lowercase) {
        let variant = match c {
            '\u{0306}' => 1, // breve
            '\u{0302}' => 2, // circumflex
            '\u{031B}' => 3, // horn
            'đ' => {
                key.push(('d', 1));
                continue;
            }
            c if is_combining_mark(c) => continue,
            c => {
                key.push((c, 0));
                continue;
            }
        };
        if let Some(last) = key.last_mut() {
            last.1 = variant;
        }
    }
    key
}
