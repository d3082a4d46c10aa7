//! Page-level controller.
//!
//! A `Catalog` is built once at startup and handed to every view by
//! reference. It owns the gateway, the listing cache and the preference
//! stores, and combines them into what the home, folder and favorites pages
//! render.

use crate::cache::ListingCache;
use crate::config::CatalogConfig;
use crate::db::{KeyValueStore, SessionStore, SqliteStore, StoreError};
use crate::favorites::{FavoriteRecord, FavoritesStore};
use crate::file_filter::is_image;
use crate::folder_order::FolderOrderStore;
use crate::labels::FolderLabels;
use crate::rotation::RotationStore;
use crate::storage::{GatewayError, ObjectStore, S3Store};
use crate::thumbnails::ThumbnailStore;
use crate::types::{folder_of, Folder, MediaItem};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Resolved cover image of a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderCover {
    pub key: String,
    pub url: String,
    pub rotation: i32,
}

/// A media item together with the user's metadata about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedItem {
    pub item: MediaItem,
    pub favorite: bool,
    pub rotation: i32,
    pub is_cover: bool,
}

pub struct Catalog {
    gateway: Arc<dyn ObjectStore>,
    bucket: String,
    url_ttl: Duration,
    listings: ListingCache,
    labels: FolderLabels,
    favorites: FavoritesStore,
    rotations: RotationStore,
    thumbnails: ThumbnailStore,
    folder_order: FolderOrderStore,
}

impl Catalog {
    /// `session` backs the listing cache; `preferences` backs every
    /// long-lived store.
    pub fn new(
        gateway: Arc<dyn ObjectStore>,
        session: Arc<dyn KeyValueStore>,
        preferences: Arc<dyn KeyValueStore>,
        bucket: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let listings = ListingCache::new(gateway.clone(), session, bucket.clone());
        Self {
            gateway,
            bucket,
            url_ttl: crate::cache::SIGNED_URL_TTL,
            listings,
            labels: FolderLabels::default(),
            favorites: FavoritesStore::new(preferences.clone()),
            rotations: RotationStore::new(preferences.clone()),
            thumbnails: ThumbnailStore::new(preferences.clone()),
            folder_order: FolderOrderStore::new(preferences),
        }
    }

    /// Wire up S3, the SQLite preferences file and labels from a config
    pub async fn from_config(config: &CatalogConfig) -> anyhow::Result<Self> {
        let gateway: Arc<dyn ObjectStore> = Arc::new(S3Store::new(config).await);
        let preferences = SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open preferences at {:?}", config.db_path))?;
        let labels = match &config.labels_path {
            Some(path) => FolderLabels::load(path)?,
            None => FolderLabels::default(),
        };

        let catalog = Self::new(
            gateway,
            Arc::new(SessionStore::new()),
            Arc::new(preferences),
            config.bucket.clone(),
        )
        .with_labels(labels)
        .with_ttls(config.cache_ttl(), config.signed_url_ttl());

        log::info!("[Catalog] Ready for bucket {}", config.bucket);
        Ok(catalog)
    }

    pub fn with_labels(mut self, labels: FolderLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_ttls(mut self, cache_ttl: Duration, url_ttl: Duration) -> Self {
        self.url_ttl = url_ttl;
        self.listings = self.listings.with_ttl(cache_ttl).with_url_ttl(url_ttl);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn listings(&self) -> &ListingCache {
        &self.listings
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn rotations(&self) -> &RotationStore {
        &self.rotations
    }

    pub fn thumbnails(&self) -> &ThumbnailStore {
        &self.thumbnails
    }

    pub fn folder_order(&self) -> &FolderOrderStore {
        &self.folder_order
    }

    /// Home page folders: labelled, with covers, in the user's order
    pub async fn folders(&self) -> Result<Vec<Folder>, GatewayError> {
        let names = self.gateway.list_folders(&self.bucket).await?;

        let mut folders = Vec::with_capacity(names.len());
        for name in names {
            let thumbnail_url = self
                .folder_cover(&name)
                .await
                .map(|cover| cover.url)
                .unwrap_or_default();
            folders.push(Folder {
                display_name: self.labels.label(&name).to_string(),
                name,
                thumbnail_url,
            });
        }

        Ok(self.folder_order.apply_saved(folders))
    }

    /// Cover of `folder`: the designated thumbnail if any, else the first
    /// image in the folder. None means the UI shows a placeholder.
    pub async fn folder_cover(&self, folder: &str) -> Option<FolderCover> {
        let key = match self.thumbnails.thumbnail(folder) {
            Some(thumb) => thumb.key,
            None => self.first_image_key(folder).await?,
        };

        match self.gateway.signed_url(&self.bucket, &key, self.url_ttl).await {
            Ok(url) => Some(FolderCover {
                rotation: self.rotations.rotation(&key),
                key,
                url,
            }),
            Err(err) => {
                log::warn!("[Catalog] No cover for {}: {}", folder, err);
                None
            }
        }
    }

    async fn first_image_key(&self, folder: &str) -> Option<String> {
        if let Some(entry) = self.listings.cached(folder) {
            return entry.data.into_iter().map(|item| item.key).find(|k| is_image(k));
        }

        let prefix = format!("{}/", folder);
        match self.gateway.list_all(&self.bucket, Some(&prefix)).await {
            Ok(keys) => keys.into_iter().find(|k| is_image(k)),
            Err(err) => {
                log::warn!("[Catalog] Failed to look up cover for {}: {}", folder, err);
                None
            }
        }
    }

    pub async fn folder_items(&self, folder: &str) -> Result<Vec<MediaItem>, GatewayError> {
        self.listings.folder_items(folder).await
    }

    pub fn display_name<'a>(&'a self, folder: &'a str) -> &'a str {
        self.labels.label(folder)
    }

    /// Attach favorite, rotation and cover state to each item
    pub fn decorate(&self, items: &[MediaItem]) -> Vec<DecoratedItem> {
        let favorites: HashSet<String> = self.favorites.list().into_iter().map(|f| f.id).collect();
        let rotations = self.rotations.all();
        let covers = self.thumbnails.all();

        items
            .iter()
            .map(|item| DecoratedItem {
                favorite: favorites.contains(&item.key),
                rotation: rotations.get(&item.key).copied().unwrap_or(0),
                is_cover: covers
                    .get(folder_of(&item.key))
                    .map(|thumb| thumb.key == item.key)
                    .unwrap_or(false),
                item: item.clone(),
            })
            .collect()
    }

    /// Flip the favorite state of `item`; returns the new state
    pub fn toggle_favorite(&self, item: &MediaItem) -> Result<bool, StoreError> {
        if self.favorites.is_favorite(&item.key) {
            self.favorites.remove(&item.key)?;
            Ok(false)
        } else {
            self.favorites.add(FavoriteRecord::from_item(item))?;
            Ok(true)
        }
    }

    /// Rotate `key` a quarter turn; returns the new angle
    pub fn rotate(&self, key: &str) -> Result<i32, StoreError> {
        self.rotations.rotate(key)
    }

    /// Make `item` its folder's cover, or unset it if it already is.
    /// Returns whether the item is the cover afterwards.
    pub fn toggle_cover(&self, item: &MediaItem) -> Result<bool, StoreError> {
        let folder = folder_of(&item.key);
        if self.thumbnails.is_thumbnail(&item.key) {
            self.thumbnails.remove_thumbnail(folder)?;
            Ok(false)
        } else {
            self.thumbnails.set_thumbnail(folder, &item.key)?;
            Ok(true)
        }
    }

    /// Favorites page contents, using the URLs captured when favorited
    pub fn favorites_as_items(&self) -> Vec<MediaItem> {
        self.favorites.list().iter().map(FavoriteRecord::to_item).collect()
    }
}
