pub mod cache;
pub mod carousel;
pub mod catalog;
pub mod config;
pub mod db;
pub mod favorites;
pub mod file_filter;
pub mod folder_order;
pub mod labels;
pub mod metadata;
pub mod observer;
pub mod rotation;
pub mod storage;
pub mod thumbnails;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, ListingCache};
pub use carousel::{Carousel, Viewport};
pub use catalog::{Catalog, DecoratedItem, FolderCover};
pub use config::CatalogConfig;
pub use db::{KeyValueStore, SessionStore, SqliteStore, StoreError};
pub use favorites::{FavoriteRecord, FavoritesStore};
pub use folder_order::FolderOrderStore;
pub use rotation::RotationStore;
pub use storage::{GatewayError, ObjectStore, S3Store};
pub use thumbnails::ThumbnailStore;
pub use types::{Folder, MediaItem};
