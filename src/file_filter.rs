use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Debug, Error)]
pub enum FileFilterError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Could not determine file type")]
    UnknownType,
}

/// Image extensions the browser can display (lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif"];

/// Video extensions the browser can play (lowercase)
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// Extension of the last path segment of an object key, lowercased.
/// Directory markers (`folder/`) and names without a dot have none.
fn extension(key: &str) -> Option<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Detect media type from an object key by extension (case-insensitive)
pub fn detect_media_type(key: &str) -> Result<MediaType, FileFilterError> {
    let ext = extension(key).ok_or(FileFilterError::UnknownType)?;

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaType::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaType::Video)
    } else {
        Err(FileFilterError::UnsupportedType(ext))
    }
}

/// Check if a key names a supported media object
pub fn is_supported_media(key: &str) -> bool {
    detect_media_type(key).is_ok()
}

/// Check if a key names a still image (usable as a folder cover)
pub fn is_image(key: &str) -> bool {
    matches!(detect_media_type(key), Ok(MediaType::Image))
}
