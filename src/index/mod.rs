//! Media index module
//!
//! This module handles:
//! - The row types the index produces (MediaItem, AlbumInfo, MediaFile)
//! - The MediaIndex seam the bridge resolves against (trait below)
//! - The SQLite-backed catalog implementation (sqlite.rs)
//! - Save sources: plain paths, file:// URLs and base64 data: URLs

pub mod sqlite;

pub use sqlite::SqliteMediaIndex;

use crate::error::BridgeError;
use crate::permissions::MediaKind;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;

/// A single item in the media library, as enumerated by the index.
///
/// The identifier is an opaque string, unique and stable for the device
/// session. Rows are produced by the index and read-only to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Opaque unique identifier
    pub id: String,
    /// Whether this is an image or a video
    pub kind: MediaKind,
    /// Filename only (e.g., "IMG_0001.jpg")
    pub file_name: String,
    /// MIME type of the original bytes
    pub mime_type: String,
    /// Pixel width, when known
    pub width: Option<u32>,
    /// Pixel height, when known
    pub height: Option<u32>,
    /// Creation time as a unix timestamp (seconds)
    pub creation_date: i64,
}

/// An album known to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    pub id: String,
    pub title: String,
}

/// Location and type of an original media file, for streaming reads.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime_type: String,
}

impl MediaFile {
    /// Open the original for unbuffered reading.
    pub fn open(&self) -> Result<(Box<dyn Read + Send>, u64), BridgeError> {
        let file = std::fs::File::open(&self.path)?;
        let len = file.metadata()?.len();
        Ok((Box::new(file), len))
    }
}

/// The media index collaborator: enumerates device photos/videos and
/// albums and stores new media. Treated as opaque rows by the bridge.
pub trait MediaIndex: Send + Sync {
    /// Total number of items in the library.
    fn count(&self) -> Result<u64, BridgeError>;

    /// One page of items, newest first, stable order across pages.
    fn media_items(&self, offset: u64, limit: u64) -> Result<Vec<MediaItem>, BridgeError>;

    /// All albums.
    fn albums(&self) -> Result<Vec<AlbumInfo>, BridgeError>;

    /// Album ids the given item belongs to.
    fn album_ids_for(&self, item_id: &str) -> Result<Vec<String>, BridgeError>;

    /// Resolve an identifier to the original file on disk.
    fn original(&self, item_id: &str) -> Result<MediaFile, BridgeError>;

    /// Store a new image in the library under the given album.
    fn save_image(&self, source: SaveSource, album: &str) -> Result<MediaItem, BridgeError>;

    /// Store a new video in the library under the given album.
    fn save_video(&self, source: SaveSource, album: &str) -> Result<MediaItem, BridgeError>;

    /// Abandon any in-flight or queued caching work. Must be safe to call
    /// with no outstanding work and must not block.
    fn stop_caching(&self) {}
}

/// Where the bytes of a save operation come from.
#[derive(Debug, Clone)]
pub enum SaveSource {
    /// A file on disk (plain path or file:// URL).
    File(PathBuf),
    /// Inline bytes from a data: URL.
    Data { mime_type: String, bytes: Vec<u8> },
}

impl SaveSource {
    /// Parse the `url` argument of a save action.
    ///
    /// Accepts `data:<mime>;base64,<payload>`, `file://` URLs and plain
    /// filesystem paths. Network fetch is the embedder's responsibility.
    pub fn from_url(url: &str) -> Result<SaveSource, BridgeError> {
        if let Some(rest) = url.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or(BridgeError::InvalidParameter("url"))?;
            let mime_type = header
                .strip_suffix(";base64")
                .ok_or(BridgeError::InvalidParameter("url"))?;
            let bytes = BASE64
                .decode(payload)
                .map_err(|_| BridgeError::InvalidParameter("url"))?;
            return Ok(SaveSource::Data {
                mime_type: mime_type.to_string(),
                bytes,
            });
        }

        if let Some(path) = url.strip_prefix("file://") {
            return Ok(SaveSource::File(PathBuf::from(path)));
        }

        Ok(SaveSource::File(PathBuf::from(url)))
    }
}

/// Image file extensions the index recognizes
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("heic", "image/heic"),
];

/// Video file extensions the index recognizes
const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("3gp", "video/3gpp"),
];

/// Classify a file extension as media, returning its kind and MIME type.
pub fn media_type_for_extension(extension: &str) -> Option<(MediaKind, &'static str)> {
    let lower = extension.to_lowercase();
    if let Some(&(_, mime)) = IMAGE_EXTENSIONS.iter().find(|(ext, _)| *ext == lower) {
        return Some((MediaKind::Image, mime));
    }
    if let Some(&(_, mime)) = VIDEO_EXTENSIONS.iter().find(|(ext, _)| *ext == lower) {
        return Some((MediaKind::Video, mime));
    }
    None
}

/// Preferred file extension for a MIME type, used when saving data: URLs.
pub(crate) fn extension_for_mime(mime_type: &str) -> &'static str {
    IMAGE_EXTENSIONS
        .iter()
        .chain(VIDEO_EXTENSIONS.iter())
        .find(|(_, m)| *m == mime_type)
        .map(|&(ext, _)| ext)
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_classification() {
        assert_eq!(
            media_type_for_extension("JPG"),
            Some((MediaKind::Image, "image/jpeg"))
        );
        assert_eq!(
            media_type_for_extension("mov"),
            Some((MediaKind::Video, "video/quicktime"))
        );
        assert_eq!(media_type_for_extension("txt"), None);
    }

    #[test]
    fn test_save_source_from_data_url() {
        let source = SaveSource::from_url("data:image/png;base64,aGVsbG8=").unwrap();
        match source {
            SaveSource::Data { mime_type, bytes } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(bytes, b"hello");
            }
            other => panic!("expected data source, got {:?}", other),
        }
    }

    #[test]
    fn test_save_source_rejects_malformed_data_url() {
        assert!(SaveSource::from_url("data:image/png;base64").is_err());
        assert!(SaveSource::from_url("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_save_source_from_file_url_and_plain_path() {
        match SaveSource::from_url("file:///tmp/a.jpg").unwrap() {
            SaveSource::File(path) => assert_eq!(path, PathBuf::from("/tmp/a.jpg")),
            other => panic!("expected file source, got {:?}", other),
        }
        match SaveSource::from_url("/tmp/b.jpg").unwrap() {
            SaveSource::File(path) => assert_eq!(path, PathBuf::from("/tmp/b.jpg")),
            other => panic!("expected file source, got {:?}", other),
        }
    }
}
