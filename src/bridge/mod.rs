//! Message bridge module
//!
//! This module handles:
//! - The closed set of actions the script side can invoke
//! - Reply messages, including the base64 envelope for binary payloads
//! - Dispatching actions through the permission gate (dispatcher.rs)

pub mod dispatcher;

pub use dispatcher::ActionDispatcher;

use crate::error::BridgeError;
use crate::index::{AlbumInfo, MediaItem};
use crate::library::LibraryChunk;
use crate::resource::uri::{DEFAULT_HEIGHT, DEFAULT_QUALITY, DEFAULT_WIDTH};
use crate::resource::PictureData;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Every operation the script side can request, one variant per action.
///
/// Dispatch is exhaustive matching over these variants; an unknown action
/// name fails at deserialization instead of at a string comparison deep
/// in a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    GetLibrary {
        items_in_chunk: i64,
        chunk_time_sec: f64,
        include_album_data: bool,
        /// Non-positive means unbounded.
        #[serde(default)]
        max_items: i64,
    },
    GetAlbums,
    #[serde(rename_all = "camelCase")]
    GetThumbnail {
        photo_id: String,
        #[serde(default = "default_thumbnail_width")]
        thumbnail_width: i64,
        #[serde(default = "default_thumbnail_height")]
        thumbnail_height: i64,
        #[serde(default = "default_thumbnail_quality")]
        quality: f64,
    },
    #[serde(rename_all = "camelCase")]
    GetPhoto { photo_id: String },
    StopCaching,
    #[serde(rename_all = "camelCase")]
    RequestAuthorization {
        read: bool,
        write: bool,
        #[serde(default = "default_true")]
        request_images: bool,
        #[serde(default = "default_true")]
        request_videos: bool,
    },
    #[serde(rename_all = "camelCase")]
    SaveImage { url: String, album: String },
    #[serde(rename_all = "camelCase")]
    SaveVideo { url: String, album: String },
}

fn default_thumbnail_width() -> i64 {
    DEFAULT_WIDTH as i64
}

fn default_thumbnail_height() -> i64 {
    DEFAULT_HEIGHT as i64
}

fn default_thumbnail_quality() -> f64 {
    DEFAULT_QUALITY
}

fn default_true() -> bool {
    true
}

/// Binary result wrapped for the textual message transport.
///
/// The bridge cannot reliably carry raw multipart payloads, so bytes are
/// base64-encoded into a JSON envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureEnvelope {
    pub data: String,
    pub mime_type: String,
}

impl From<PictureData> for PictureEnvelope {
    fn from(picture: PictureData) -> Self {
        Self {
            data: BASE64.encode(&picture.bytes),
            mime_type: picture.mime_type,
        }
    }
}

/// Structured error payload: kind for branching, message for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// One reply on the dispatcher's channel. `GetLibrary` produces a reply
/// per chunk; every other action produces exactly one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionReply {
    Chunk(LibraryChunk),
    Albums(Vec<AlbumInfo>),
    Picture(PictureEnvelope),
    Saved(MediaItem),
    Ack { ok: bool },
    Error { error: ErrorBody },
}

impl ActionReply {
    pub fn ack() -> Self {
        Self::Ack { ok: true }
    }

    pub fn error(err: &BridgeError) -> Self {
        Self::Error {
            error: ErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }

    /// Whether the transport should keep the reply channel open after
    /// delivering this message (mirrors the non-terminal chunk case).
    pub fn keep_callback(&self) -> bool {
        matches!(self, Self::Chunk(chunk) if !chunk.is_last_chunk)
    }
}
