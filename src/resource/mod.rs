//! Resource resolution module
//!
//! This module handles:
//! - Parsing custom-scheme resource URIs into typed requests (uri.rs)
//! - Resolving typed requests to bytes through the index/codec (provider.rs)
//! - The synchronous resource-fetch path the renderer calls into (handler.rs)

pub mod handler;
pub mod provider;
pub mod uri;

pub use handler::ResourceHandler;
pub use provider::MediaResourceProvider;
pub use uri::{PhotoRequest, ResourceRequest, ThumbnailRequest};

use std::io::Read;

/// Binary image payload plus its MIME type.
///
/// Produced by the provider and consumed exactly once by the caller; the
/// bridge never caches these.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Body of a resolved resource: buffered for thumbnails, streamed for
/// full-resolution originals.
pub enum ResourceBody {
    Buffered(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

/// What the resource layer hands back to the renderer.
pub struct ResourceResponse {
    pub mime_type: String,
    /// Advertised length; for buffered bodies this always equals the
    /// byte count.
    pub content_length: u64,
    pub body: ResourceBody,
}

impl ResourceResponse {
    pub fn buffered(picture: PictureData) -> Self {
        Self {
            mime_type: picture.mime_type,
            content_length: picture.bytes.len() as u64,
            body: ResourceBody::Buffered(picture.bytes),
        }
    }

    pub fn streamed(stream: Box<dyn Read + Send>, mime_type: String, content_length: u64) -> Self {
        Self {
            mime_type,
            content_length,
            body: ResourceBody::Stream(stream),
        }
    }
}

impl std::fmt::Debug for ResourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResponse")
            .field("mime_type", &self.mime_type)
            .field("content_length", &self.content_length)
            .field(
                "body",
                &match &self.body {
                    ResourceBody::Buffered(bytes) => format!("Buffered({} bytes)", bytes.len()),
                    ResourceBody::Stream(_) => "Stream".to_string(),
                },
            )
            .finish()
    }
}
