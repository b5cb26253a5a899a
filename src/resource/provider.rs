//! Media resource provider
//!
//! Resolves typed resource requests to bytes through the media index and
//! codec collaborators. Used by both the synchronous resource handler and
//! the action dispatcher; constructed once and shared by handle.

use super::uri::{ResourceRequest, ThumbnailRequest};
use super::{PictureData, ResourceResponse};
use crate::codec::MediaCodec;
use crate::error::BridgeError;
use crate::index::MediaIndex;
use std::io::Read;
use std::sync::Arc;

/// Resolves thumbnail and photo requests against the index and codec.
pub struct MediaResourceProvider {
    index: Arc<dyn MediaIndex>,
    codec: Arc<dyn MediaCodec>,
}

impl MediaResourceProvider {
    pub fn new(index: Arc<dyn MediaIndex>, codec: Arc<dyn MediaCodec>) -> Self {
        Self { index, codec }
    }

    pub fn index(&self) -> &Arc<dyn MediaIndex> {
        &self.index
    }

    /// Generate thumbnail bytes for one library item.
    pub fn fetch_thumbnail(&self, request: &ThumbnailRequest) -> Result<PictureData, BridgeError> {
        let file = self.index.original(&request.photo_id)?;
        let picture = self.codec.thumbnail(
            &file.path,
            request.width,
            request.height,
            request.quality,
        )?;

        if picture.bytes.is_empty() {
            return Err(BridgeError::NotFound(format!(
                "could not create thumbnail for {}",
                request.photo_id
            )));
        }

        tracing::debug!(
            photo_id = %request.photo_id,
            bytes = picture.bytes.len(),
            "thumbnail resolved"
        );
        Ok(picture)
    }

    /// Full original, buffered. Thumbnails and bridge replies are small
    /// enough to hold in memory; see `fetch_photo_stream` for the
    /// unbuffered path.
    pub fn fetch_photo(&self, photo_id: &str) -> Result<PictureData, BridgeError> {
        let file = self.index.original(photo_id)?;
        let bytes = std::fs::read(&file.path)?;
        Ok(PictureData {
            bytes,
            mime_type: file.mime_type,
        })
    }

    /// Full original as an unbuffered stream, for serving large files
    /// without materializing them.
    pub fn fetch_photo_stream(
        &self,
        photo_id: &str,
    ) -> Result<(Box<dyn Read + Send>, String, u64), BridgeError> {
        let file = self.index.original(photo_id)?;
        let (stream, len) = file.open()?;
        Ok((stream, file.mime_type, len))
    }

    /// Serve one typed request on the resource-fetch path: thumbnails
    /// buffered, photos streamed.
    pub fn open_resource(&self, request: &ResourceRequest) -> Result<ResourceResponse, BridgeError> {
        match request {
            ResourceRequest::Thumbnail(thumb) => {
                Ok(ResourceResponse::buffered(self.fetch_thumbnail(thumb)?))
            }
            ResourceRequest::Photo(photo) => {
                let (stream, mime_type, len) = self.fetch_photo_stream(&photo.photo_id)?;
                Ok(ResourceResponse::streamed(stream, mime_type, len))
            }
        }
    }

    /// Signal the index to abandon queued caching work. Safe with no
    /// outstanding work; never blocks.
    pub fn stop_caching(&self) {
        self.index.stop_caching();
    }
}
