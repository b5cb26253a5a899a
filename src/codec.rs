//! Thumbnail codec
//!
//! Decoding and scaling originals into thumbnail bytes. The bridge only
//! depends on the `MediaCodec` seam; `ImageCodec` is the stock
//! implementation built on the `image` crate.

use crate::error::BridgeError;
use crate::resource::PictureData;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::Path;

/// Turns an original media file into bounded thumbnail bytes.
pub trait MediaCodec: Send + Sync {
    /// Decode `source`, scale it to fit within `width`×`height` and
    /// re-encode at `quality` (0.0–1.0).
    fn thumbnail(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        quality: f64,
    ) -> Result<PictureData, BridgeError>;
}

/// Default codec: decode with the `image` crate, Lanczos3 downscale,
/// JPEG output.
#[derive(Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl MediaCodec for ImageCodec {
    fn thumbnail(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        quality: f64,
    ) -> Result<PictureData, BridgeError> {
        let img = image::open(source)
            .map_err(|err| BridgeError::NotFound(format!("{}: {err}", source.display())))?;

        // Aspect-preserving fit; never upscales beyond the source.
        let thumbnail = img.resize(width, height, FilterType::Lanczos3);

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality));
        thumbnail
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|err| {
                BridgeError::Io(std::io::Error::other(format!("thumbnail encode failed: {err}")))
            })?;

        Ok(PictureData {
            bytes,
            mime_type: "image/jpeg".to_string(),
        })
    }
}

/// Map the bridge's 0.0–1.0 quality to the JPEG encoder's 1–100 scale.
fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
