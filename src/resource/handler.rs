//! Synchronous resource-fetch path
//!
//! The renderer intercepts requests under the custom scheme and expects a
//! standard resource fetch: bytes and a MIME type, synchronously, on its
//! own resource thread. This handler performs exactly one bounded
//! thumbnail/photo resolution per call — never an enumeration.

use super::uri;
use super::{MediaResourceProvider, ResourceResponse};
use crate::error::BridgeError;
use std::sync::Arc;

/// Entry point for the renderer's resource interception.
pub struct ResourceHandler {
    provider: Arc<MediaResourceProvider>,
}

impl ResourceHandler {
    pub fn new(provider: Arc<MediaResourceProvider>) -> Self {
        Self { provider }
    }

    /// Serve one resource request, given either the canonical URI form or
    /// the path-encoded form some asset loaders deliver.
    ///
    /// Completes or fails before returning; the permission gate does not
    /// run here — the renderer only reaches this path for content the
    /// script layer already obtained identifiers for.
    pub fn handle(&self, raw: &str) -> Result<ResourceResponse, BridgeError> {
        let canonical = uri::rewrite_path_form(raw);
        let uri_str = canonical.as_deref().unwrap_or(raw);

        let request = uri::resolve(uri_str)?;
        tracing::debug!(uri = uri_str, "resource fetch");
        self.provider.open_resource(&request)
    }
}
