//! Error taxonomy for the bridge
//!
//! Every error that crosses the bridge carries a stable kind string in
//! addition to its message, so script-side callers can branch on the kind
//! instead of parsing display text.

use crate::permissions::Permission;
use thiserror::Error;

/// All errors reported by the bridge core.
///
/// Input-validation and permission errors are detected before any work
/// begins; enumeration and resource-fetch failures after work has started
/// are delivered through the same channel the success value would have
/// used (error in place of the next chunk, or error instead of bytes).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// One or more required permissions are unavailable or were denied.
    #[error("permission denied: missing {0:?}")]
    PermissionDenied(Vec<Permission>),

    /// The resource URI names a path segment other than "thumbnail" or "photo".
    #[error("URI not supported by the photo library: {0}")]
    UnsupportedResourceKind(String),

    /// The `photoId` query parameter is absent or empty.
    #[error("missing 'photoId' query parameter")]
    MissingIdentifier,

    /// A numeric query parameter was present but not parseable or out of range.
    #[error("incorrect '{0}' query parameter")]
    InvalidParameter(&'static str),

    /// The identifier does not resolve in the media index,
    /// or thumbnail generation yielded no data.
    #[error("media item not found: {0}")]
    NotFound(String),

    /// Underlying read/write of media bytes failed.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The media index catalog failed.
    #[error("media index error: {0}")]
    Index(#[from] rusqlite::Error),

    /// Index traversal failed mid-stream.
    #[error("library enumeration failed: {0}")]
    Enumeration(String),
}

impl BridgeError {
    /// Stable kind identifier for script-side branching.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permissionDenied",
            Self::UnsupportedResourceKind(_) => "unsupportedResourceKind",
            Self::MissingIdentifier => "missingIdentifier",
            Self::InvalidParameter(_) => "invalidParameter",
            Self::NotFound(_) => "notFound",
            Self::Io(_) => "ioFailure",
            Self::Index(_) => "ioFailure",
            Self::Enumeration(_) => "enumerationFailure",
        }
    }
}
