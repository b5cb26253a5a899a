//! photo-bridge
//!
//! Media-library access for an embedded web view: a custom-scheme
//! resource path for thumbnails and originals, chunked cancellable
//! library enumeration, saving into the device library, all behind a
//! version-aware permission gate.
//!
//! The embedder wires the pieces together once at startup:
//!
//! ```no_run
//! use photo_bridge::bridge::ActionDispatcher;
//! use photo_bridge::codec::ImageCodec;
//! use photo_bridge::index::{MediaIndex, SqliteMediaIndex};
//! use photo_bridge::permissions::{PermissionMatrix, PlatformPermissions};
//! use photo_bridge::resource::{MediaResourceProvider, ResourceHandler};
//! use std::sync::Arc;
//!
//! fn wire(platform: Arc<dyn PlatformPermissions>, platform_version: u32) {
//!     let index: Arc<dyn MediaIndex> =
//!         Arc::new(SqliteMediaIndex::open_default().unwrap());
//!     let provider = Arc::new(MediaResourceProvider::new(
//!         index,
//!         Arc::new(ImageCodec::new()),
//!     ));
//!     let _handler = ResourceHandler::new(Arc::clone(&provider));
//!     let _dispatcher = Arc::new(ActionDispatcher::new(
//!         provider,
//!         platform,
//!         PermissionMatrix::new(platform_version),
//!     ));
//! }
//! ```

pub mod bridge;
pub mod codec;
pub mod error;
pub mod index;
pub mod library;
pub mod permissions;
pub mod resource;

pub use bridge::{Action, ActionDispatcher, ActionReply};
pub use error::BridgeError;
pub use library::{CancelToken, EnumerationOptions, LibraryChunk};
pub use resource::{MediaResourceProvider, ResourceHandler};
