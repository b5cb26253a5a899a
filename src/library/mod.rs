//! Chunked library enumeration module
//!
//! This module handles:
//! - Enumeration options and their wire-level validation
//! - The chunk/message types streamed back to the caller
//! - Cancellation tokens for in-flight enumerations
//! - The enumerator itself (enumerator.rs)

pub mod enumerator;

pub use enumerator::ChunkedLibraryEnumerator;

use crate::error::BridgeError;
use crate::index::MediaItem;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Immutable options for one enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationOptions {
    /// Target number of items per chunk (> 0).
    pub items_per_chunk: usize,
    /// Wall-clock budget per chunk; a chunk is flushed early once
    /// exceeded, trading chunk size for responsiveness.
    pub max_chunk_duration: Duration,
    /// Join album membership onto each item record.
    pub include_album_metadata: bool,
    /// Cap on total items across all chunks; `None` means unbounded.
    pub max_items: Option<u64>,
}

/// Upper bound on the per-chunk time budget. A budget above this is a
/// malformed argument, and `Duration::from_secs_f64` panics on values
/// large enough to overflow.
const MAX_CHUNK_TIME_SEC: f64 = 3600.0;

impl EnumerationOptions {
    /// Build validated options from the wire-level arguments.
    ///
    /// A non-positive `max_items` means unbounded, matching the action
    /// surface where the parameter is optional.
    pub fn from_wire(
        items_in_chunk: i64,
        chunk_time_sec: f64,
        include_album_data: bool,
        max_items: i64,
    ) -> Result<Self, BridgeError> {
        if items_in_chunk <= 0 {
            return Err(BridgeError::InvalidParameter("itemsInChunk"));
        }
        if !chunk_time_sec.is_finite()
            || chunk_time_sec <= 0.0
            || chunk_time_sec > MAX_CHUNK_TIME_SEC
        {
            return Err(BridgeError::InvalidParameter("chunkTimeSec"));
        }

        Ok(Self {
            items_per_chunk: items_in_chunk as usize,
            max_chunk_duration: Duration::from_secs_f64(chunk_time_sec),
            include_album_metadata: include_album_data,
            max_items: (max_items > 0).then_some(max_items as u64),
        })
    }
}

/// One enumerated item, optionally joined with its album membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    #[serde(flatten)]
    pub item: MediaItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_ids: Option<Vec<String>>,
}

/// A bounded batch of enumerated items delivered as one unit.
///
/// Chunk numbers increase strictly from 0 with no gaps; exactly one chunk
/// per enumeration carries `is_last_chunk = true` and terminates the
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryChunk {
    pub chunk_num: u32,
    pub is_last_chunk: bool,
    pub library: Vec<LibraryEntry>,
}

/// Messages an enumeration emits onto its channel. After an `Error`, no
/// further messages arrive.
#[derive(Debug)]
pub enum LibraryMessage {
    Chunk(LibraryChunk),
    Error(BridgeError),
}

/// Handle for aborting an in-flight enumeration early.
///
/// Cancelling flushes the items already accumulated as a final terminal
/// chunk, so the stream still ends in its one defined end state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_options_validate_bounds() {
        assert!(matches!(
            EnumerationOptions::from_wire(0, 0.5, false, -1).unwrap_err(),
            BridgeError::InvalidParameter("itemsInChunk")
        ));
        assert!(matches!(
            EnumerationOptions::from_wire(10, 0.0, false, -1).unwrap_err(),
            BridgeError::InvalidParameter("chunkTimeSec")
        ));
    }

    #[test]
    fn test_oversized_chunk_time_is_invalid_not_a_panic() {
        // Values this large would overflow Duration construction.
        assert!(matches!(
            EnumerationOptions::from_wire(10, 1e300, false, 0).unwrap_err(),
            BridgeError::InvalidParameter("chunkTimeSec")
        ));
        assert!(matches!(
            EnumerationOptions::from_wire(10, MAX_CHUNK_TIME_SEC + 1.0, false, 0).unwrap_err(),
            BridgeError::InvalidParameter("chunkTimeSec")
        ));
        // The ceiling itself is still a usable budget.
        assert!(EnumerationOptions::from_wire(10, MAX_CHUNK_TIME_SEC, false, 0).is_ok());
    }

    #[test]
    fn test_non_positive_max_items_means_unbounded() {
        let options = EnumerationOptions::from_wire(10, 0.5, true, 0).unwrap();
        assert_eq!(options.max_items, None);
        let options = EnumerationOptions::from_wire(10, 0.5, true, -5).unwrap();
        assert_eq!(options.max_items, None);
        let options = EnumerationOptions::from_wire(10, 0.5, true, 7).unwrap();
        assert_eq!(options.max_items, Some(7));
    }

    #[test]
    fn test_cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_chunk_serializes_with_wire_field_names() {
        let chunk = LibraryChunk {
            chunk_num: 3,
            is_last_chunk: true,
            library: Vec::new(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["chunkNum"], 3);
        assert_eq!(json["isLastChunk"], true);
        assert!(json["library"].as_array().unwrap().is_empty());
    }
}
