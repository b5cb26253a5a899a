//! Chunked library enumerator
//!
//! Streams a potentially huge library to a constrained consumer without
//! blocking the caller or materializing everything at once. Items are
//! pulled from the media index in sub-batches, accumulated into ordered
//! chunks bounded by item count and wall-clock budget, and delivered
//! sequentially over a bounded channel.

use super::{CancelToken, EnumerationOptions, LibraryChunk, LibraryEntry, LibraryMessage};
use crate::error::BridgeError;
use crate::index::MediaIndex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Sub-batch size per index pull, so a slow index still hits the
/// wall-clock flush instead of stalling on one big query.
const FETCH_STEP: u64 = 64;

/// Bounded to one in-flight chunk: the producer cannot run ahead of the
/// consumer, which keeps delivery sequential and memory flat.
const CHANNEL_CAPACITY: usize = 1;

/// Drives paginated traversal of the media index.
///
/// Each `enumerate` call owns its own cursor and counters; concurrent
/// enumerations are fully independent.
pub struct ChunkedLibraryEnumerator {
    index: Arc<dyn MediaIndex>,
}

impl ChunkedLibraryEnumerator {
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self { index }
    }

    /// Start an enumeration off the caller's execution context.
    ///
    /// Returns a cancellation handle and the channel to drain. The stream
    /// ends with exactly one terminal chunk (even for an empty library),
    /// or with a single error message after which nothing else arrives.
    pub fn enumerate(
        &self,
        options: EnumerationOptions,
    ) -> (CancelToken, mpsc::Receiver<LibraryMessage>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancelToken::new();

        let index = Arc::clone(&self.index);
        let cancel = token.clone();
        // Index pulls are blocking catalog queries; keep them off the
        // async worker threads.
        tokio::task::spawn_blocking(move || run_enumeration(index, options, cancel, tx));

        (token, rx)
    }
}

fn run_enumeration(
    index: Arc<dyn MediaIndex>,
    options: EnumerationOptions,
    cancel: CancelToken,
    tx: mpsc::Sender<LibraryMessage>,
) {
    // The target is fixed up front so an exact-multiple library ends on a
    // full terminal chunk instead of a trailing empty one.
    let target = match index.count() {
        Ok(count) => match options.max_items {
            Some(max) => count.min(max),
            None => count,
        },
        Err(err) => {
            send_error(&tx, err);
            return;
        }
    };

    let mut chunk_num: u32 = 0;
    let mut offset: u64 = 0;
    let mut total: u64 = 0;

    loop {
        let chunk_started = Instant::now();
        let mut entries: Vec<LibraryEntry> = Vec::new();
        let mut is_last = false;

        // Fill one chunk.
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(chunk_num, "enumeration cancelled");
                is_last = true;
                break;
            }
            if total + entries.len() as u64 >= target {
                is_last = true;
                break;
            }
            if entries.len() >= options.items_per_chunk {
                break;
            }

            let want = (options.items_per_chunk - entries.len()) as u64;
            let remaining = target - total - entries.len() as u64;
            let step = want.min(remaining).min(FETCH_STEP);

            let batch = match index.media_items(offset, step) {
                Ok(batch) => batch,
                Err(err) => {
                    send_error(&tx, err);
                    return;
                }
            };
            if batch.is_empty() {
                // Library shrank underneath us; end the stream cleanly.
                is_last = true;
                break;
            }
            offset += batch.len() as u64;
            let short_batch = (batch.len() as u64) < step;

            for item in batch {
                // Album join cost is paid per item as it arrives, not
                // deferred to chunk flush.
                let album_ids = if options.include_album_metadata {
                    match index.album_ids_for(&item.id) {
                        Ok(ids) => Some(ids),
                        Err(err) => {
                            send_error(&tx, err);
                            return;
                        }
                    }
                } else {
                    None
                };
                entries.push(LibraryEntry { item, album_ids });
            }

            if short_batch {
                is_last = true;
                break;
            }
            if chunk_started.elapsed() >= options.max_chunk_duration {
                // Time-based flush: smaller chunk, better responsiveness.
                break;
            }
        }

        total += entries.len() as u64;
        if total >= target {
            is_last = true;
        }

        let chunk = LibraryChunk {
            chunk_num,
            is_last_chunk: is_last,
            library: entries,
        };
        tracing::debug!(
            chunk_num,
            items = chunk.library.len(),
            is_last,
            "chunk ready"
        );
        if tx.blocking_send(LibraryMessage::Chunk(chunk)).is_err() {
            // Receiver gone; nobody left to deliver to.
            return;
        }
        if is_last {
            return;
        }
        chunk_num += 1;
    }
}

fn send_error(tx: &mpsc::Sender<LibraryMessage>, err: BridgeError) {
    let err = match err {
        err @ BridgeError::Enumeration(_) => err,
        other => BridgeError::Enumeration(other.to_string()),
    };
    let _ = tx.blocking_send(LibraryMessage::Error(err));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{AlbumInfo, MediaFile, MediaItem, SaveSource};
    use crate::permissions::MediaKind;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Deterministic in-memory index: fixed items, optional per-pull
    /// delay, optional failure injection.
    struct FakeIndex {
        items: Vec<MediaItem>,
        pull_delay: Duration,
        fail_on_pull: Option<usize>,
        pulls: Mutex<usize>,
    }

    impl FakeIndex {
        fn with_items(count: usize) -> Self {
            let items = (0..count)
                .map(|i| MediaItem {
                    id: i.to_string(),
                    kind: MediaKind::Image,
                    file_name: format!("img_{i}.jpg"),
                    mime_type: "image/jpeg".to_string(),
                    width: Some(100),
                    height: Some(100),
                    creation_date: 1_700_000_000 - i as i64,
                })
                .collect();
            Self {
                items,
                pull_delay: Duration::ZERO,
                fail_on_pull: None,
                pulls: Mutex::new(0),
            }
        }
    }

    impl MediaIndex for FakeIndex {
        fn count(&self) -> Result<u64, BridgeError> {
            Ok(self.items.len() as u64)
        }

        fn media_items(&self, offset: u64, limit: u64) -> Result<Vec<MediaItem>, BridgeError> {
            let pull = {
                let mut pulls = self.pulls.lock().unwrap();
                *pulls += 1;
                *pulls
            };
            if let Some(fail_on) = self.fail_on_pull {
                if pull >= fail_on {
                    return Err(BridgeError::Enumeration("index cursor died".to_string()));
                }
            }
            if !self.pull_delay.is_zero() {
                std::thread::sleep(self.pull_delay);
            }

            let start = (offset as usize).min(self.items.len());
            let end = (start + limit as usize).min(self.items.len());
            Ok(self.items[start..end].to_vec())
        }

        fn albums(&self) -> Result<Vec<AlbumInfo>, BridgeError> {
            Ok(Vec::new())
        }

        fn album_ids_for(&self, item_id: &str) -> Result<Vec<String>, BridgeError> {
            // Every even item sits in album "1"
            let even = item_id.parse::<u64>().map(|n| n % 2 == 0).unwrap_or(false);
            Ok(if even { vec!["1".to_string()] } else { Vec::new() })
        }

        fn original(&self, item_id: &str) -> Result<MediaFile, BridgeError> {
            Err(BridgeError::NotFound(item_id.to_string()))
        }

        fn save_image(&self, _: SaveSource, _: &str) -> Result<MediaItem, BridgeError> {
            unimplemented!("not used by enumeration tests")
        }

        fn save_video(&self, _: SaveSource, _: &str) -> Result<MediaItem, BridgeError> {
            unimplemented!("not used by enumeration tests")
        }
    }

    fn options(items_per_chunk: usize) -> EnumerationOptions {
        EnumerationOptions {
            items_per_chunk,
            max_chunk_duration: Duration::from_secs(30),
            include_album_metadata: false,
            max_items: None,
        }
    }

    async fn collect_chunks(
        mut rx: mpsc::Receiver<LibraryMessage>,
    ) -> (Vec<LibraryChunk>, Option<BridgeError>) {
        let mut chunks = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                LibraryMessage::Chunk(chunk) => chunks.push(chunk),
                LibraryMessage::Error(err) => return (chunks, Some(err)),
            }
        }
        (chunks, None)
    }

    #[tokio::test]
    async fn test_chunk_count_matches_library_size() {
        // L=5, N=2: two non-terminal chunks, terminal carries the rest
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(5)));
        let (_token, rx) = enumerator.enumerate(options(2));
        let (chunks, err) = collect_chunks(rx).await;

        assert!(err.is_none());
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().filter(|c| !c.is_last_chunk).count(),
            2 // floor((5 - 1) / 2)
        );
        assert!(chunks[2].is_last_chunk);
        assert_eq!(chunks[2].chunk_num, 2);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.library.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_on_full_terminal_chunk() {
        // L=4, N=2: no trailing empty chunk
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(4)));
        let (_token, rx) = enumerator.enumerate(options(2));
        let (chunks, _) = collect_chunks(rx).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.iter().filter(|c| !c.is_last_chunk).count(), 1);
        assert!(chunks[1].is_last_chunk);
        assert_eq!(chunks[1].library.len(), 2);
    }

    #[tokio::test]
    async fn test_chunk_numbers_increase_without_gaps() {
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(10)));
        let (_token, rx) = enumerator.enumerate(options(3));
        let (chunks, _) = collect_chunks(rx).await;

        let nums: Vec<u32> = chunks.iter().map(|c| c.chunk_num).collect();
        assert_eq!(nums, vec![0, 1, 2, 3]);
        assert_eq!(chunks.iter().filter(|c| c.is_last_chunk).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_library_emits_single_terminal_chunk() {
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(0)));
        let (_token, rx) = enumerator.enumerate(options(10));
        let (chunks, err) = collect_chunks(rx).await;

        assert!(err.is_none());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_num, 0);
        assert!(chunks[0].is_last_chunk);
        assert!(chunks[0].library.is_empty());
    }

    #[tokio::test]
    async fn test_max_items_caps_total_exactly() {
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(20)));
        let mut opts = options(3);
        opts.max_items = Some(7);
        let (_token, rx) = enumerator.enumerate(opts);
        let (chunks, _) = collect_chunks(rx).await;

        let total: usize = chunks.iter().map(|c| c.library.len()).sum();
        assert_eq!(total, 7);
        assert!(chunks.last().unwrap().is_last_chunk);
        assert_eq!(chunks.iter().filter(|c| c.is_last_chunk).count(), 1);
        // 3 + 3 + 1
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_album_metadata_joined_per_item() {
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(FakeIndex::with_items(4)));
        let mut opts = options(10);
        opts.include_album_metadata = true;
        let (_token, rx) = enumerator.enumerate(opts);
        let (chunks, _) = collect_chunks(rx).await;

        for entry in &chunks[0].library {
            let album_ids = entry.album_ids.as_ref().expect("album join requested");
            let even = entry.item.id.parse::<u64>().unwrap() % 2 == 0;
            assert_eq!(!album_ids.is_empty(), even);
        }
    }

    #[tokio::test]
    async fn test_slow_index_flushes_on_time_budget() {
        let index = FakeIndex {
            pull_delay: Duration::from_millis(25),
            ..FakeIndex::with_items(150)
        };
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(index));
        let mut opts = options(150);
        opts.max_chunk_duration = Duration::from_millis(1);
        let (_token, rx) = enumerator.enumerate(opts);
        let (chunks, _) = collect_chunks(rx).await;

        // Each pull (FETCH_STEP items) already exceeds the budget, so
        // chunks flush early instead of filling to 150.
        assert!(chunks.len() > 1);
        assert!(chunks[0].library.len() < 150);
        let total: usize = chunks.iter().map(|c| c.library.len()).sum();
        assert_eq!(total, 150);
    }

    #[tokio::test]
    async fn test_traversal_failure_surfaces_as_single_error() {
        // With 64-item pulls over 100 items the second pull is the last
        // one that happens, so it must be the one that fails.
        let index = FakeIndex {
            fail_on_pull: Some(2),
            ..FakeIndex::with_items(100)
        };
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(index));
        let (_token, rx) = enumerator.enumerate(options(64));
        let (chunks, err) = collect_chunks(rx).await;

        let err = err.expect("error must replace the next chunk");
        assert_eq!(err.kind(), "enumerationFailure");
        // Nothing after the error; no terminal chunk was emitted.
        assert!(chunks.iter().all(|c| !c.is_last_chunk));
    }

    #[tokio::test]
    async fn test_cancellation_ends_stream_with_terminal_chunk() {
        let index = FakeIndex {
            pull_delay: Duration::from_millis(10),
            ..FakeIndex::with_items(1000)
        };
        let enumerator = ChunkedLibraryEnumerator::new(Arc::new(index));
        let (token, mut rx) = enumerator.enumerate(options(64));

        let first = rx.recv().await.expect("first chunk");
        match first {
            LibraryMessage::Chunk(chunk) => assert!(!chunk.is_last_chunk),
            LibraryMessage::Error(err) => panic!("unexpected error: {err}"),
        }
        token.cancel();

        let mut saw_terminal = false;
        while let Some(message) = rx.recv().await {
            if let LibraryMessage::Chunk(chunk) = message {
                if chunk.is_last_chunk {
                    saw_terminal = true;
                }
            }
        }
        assert!(saw_terminal, "cancelled stream still ends with a terminal chunk");
    }

    #[tokio::test]
    async fn test_concurrent_enumerations_are_independent() {
        let index: Arc<dyn MediaIndex> = Arc::new(FakeIndex::with_items(9));
        let enumerator = ChunkedLibraryEnumerator::new(Arc::clone(&index));

        let (_t1, rx1) = enumerator.enumerate(options(2));
        let (_t2, rx2) = enumerator.enumerate(options(4));
        let ((a, _), (b, _)) = tokio::join!(collect_chunks(rx1), collect_chunks(rx2));

        assert_eq!(a.iter().map(|c| c.library.len()).sum::<usize>(), 9);
        assert_eq!(b.iter().map(|c| c.library.len()).sum::<usize>(), 9);
        assert_eq!(a.last().unwrap().chunk_num, 4);
        assert_eq!(b.last().unwrap().chunk_num, 2);
    }
}
