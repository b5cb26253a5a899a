//! Action dispatcher and permission gate
//!
//! Routes actions to their handlers after checking the permission matrix.
//! Informational reads fail fast when permissions are missing; operations
//! that are allowed to prompt suspend into a pending-continuation keyed
//! by a request code, resuming when the platform reports the dialog's
//! outcome. Long-running work executes off the caller's context and
//! streams replies over the caller's channel.

use super::{Action, ActionReply};
use crate::error::BridgeError;
use crate::index::SaveSource;
use crate::library::{ChunkedLibraryEnumerator, EnumerationOptions, LibraryMessage};
use crate::permissions::{
    self, AccessMode, MediaKind, PermissionMatrix, PermissionSet, PlatformPermissions,
};
use crate::resource::uri::ThumbnailRequest;
use crate::resource::MediaResourceProvider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An action parked while the platform shows its permission dialog.
struct PendingAction {
    action: Action,
    reply_tx: mpsc::Sender<ActionReply>,
    required: PermissionSet,
}

/// Routes named operations to handlers behind the permission gate.
///
/// Explicitly constructed and dependency-injected; embedders that share
/// cached resources pass the same `Arc` handles to several dispatchers.
pub struct ActionDispatcher {
    provider: Arc<MediaResourceProvider>,
    enumerator: ChunkedLibraryEnumerator,
    matrix: PermissionMatrix,
    platform: Arc<dyn PlatformPermissions>,
    pending: Mutex<HashMap<u32, PendingAction>>,
    next_request_code: AtomicU32,
}

impl ActionDispatcher {
    pub fn new(
        provider: Arc<MediaResourceProvider>,
        platform: Arc<dyn PlatformPermissions>,
        matrix: PermissionMatrix,
    ) -> Self {
        let enumerator = ChunkedLibraryEnumerator::new(Arc::clone(provider.index()));
        Self {
            provider,
            enumerator,
            matrix,
            platform,
            pending: Mutex::new(HashMap::new()),
            next_request_code: AtomicU32::new(1),
        }
    }

    /// Dispatch one action; replies arrive on `reply_tx`.
    ///
    /// Returns immediately. `GetLibrary` produces one reply per chunk
    /// with the terminal chunk closing the exchange; everything else
    /// produces a single reply.
    pub fn dispatch(self: &Arc<Self>, action: Action, reply_tx: mpsc::Sender<ActionReply>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.gate_and_execute(action, reply_tx).await;
        });
    }

    /// Platform callback for a finished permission dialog.
    ///
    /// Grants are re-validated from the platform's cache rather than
    /// trusted from the callback, then the parked action resumes or
    /// fails.
    pub fn on_permission_result(self: &Arc<Self>, request_code: u32) {
        let Some(pending) = self.pending.lock().unwrap_or_else(|p| p.into_inner()).remove(&request_code)
        else {
            tracing::warn!(request_code, "permission result for unknown request");
            return;
        };

        let still_missing = permissions::missing(&pending.required, &*self.platform);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if !still_missing.is_empty() {
                tracing::debug!(request_code, ?still_missing, "permission request denied");
                let reply = ActionReply::error(&BridgeError::PermissionDenied(still_missing));
                let _ = pending.reply_tx.send(reply).await;
                return;
            }

            match pending.action {
                // The authorization request itself has nothing left to do
                // once the grants are in place.
                Action::RequestAuthorization { .. } => {
                    let _ = pending.reply_tx.send(ActionReply::ack()).await;
                }
                action => this.execute(action, pending.reply_tx).await,
            }
        });
    }

    async fn gate_and_execute(self: Arc<Self>, action: Action, reply_tx: mpsc::Sender<ActionReply>) {
        let required = self.matrix.required_for(&required_pairs(&action));
        let missing = permissions::missing(&required, &*self.platform);

        if missing.is_empty() {
            if let Action::RequestAuthorization { .. } = action {
                // Nothing to request; acknowledge straight away.
                let _ = reply_tx.send(ActionReply::ack()).await;
                return;
            }
            self.execute(action, reply_tx).await;
            return;
        }

        if is_informational(&action) {
            tracing::debug!(?missing, "informational action lacks permissions");
            let reply = ActionReply::error(&BridgeError::PermissionDenied(missing));
            let _ = reply_tx.send(reply).await;
            return;
        }

        // Suspension point: park the action and hand control to the
        // platform's dialog. The continuation is keyed by request code.
        let request_code = self.next_request_code.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(
                request_code,
                PendingAction {
                    action,
                    reply_tx,
                    required,
                },
            );
        tracing::debug!(request_code, ?missing, "requesting permissions");
        self.platform.request(request_code, &missing);
    }

    async fn execute(self: Arc<Self>, action: Action, reply_tx: mpsc::Sender<ActionReply>) {
        match action {
            Action::GetLibrary {
                items_in_chunk,
                chunk_time_sec,
                include_album_data,
                max_items,
            } => {
                let options = match EnumerationOptions::from_wire(
                    items_in_chunk,
                    chunk_time_sec,
                    include_album_data,
                    max_items,
                ) {
                    Ok(options) => options,
                    Err(err) => {
                        let _ = reply_tx.send(ActionReply::error(&err)).await;
                        return;
                    }
                };

                let (cancel, mut chunks) = self.enumerator.enumerate(options);
                while let Some(message) = chunks.recv().await {
                    let reply = match message {
                        LibraryMessage::Chunk(chunk) => ActionReply::Chunk(chunk),
                        LibraryMessage::Error(err) => ActionReply::error(&err),
                    };
                    if reply_tx.send(reply).await.is_err() {
                        // Caller went away; stop producing chunks.
                        cancel.cancel();
                        return;
                    }
                }
            }

            Action::GetAlbums => {
                let provider = Arc::clone(&self.provider);
                let result = tokio::task::spawn_blocking(move || provider.index().albums()).await;
                let reply = flatten_blocking(result, ActionReply::Albums);
                let _ = reply_tx.send(reply).await;
            }

            Action::GetThumbnail {
                photo_id,
                thumbnail_width,
                thumbnail_height,
                quality,
            } => {
                let request = match thumbnail_request(photo_id, thumbnail_width, thumbnail_height, quality)
                {
                    Ok(request) => request,
                    Err(err) => {
                        let _ = reply_tx.send(ActionReply::error(&err)).await;
                        return;
                    }
                };

                let provider = Arc::clone(&self.provider);
                let result =
                    tokio::task::spawn_blocking(move || provider.fetch_thumbnail(&request)).await;
                let reply = flatten_blocking(result, |picture| ActionReply::Picture(picture.into()));
                let _ = reply_tx.send(reply).await;
            }

            Action::GetPhoto { photo_id } => {
                let provider = Arc::clone(&self.provider);
                let result =
                    tokio::task::spawn_blocking(move || provider.fetch_photo(&photo_id)).await;
                let reply = flatten_blocking(result, |picture| ActionReply::Picture(picture.into()));
                let _ = reply_tx.send(reply).await;
            }

            Action::StopCaching => {
                self.provider.stop_caching();
                let _ = reply_tx.send(ActionReply::ack()).await;
            }

            Action::RequestAuthorization { .. } => {
                // Reached only with all grants in place.
                let _ = reply_tx.send(ActionReply::ack()).await;
            }

            Action::SaveImage { url, album } => {
                let provider = Arc::clone(&self.provider);
                let result = tokio::task::spawn_blocking(move || {
                    let source = SaveSource::from_url(&url)?;
                    provider.index().save_image(source, &album)
                })
                .await;
                let reply = flatten_blocking(result, ActionReply::Saved);
                let _ = reply_tx.send(reply).await;
            }

            Action::SaveVideo { url, album } => {
                let provider = Arc::clone(&self.provider);
                let result = tokio::task::spawn_blocking(move || {
                    let source = SaveSource::from_url(&url)?;
                    provider.index().save_video(source, &album)
                })
                .await;
                let reply = flatten_blocking(result, |_| ActionReply::ack());
                let _ = reply_tx.send(reply).await;
            }
        }
    }
}

/// Media kinds and access mode each action touches; the gate unions the
/// matrix's requirements over these pairs.
fn required_pairs(action: &Action) -> Vec<(MediaKind, AccessMode)> {
    match action {
        Action::GetLibrary { .. } | Action::GetAlbums => vec![
            (MediaKind::Image, AccessMode::Read),
            (MediaKind::Video, AccessMode::Read),
        ],
        Action::GetThumbnail { .. } | Action::GetPhoto { .. } => {
            vec![(MediaKind::Image, AccessMode::Read)]
        }
        Action::StopCaching => Vec::new(),
        Action::RequestAuthorization {
            read,
            write,
            request_images,
            request_videos,
        } => {
            let mut pairs = Vec::new();
            for (kind, requested) in [
                (MediaKind::Image, *request_images),
                (MediaKind::Video, *request_videos),
            ] {
                if !requested {
                    continue;
                }
                if *read {
                    pairs.push((kind, AccessMode::Read));
                }
                if *write {
                    pairs.push((kind, AccessMode::Write));
                }
            }
            pairs
        }
        Action::SaveImage { .. } => vec![(MediaKind::Image, AccessMode::Write)],
        Action::SaveVideo { .. } => vec![(MediaKind::Video, AccessMode::Write)],
    }
}

/// Read-only informational actions report missing permissions straight
/// back instead of prompting.
fn is_informational(action: &Action) -> bool {
    matches!(
        action,
        Action::GetLibrary { .. }
            | Action::GetAlbums
            | Action::GetThumbnail { .. }
            | Action::GetPhoto { .. }
    )
}

fn thumbnail_request(
    photo_id: String,
    width: i64,
    height: i64,
    quality: f64,
) -> Result<ThumbnailRequest, BridgeError> {
    // Bounds-checked before the narrowing cast; `as u32` would wrap.
    if width <= 0 || width > i64::from(u32::MAX) {
        return Err(BridgeError::InvalidParameter("thumbnailWidth"));
    }
    if height <= 0 || height > i64::from(u32::MAX) {
        return Err(BridgeError::InvalidParameter("thumbnailHeight"));
    }
    if !(0.0..=1.0).contains(&quality) {
        return Err(BridgeError::InvalidParameter("quality"));
    }
    Ok(ThumbnailRequest {
        photo_id,
        width: width as u32,
        height: height as u32,
        quality,
    })
}

/// Collapse a spawn_blocking result plus the handler result into a reply.
fn flatten_blocking<T>(
    result: Result<Result<T, BridgeError>, tokio::task::JoinError>,
    ok: impl FnOnce(T) -> ActionReply,
) -> ActionReply {
    match result {
        Ok(Ok(value)) => ok(value),
        Ok(Err(err)) => ActionReply::error(&err),
        Err(join_err) => ActionReply::error(&BridgeError::Io(std::io::Error::other(join_err))),
    }
}
