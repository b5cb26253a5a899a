//! SQLite-backed media index
//!
//! Stores the media catalog in a small SQLite database: one row per
//! photo/video plus album membership. Originals live as plain files in a
//! library directory; the catalog only holds paths and metadata.

use super::{
    extension_for_mime, media_type_for_extension, AlbumInfo, MediaFile, MediaIndex, MediaItem,
    SaveSource,
};
use crate::error::BridgeError;
use crate::permissions::MediaKind;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use walkdir::WalkDir;

/// Result of a folder scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Media index backed by a SQLite catalog.
///
/// `rusqlite::Connection` is not Sync, so the single connection lives
/// behind a mutex; every query is short-lived.
pub struct SqliteMediaIndex {
    conn: Mutex<Connection>,
    media_dir: PathBuf,
    caching_stopped: AtomicBool,
    save_counter: AtomicU64,
}

impl SqliteMediaIndex {
    /// Open (or create) the catalog at `db_path`, storing saved originals
    /// under `media_dir`.
    pub fn open(db_path: &Path, media_dir: &Path) -> Result<Self, BridgeError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(media_dir)?;

        let conn = Connection::open(db_path)?;
        let index = Self::from_connection(conn, media_dir.to_path_buf())?;
        tracing::debug!(db = %db_path.display(), "media index opened");
        Ok(index)
    }

    /// Open the catalog in the user's data directory:
    /// - Linux: ~/.local/share/photo-bridge/
    /// - macOS: ~/Library/Application Support/photo-bridge/
    /// - Windows: %APPDATA%\photo-bridge\
    pub fn open_default() -> Result<Self, BridgeError> {
        let mut base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| std::io::Error::other("could not determine user data directory"))?;
        base.push("photo-bridge");

        let db_path = base.join("media_index.db");
        let media_dir = base.join("media");
        Self::open(&db_path, &media_dir)
    }

    /// In-memory catalog, for tests and ephemeral embedders.
    pub fn in_memory(media_dir: &Path) -> Result<Self, BridgeError> {
        std::fs::create_dir_all(media_dir)?;
        Self::from_connection(Connection::open_in_memory()?, media_dir.to_path_buf())
    }

    fn from_connection(conn: Connection, media_dir: PathBuf) -> Result<Self, BridgeError> {
        let index = Self {
            conn: Mutex::new(conn),
            media_dir,
            caching_stopped: AtomicBool::new(false),
            save_counter: AtomicU64::new(0),
        };
        index.init_schema()?;
        Ok(index)
    }

    /// Create tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<(), BridgeError> {
        let conn = self.lock_conn();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS media_items (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                kind            TEXT NOT NULL,
                path            TEXT NOT NULL UNIQUE,
                file_name       TEXT NOT NULL,
                mime_type       TEXT NOT NULL,
                width           INTEGER,
                height          INTEGER,
                creation_date   INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS albums (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS album_items (
                album_id        INTEGER NOT NULL,
                item_id         INTEGER NOT NULL,
                PRIMARY KEY (album_id, item_id),
                FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE CASCADE,
                FOREIGN KEY (item_id) REFERENCES media_items(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_items_creation_date
             ON media_items(creation_date DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_album_items_item_id
             ON album_items(item_id)",
            [],
        )?;

        Ok(())
    }

    /// Import every recognized image/video under `folder` into the
    /// catalog. Files already present (same path) are skipped.
    pub fn scan_folder(&self, folder: &Path) -> Result<ImportSummary, BridgeError> {
        let mut summary = ImportSummary::default();
        tracing::debug!(folder = %folder.display(), "scanning folder for media");

        for entry in WalkDir::new(folder)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(extension) = path.extension() else {
                continue;
            };
            let Some((kind, mime_type)) =
                media_type_for_extension(&extension.to_string_lossy())
            else {
                continue;
            };

            match self.insert_file(path, kind, mime_type) {
                Ok(true) => summary.imported += 1,
                Ok(false) => summary.skipped += 1,
                Err(err) => {
                    tracing::warn!(file = %path.display(), %err, "import failed");
                }
            }
        }

        tracing::debug!(
            imported = summary.imported,
            skipped = summary.skipped,
            "scan complete"
        );
        Ok(summary)
    }

    /// Insert one file; Ok(false) means it was already cataloged.
    fn insert_file(
        &self,
        path: &Path,
        kind: MediaKind,
        mime_type: &str,
    ) -> Result<bool, BridgeError> {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        // Pixel dimensions straight from the header; videos stay unknown.
        let (width, height) = match kind {
            MediaKind::Image => match image::image_dimensions(path) {
                Ok((w, h)) => (Some(w), Some(h)),
                Err(_) => (None, None),
            },
            MediaKind::Video => (None, None),
        };

        let creation_date = file_creation_timestamp(path);

        let conn = self.lock_conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO media_items
                (kind, path, file_name, mime_type, width, height, creation_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                kind_to_str(kind),
                path.to_string_lossy(),
                file_name,
                mime_type,
                width,
                height,
                creation_date,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Save bytes or copy a file into the library directory and catalog it.
    fn save_media(
        &self,
        kind: MediaKind,
        source: SaveSource,
        album: &str,
    ) -> Result<MediaItem, BridgeError> {
        let (stored_path, mime_type) = match source {
            SaveSource::File(source_path) => {
                let extension = source_path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default();
                let (source_kind, mime) = media_type_for_extension(&extension)
                    .ok_or(BridgeError::InvalidParameter("url"))?;
                if source_kind != kind {
                    return Err(BridgeError::InvalidParameter("url"));
                }
                let target = self.media_dir.join(self.unique_file_name(&extension));
                std::fs::copy(&source_path, &target)?;
                (target, mime.to_string())
            }
            SaveSource::Data { mime_type, bytes } => {
                let target = self
                    .media_dir
                    .join(self.unique_file_name(extension_for_mime(&mime_type)));
                std::fs::write(&target, &bytes)?;
                (target, mime_type)
            }
        };

        let file_name = stored_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let (width, height) = match kind {
            MediaKind::Image => match image::image_dimensions(&stored_path) {
                Ok((w, h)) => (Some(w), Some(h)),
                Err(_) => (None, None),
            },
            MediaKind::Video => (None, None),
        };
        let creation_date = Utc::now().timestamp();

        let item_id = {
            let conn = self.lock_conn();
            conn.execute(
                "INSERT INTO media_items
                    (kind, path, file_name, mime_type, width, height, creation_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    kind_to_str(kind),
                    stored_path.to_string_lossy(),
                    file_name,
                    mime_type,
                    width,
                    height,
                    creation_date,
                ],
            )?;
            let item_id = conn.last_insert_rowid();

            if !album.is_empty() {
                conn.execute(
                    "INSERT OR IGNORE INTO albums (title) VALUES (?1)",
                    params![album],
                )?;
                let album_id: i64 = conn.query_row(
                    "SELECT id FROM albums WHERE title = ?1",
                    params![album],
                    |row| row.get(0),
                )?;
                conn.execute(
                    "INSERT OR IGNORE INTO album_items (album_id, item_id) VALUES (?1, ?2)",
                    params![album_id, item_id],
                )?;
            }

            item_id
        };

        tracing::debug!(id = item_id, album, "saved media item");
        self.item_by_rowid(item_id)
    }

    fn item_by_rowid(&self, rowid: i64) -> Result<MediaItem, BridgeError> {
        let conn = self.lock_conn();
        conn.query_row(
            "SELECT id, kind, file_name, mime_type, width, height, creation_date
             FROM media_items WHERE id = ?1",
            params![rowid],
            item_from_row,
        )
        .optional()?
        .ok_or_else(|| BridgeError::NotFound(rowid.to_string()))
    }

    /// Unique name for a stored original, e.g. "1719318412345_0.jpg"
    fn unique_file_name(&self, extension: &str) -> String {
        let n = self.save_counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}.{}", Utc::now().timestamp_millis(), n, extension)
    }

    /// Whether a `stopCaching` signal has been received since startup.
    pub fn caching_stopped(&self) -> bool {
        self.caching_stopped.load(Ordering::Acquire)
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MediaIndex for SqliteMediaIndex {
    fn count(&self) -> Result<u64, BridgeError> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM media_items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn media_items(&self, offset: u64, limit: u64) -> Result<Vec<MediaItem>, BridgeError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, kind, file_name, mime_type, width, height, creation_date
             FROM media_items
             ORDER BY creation_date DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![limit as i64, offset as i64], item_from_row)?;

        let mut items = Vec::new();
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }

    fn albums(&self) -> Result<Vec<AlbumInfo>, BridgeError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare("SELECT id, title FROM albums ORDER BY title")?;
        let rows = stmt.query_map([], |row| {
            Ok(AlbumInfo {
                id: row.get::<_, i64>(0)?.to_string(),
                title: row.get(1)?,
            })
        })?;

        let mut albums = Vec::new();
        for album in rows {
            albums.push(album?);
        }
        Ok(albums)
    }

    fn album_ids_for(&self, item_id: &str) -> Result<Vec<String>, BridgeError> {
        let Ok(rowid) = item_id.parse::<i64>() else {
            return Ok(Vec::new());
        };

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT album_id FROM album_items WHERE item_id = ?1 ORDER BY album_id",
        )?;
        let rows = stmt.query_map(params![rowid], |row| {
            Ok(row.get::<_, i64>(0)?.to_string())
        })?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }

    fn original(&self, item_id: &str) -> Result<MediaFile, BridgeError> {
        let rowid: i64 = item_id
            .parse()
            .map_err(|_| BridgeError::NotFound(item_id.to_string()))?;

        let conn = self.lock_conn();
        conn.query_row(
            "SELECT path, mime_type FROM media_items WHERE id = ?1",
            params![rowid],
            |row| {
                Ok(MediaFile {
                    path: PathBuf::from(row.get::<_, String>(0)?),
                    mime_type: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| BridgeError::NotFound(item_id.to_string()))
    }

    fn save_image(&self, source: SaveSource, album: &str) -> Result<MediaItem, BridgeError> {
        self.save_media(MediaKind::Image, source, album)
    }

    fn save_video(&self, source: SaveSource, album: &str) -> Result<MediaItem, BridgeError> {
        self.save_media(MediaKind::Video, source, album)
    }

    fn stop_caching(&self) {
        self.caching_stopped.store(true, Ordering::Release);
    }
}

fn kind_to_str(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image",
        MediaKind::Video => "video",
    }
}

fn kind_from_str(kind: &str) -> MediaKind {
    match kind {
        "video" => MediaKind::Video,
        _ => MediaKind::Image,
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<MediaItem> {
    Ok(MediaItem {
        id: row.get::<_, i64>(0)?.to_string(),
        kind: kind_from_str(&row.get::<_, String>(1)?),
        file_name: row.get(2)?,
        mime_type: row.get(3)?,
        width: row.get(4)?,
        height: row.get(5)?,
        creation_date: row.get(6)?,
    })
}

/// File modification time as a unix timestamp, falling back to now.
fn file_creation_timestamp(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|time| chrono::DateTime::<Utc>::from(time).timestamp())
        .unwrap_or_else(|_| Utc::now().timestamp())
}
