use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::data::{Collection, PhotoEntity, PhotoId, PhotoMetadata, PhotoSource, Preset};
use super::edit::AdjustmentSet;
use super::store::{Action, StoreState};
use crate::error::CatalogError;

/// The Library manages the SQLite catalog database.
/// It persists a snapshot of the store: photos with their adjustments,
/// collections, presets and the current photo.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open the catalog at the default location.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/photo-editor/catalog.db
    /// - macOS: ~/Library/Application Support/photo-editor/catalog.db
    /// - Windows: %APPDATA%\photo-editor\catalog.db
    pub fn new() -> Result<Self, CatalogError> {
        Self::open(&Self::default_db_path())
    }

    /// Open or create a catalog at `path`
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "catalog opened");

        let library = Library {
            conn,
            db_path: path.to_path_buf(),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// A throwaway catalog, used by tests
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Get the path where the database should be stored
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push("photo-editor");
        path.push("catalog.db");
        path
    }

    /// Create all tables if they don't exist.
    fn init_schema(&self) -> Result<(), CatalogError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS photos (
                id              TEXT PRIMARY KEY,
                position        INTEGER NOT NULL,
                name            TEXT NOT NULL,
                path            TEXT NOT NULL,
                width           INTEGER NOT NULL DEFAULT 0,
                height          INTEGER NOT NULL DEFAULT 0,
                byte_size       INTEGER NOT NULL DEFAULT 0,
                format          TEXT NOT NULL DEFAULT 'UNKNOWN',
                created_at      INTEGER,
                is_selected     INTEGER NOT NULL DEFAULT 0,
                settings_json   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS collections (
                position        INTEGER PRIMARY KEY,
                id              TEXT NOT NULL,
                name            TEXT NOT NULL,
                photo_ids_json  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS presets (
                position        INTEGER PRIMARY KEY,
                id              TEXT NOT NULL,
                name            TEXT NOT NULL,
                settings_json   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_photos_position ON photos(position);",
        )?;

        debug!("catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Get a count of photos in the catalog
    pub fn photo_count(&self) -> Result<i64, CatalogError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Replace the stored snapshot with `state` in one transaction.
    ///
    /// Photos backed by in-memory bytes have nothing to reload from and are skipped.
    pub fn save_state(&mut self, state: &StoreState) -> Result<(), CatalogError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM photos", [])?;
        tx.execute("DELETE FROM collections", [])?;
        tx.execute("DELETE FROM presets", [])?;
        tx.execute("DELETE FROM session", [])?;

        let mut skipped = 0;
        for (position, photo) in state.photos.iter().enumerate() {
            let PhotoSource::File(path) = &photo.source else {
                skipped += 1;
                continue;
            };
            tx.execute(
                "INSERT INTO photos (id, position, name, path, width, height, byte_size,
                                     format, created_at, is_selected, settings_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    photo.id.to_string(),
                    position as i64,
                    photo.name,
                    path.to_string_lossy().into_owned(),
                    photo.metadata.width,
                    photo.metadata.height,
                    photo.metadata.byte_size as i64,
                    photo.metadata.format,
                    photo.metadata.created_at.map(|t| t.timestamp()),
                    photo.is_selected,
                    photo.adjustments.to_json()?,
                ],
            )?;
        }

        for (position, collection) in state.collections.iter().enumerate() {
            let ids: Vec<String> = collection.photo_ids.iter().map(|id| id.to_string()).collect();
            tx.execute(
                "INSERT INTO collections (position, id, name, photo_ids_json) VALUES (?1, ?2, ?3, ?4)",
                params![
                    position as i64,
                    collection.id,
                    collection.name,
                    serde_json::to_string(&ids)?,
                ],
            )?;
        }

        for (position, preset) in state.presets.iter().enumerate() {
            tx.execute(
                "INSERT INTO presets (position, id, name, settings_json) VALUES (?1, ?2, ?3, ?4)",
                params![
                    position as i64,
                    preset.id,
                    preset.name,
                    preset.adjustments.to_json()?,
                ],
            )?;
        }

        if let Some(current) = state.current_photo_id {
            tx.execute(
                "INSERT INTO session (key, value) VALUES ('current_photo_id', ?1)",
                params![current.to_string()],
            )?;
        }

        tx.commit()?;

        if skipped > 0 {
            debug!(skipped, "in-memory photos not persisted");
        }
        Ok(())
    }

    /// Rewrite only the settings of `photos`. Photos without a catalog row are
    /// left alone; returns the number of rows updated.
    pub fn save_adjustments<'a>(
        &mut self,
        photos: impl IntoIterator<Item = &'a PhotoEntity>,
    ) -> Result<usize, CatalogError> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare("UPDATE photos SET settings_json = ?1 WHERE id = ?2")?;
            for photo in photos {
                updated += stmt.execute(params![photo.adjustments.to_json()?, photo.id.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Restore the stored snapshot.
    ///
    /// Rows with unreadable ids or settings are skipped with a warning;
    /// a current id that no longer matches a photo is dropped.
    pub fn load_state(&self) -> Result<StoreState, CatalogError> {
        let mut state = StoreState::default();

        let mut stmt = self.conn.prepare(
            "SELECT id, name, path, width, height, byte_size, format, created_at,
                    is_selected, settings_json
             FROM photos ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, bool>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        for row in rows {
            let (id, name, path, width, height, byte_size, format, created_at, is_selected, json) =
                row?;
            let Some(id) = PhotoId::parse(&id) else {
                warn!(%id, "skipping catalog photo with invalid id");
                continue;
            };
            let adjustments = match AdjustmentSet::from_json(&json) {
                Ok(adjustments) => adjustments,
                Err(e) => {
                    warn!(%id, error = %e, "skipping catalog photo with invalid settings");
                    continue;
                }
            };
            state.photos.push(PhotoEntity {
                id,
                name,
                source: PhotoSource::File(PathBuf::from(path)),
                metadata: PhotoMetadata {
                    width,
                    height,
                    byte_size: byte_size.max(0) as u64,
                    format,
                    created_at: created_at.and_then(|t| DateTime::from_timestamp(t, 0)),
                },
                adjustments,
                is_selected,
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, name, photo_ids_json FROM collections ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, name, json) = row?;
            let ids: Vec<String> = serde_json::from_str(&json)?;
            state.collections.push(Collection {
                id,
                name,
                photo_ids: ids.iter().filter_map(|id| PhotoId::parse(id)).collect(),
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, name, settings_json FROM presets ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, name, json) = row?;
            state.presets.push(Preset {
                id,
                name,
                adjustments: AdjustmentSet::from_json(&json)?,
            });
        }

        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM session WHERE key = 'current_photo_id'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        state.current_photo_id = current
            .as_deref()
            .and_then(PhotoId::parse)
            .filter(|id| state.photo(*id).is_some());

        info!(photos = state.photos.len(), "catalog loaded");
        Ok(state)
    }
}

/// Catalog writes owed since the last flush.
///
/// Adjustment edits touch only their photo's settings, so a burst of slider
/// moves collapses into one small update per photo. Every other action can
/// add, drop or reorder rows and needs a full snapshot.
#[derive(Debug, Default, PartialEq)]
pub struct PendingSave {
    full: bool,
    adjusted: BTreeSet<PhotoId>,
}

impl PendingSave {
    pub fn record(&mut self, action: &Action) {
        match action {
            Action::UpdateAdjustments { id, .. } | Action::ApplyPreset { id, .. } => {
                // A full snapshot already covers them
                if !self.full {
                    self.adjusted.insert(*id);
                }
            }
            _ => {
                self.full = true;
                self.adjusted.clear();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.adjusted.is_empty()
    }

    pub fn needs_full_save(&self) -> bool {
        self.full
    }

    /// Photos whose settings alone are owed
    pub fn adjusted(&self) -> impl Iterator<Item = PhotoId> + '_ {
        self.adjusted.iter().copied()
    }

    /// Write what is owed. On failure nothing is forgotten, so the next
    /// flush retries.
    pub fn flush(&mut self, library: &mut Library, state: &StoreState) -> Result<(), CatalogError> {
        if self.full {
            library.save_state(state)?;
        } else if !self.adjusted.is_empty() {
            let photos = self.adjusted.iter().filter_map(|id| state.photo(*id));
            let updated = library.save_adjustments(photos)?;
            debug!(updated, "catalog settings updated");
        }
        *self = Self::default();
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
