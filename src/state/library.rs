use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::data::MetadataRecord;
use crate::error::{Error, Result};

/// Current version of the metadata schema (stored in `PRAGMA user_version`)
pub const SCHEMA_VERSION: i64 = 1;

/// Persistent store of metadata records
///
/// Writes are batched: inserts and deletes become durable on `commit`.
pub trait MetadataStore: Send {
    /// Every persisted record
    fn list_records(&mut self) -> Result<Vec<MetadataRecord>>;

    fn insert(&mut self, record: &MetadataRecord) -> Result<()>;

    fn delete(&mut self, record: &MetadataRecord) -> Result<()>;

    /// Make all pending writes durable
    fn commit(&mut self) -> Result<()>;

    /// Discard pending writes after an aborted run
    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The Library manages the SQLite metadata database.
/// It stores one flat row per asset, keyed by the catalog's asset id.
pub struct SqliteMetadataStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SqliteMetadataStore {
    /// Open or create the database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::info!("Metadata database opened at {}", path.display());

        let mut store = Self {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a throwaway database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the path where the default database should be stored
    ///
    /// - Linux: ~/.local/share/mediagrid/metadata.db
    /// - macOS: ~/Library/Application Support/mediagrid/metadata.db
    /// - Windows: %APPDATA%\mediagrid\metadata.db
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("mediagrid");
        path.push("metadata.db");
        Some(path)
    }

    /// Get the path to the database file (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create or migrate the schema.
    fn init_schema(&mut self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        for target in (version + 1)..=SCHEMA_VERSION {
            self.migrate_to(target)?;
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {target}"))?;
            tracing::debug!("Metadata schema migrated to v{}", target);
        }

        Ok(())
    }

    /// Apply the single migration step that produces schema `version`
    fn migrate_to(&self, version: i64) -> Result<()> {
        match version {
            1 => {
                self.conn.execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS media_metadata (
                        local_identifier    TEXT PRIMARY KEY NOT NULL,
                        file_size           INTEGER NOT NULL,
                        creation_date_ms    INTEGER,
                        duration            REAL NOT NULL,
                        latitude            REAL,
                        longitude           REAL
                    );
                    "#,
                )?;
                Ok(())
            }
            other => Err(Error::UnsupportedSchema {
                found: other,
                supported: SCHEMA_VERSION,
            }),
        }
    }

    /// Open a transaction unless one is already pending
    fn begin_if_needed(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Get a count of records in the database
    pub fn record_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media_metadata", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn list_records(&mut self) -> Result<Vec<MetadataRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT local_identifier, file_size, creation_date_ms, duration, latitude, longitude
             FROM media_metadata
             ORDER BY local_identifier",
        )?;

        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn insert(&mut self, record: &MetadataRecord) -> Result<()> {
        self.begin_if_needed()?;
        self.conn.execute(
            "INSERT INTO media_metadata
                (local_identifier, file_size, creation_date_ms, duration, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.file_size.min(i64::MAX as u64) as i64,
                record.capture_time.map(|t| t.timestamp_millis()),
                record.duration,
                record.latitude,
                record.longitude,
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, record: &MetadataRecord) -> Result<()> {
        self.begin_if_needed()?;
        self.conn.execute(
            "DELETE FROM media_metadata WHERE local_identifier = ?1",
            params![record.id],
        )?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
    let file_size: i64 = row.get(1)?;
    let creation_ms: Option<i64> = row.get(2)?;
    Ok(MetadataRecord {
        id: row.get(0)?,
        file_size: file_size.max(0) as u64,
        capture_time: creation_ms.and_then(DateTime::<Utc>::from_timestamp_millis),
        duration: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetadataStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
