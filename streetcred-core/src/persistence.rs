//! Snapshot persistence for the memory store.
//!
//! The store keeps a single durable slot holding a JSON snapshot of every
//! NPC ledger:
//!
//! ```json
//! { "records": { "<npc_id>": { ...NpcMemory... } }, "saved_at": "<rfc3339>", "version": 1 }
//! ```
//!
//! A [`SnapshotSlot`] only moves bytes; encoding and version checks live in
//! [`encode_snapshot`] / [`decode_snapshot`]. Three slots ship:
//!
//! - [`SqliteSlot`]: one row per slot key, WAL mode, optional CRC-32
//!   checksum, online backup.
//! - [`JsonFileSlot`]: one file, written through a temp file and renamed.
//! - [`InMemorySlot`]: shared buffer for tests and throwaway sessions.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS snapshot_slots (
//!     slot_key   TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BackendKind, PersistenceConfig};
use crate::error::{Result, StoreError};
use crate::memory::NpcMemory;
use crate::types::{NpcId, Timestamp};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Snapshot encoding
// ---------------------------------------------------------------------------

/// A decoded whole-store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreSnapshot {
    /// Every NPC ledger, by id.
    pub records: BTreeMap<NpcId, NpcMemory>,
    /// When the snapshot was written.
    pub saved_at: Timestamp,
    /// Snapshot format version.
    pub version: u32,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    records: &'a BTreeMap<NpcId, NpcMemory>,
    saved_at: Timestamp,
    version: u32,
}

/// Encode the store's records as snapshot JSON.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if JSON encoding fails.
pub fn encode_snapshot(
    records: &BTreeMap<NpcId, NpcMemory>,
    saved_at: Timestamp,
) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        records,
        saved_at,
        version: SNAPSHOT_VERSION,
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

/// Decode snapshot JSON, rejecting versions newer than [`SNAPSHOT_VERSION`].
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] on malformed JSON and
/// [`StoreError::UnsupportedVersion`] on snapshots from a newer build.
pub fn decode_snapshot(bytes: &[u8]) -> Result<StoreSnapshot> {
    let snapshot: StoreSnapshot = serde_json::from_slice(bytes)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: snapshot.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Slot contract
// ---------------------------------------------------------------------------

/// A single durable slot holding the latest snapshot bytes.
pub trait SnapshotSlot: Send {
    /// Read the last written snapshot, `None` if nothing was ever written.
    ///
    /// # Errors
    ///
    /// Backend-specific I/O or database failures.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Overwrite the slot with `bytes`, a snapshot taken at `saved_at`.
    ///
    /// Backends that keep their own write stamp use `saved_at` so it agrees
    /// with the snapshot body.
    ///
    /// # Errors
    ///
    /// Backend-specific I/O or database failures.
    fn write(&self, bytes: &[u8], saved_at: Timestamp) -> Result<()>;

    /// Remove whatever the slot holds.
    ///
    /// # Errors
    ///
    /// Backend-specific I/O or database failures.
    fn erase(&self) -> Result<()>;

    /// Short backend name for logs.
    fn describe(&self) -> String;
}

/// Build the slot selected by `config`.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the `SQLite` file cannot be opened.
pub fn open_slot(config: &PersistenceConfig) -> Result<Box<dyn SnapshotSlot>> {
    let slot: Box<dyn SnapshotSlot> = match config.backend {
        BackendKind::Sqlite => Box::new(SqliteSlot::open(&config.path, config)?),
        BackendKind::Json => Box::new(JsonFileSlot::new(&config.path)),
        BackendKind::Memory => Box::new(InMemorySlot::new()),
    };
    Ok(slot)
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 (ISO 3309) of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteSlot
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS snapshot_slots (
    slot_key   TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

const SELECT_DATA: &str = "SELECT data, checksum FROM snapshot_slots WHERE slot_key = ?1";
const SELECT_STAMP: &str = "SELECT updated_at FROM snapshot_slots WHERE slot_key = ?1";

/// Snapshot slot stored as one row of an `SQLite` table.
pub struct SqliteSlot {
    conn: Connection,
    slot_key: String,
    checksum_enabled: bool,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSlot")
            .field("db_path", &self.db_path)
            .field("slot_key", &self.slot_key)
            .finish_non_exhaustive()
    }
}

impl SqliteSlot {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            slot = %config.slot_key,
            wal = config.wal_mode,
            "Snapshot slot opened"
        );

        Ok(Self {
            conn,
            slot_key: config.slot_key.clone(),
            checksum_enabled: config.checksum_enabled,
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            slot_key: config.slot_key.clone(),
            checksum_enabled: config.checksum_enabled,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Copy the database to `dest_path` using the `SQLite` online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Snapshot database backup completed"
        );
        Ok(())
    }

    /// Run the `SQLite` integrity check. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Path to the database file (`:memory:` for in-memory databases).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// When the slot was last written, `None` if it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures and
    /// [`StoreError::Serialization`] if the stored stamp is not RFC 3339.
    pub fn updated_at(&self) -> Result<Option<Timestamp>> {
        let mut stmt = self.conn.prepare_cached(SELECT_STAMP)?;
        let stamp: Option<String> = stmt
            .query_row(params![self.slot_key], |row| row.get(0))
            .optional()?;
        stamp
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .transpose()
    }
}

impl SnapshotSlot for SqliteSlot {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached(SELECT_DATA)?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![self.slot_key], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if let Some(expected) = stored_checksum.filter(|_| self.checksum_enabled) {
            let actual = crc32_hex(&data);
            if expected != actual {
                warn!(
                    slot = %self.slot_key,
                    expected = %expected,
                    actual = %actual,
                    "Checksum mismatch: possible save corruption"
                );
            }
        }
        Ok(Some(data))
    }

    fn write(&self, bytes: &[u8], saved_at: Timestamp) -> Result<()> {
        let checksum = self.checksum_enabled.then(|| crc32_hex(bytes));
        let updated_at = saved_at.to_rfc3339();
        self.conn.execute(
            "INSERT INTO snapshot_slots (slot_key, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slot_key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![self.slot_key, bytes, updated_at, checksum],
        )?;
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM snapshot_slots WHERE slot_key = ?1",
            params![self.slot_key],
        )?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}#{}", self.db_path.display(), self.slot_key)
    }
}

/// Extension trait that adds an `.optional()` combinator to `rusqlite::Result`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// JsonFileSlot
// ---------------------------------------------------------------------------

/// Snapshot slot stored as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSlot {
    path: PathBuf,
}

impl JsonFileSlot {
    /// Slot backed by the file at `path`. Nothing is touched until the first write.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotSlot for JsonFileSlot {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8], _saved_at: Timestamp) -> Result<()> {
        let parent = self.path.parent();
        if let Some(parent) = parent.filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// InMemorySlot
// ---------------------------------------------------------------------------

/// Snapshot slot held in memory. Clones share the same buffer, so a test can
/// keep one handle and give another to a store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySlot {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemorySlot {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-loaded with `bytes`.
    #[must_use]
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Some(bytes))),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }
}

impl SnapshotSlot for InMemorySlot {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8], _saved_at: Timestamp) -> Result<()> {
        *self.data.lock() = Some(bytes.to_vec());
        debug!(bytes = bytes.len(), "In-memory snapshot written");
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        *self.data.lock() = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
