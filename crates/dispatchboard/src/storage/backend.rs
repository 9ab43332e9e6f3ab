//! Key-value backends underneath the record store.
//!
//! The store persists each of its records under a fixed named [`Slot`]. A
//! [`SlotBackend`] only moves opaque strings in and out of those slots;
//! encoding and defaults are the store's business.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{migrations, schema};

/// A named slot of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// All incidents, in insertion order.
    Incidents,
    /// Message history, newest first.
    Messages,
    /// The session user, absent when signed out.
    User,
    /// User preferences.
    UserSettings,
    /// Set once the example data has been seeded.
    Initialized,
}

impl Slot {
    /// Every slot.
    pub const ALL: [Self; 5] = [
        Self::Incidents,
        Self::Messages,
        Self::User,
        Self::UserSettings,
        Self::Initialized,
    ];

    /// The persisted key of this slot.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::Messages => "messages",
            Self::User => "user",
            Self::UserSettings => "userSettings",
            Self::Initialized => "emergency-system-initialized",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Storage medium for slot values.
pub trait SlotBackend: std::fmt::Debug {
    /// Read the raw value of a slot, `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn read(&self, slot: Slot) -> Result<Option<String>>;

    /// Overwrite the value of a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn write(&mut self, slot: Slot, value: &str) -> Result<()>;

    /// Remove a slot. Removing an unset slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn remove(&mut self, slot: Slot) -> Result<()>;

    /// Write several slots at once. Either every entry is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written; nothing has changed
    /// in that case.
    fn write_batch(&mut self, entries: &[(Slot, String)]) -> Result<()>;

    /// Remove every slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn clear(&mut self) -> Result<()>;

    /// Bytes occupied by the medium, 0 when not applicable.
    fn size_bytes(&self) -> u64 {
        0
    }
}

/// `SQLite`-backed slot storage, one row per slot.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create a slot database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_in_memory(&self) -> bool {
        self.path.to_string_lossy() == ":memory:"
    }
}

impl SlotBackend for SqliteBackend {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                [slot.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<()> {
        self.conn.execute(
            schema::UPSERT_SLOT,
            params![slot.key(), value, Utc::now().to_rfc3339()],
        )?;
        debug!("Wrote {} bytes to slot {}", value.len(), slot);
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1", [slot.key()])?;
        Ok(())
    }

    fn write_batch(&mut self, entries: &[(Slot, String)]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (slot, value) in entries {
            tx.execute(schema::UPSERT_SLOT, params![slot.key(), value, now])?;
        }
        tx.commit()?;
        debug!("Wrote {} slots in one transaction", entries.len());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let affected = self.conn.execute("DELETE FROM slots", [])?;
        info!("Cleared {} slots", affected);
        Ok(())
    }

    fn size_bytes(&self) -> u64 {
        if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        }
    }
}

/// Ephemeral slot storage held in process memory.
///
/// Availability can be switched off to exercise the store's handling of an
/// unreachable medium.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    slots: BTreeMap<Slot, String>,
    available: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            available: true,
        }
    }
}

impl MemoryBackend {
    /// Create an empty, available backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call succeed (`true`) or fail (`false`).
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Check whether calls currently succeed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Raw access to a slot value, bypassing availability.
    #[must_use]
    pub fn raw(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    fn ensure_available(&self, operation: &'static str, target: &str) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(Error::storage_unavailable(operation, target))
        }
    }
}

impl SlotBackend for MemoryBackend {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        self.ensure_available("read", slot.key())?;
        Ok(self.slots.get(&slot).cloned())
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<()> {
        self.ensure_available("write", slot.key())?;
        self.slots.insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<()> {
        self.ensure_available("remove", slot.key())?;
        self.slots.remove(&slot);
        Ok(())
    }

    fn write_batch(&mut self, entries: &[(Slot, String)]) -> Result<()> {
        self.ensure_available("write", "batch")?;
        for (slot, value) in entries {
            self.slots.insert(*slot, value.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_available("clear", "all slots")?;
        self.slots.clear();
        Ok(())
    }
}
