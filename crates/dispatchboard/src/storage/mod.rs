//! Storage layer for dispatchboard.
//!
//! The [`Store`] is the sole authority for durable state: incidents, the
//! message history, the session user and settings. Each lives in its own
//! named slot of a [`SlotBackend`], JSON encoded. Every operation reads the
//! slot, applies the change in memory and writes the slot back before
//! returning.
//!
//! Backend failures are handled according to the store's
//! [`PersistencePolicy`]: by default they are logged and swallowed, so reads
//! fall back to defaults and writes quietly do nothing.

pub mod backend;
pub mod migrations;
pub mod schema;
pub mod snapshot;

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::incident::{Incident, IncidentPatch, NewIncident, Status};
use crate::message::{push_front_bounded, Message, NewMessage};
use crate::session::{Session, User};
use crate::settings::UserSettings;

pub use backend::{MemoryBackend, Slot, SlotBackend, SqliteBackend};
pub use snapshot::{ImportError, Snapshot, SnapshotImport};

/// Prefix of generated incident ids.
pub const INCIDENT_ID_PREFIX: &str = "INC";

/// Prefix of generated message ids.
pub const MESSAGE_ID_PREFIX: &str = "MSG";

/// What the store does when its backend fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistencePolicy {
    /// Log the failure; reads yield defaults and writes become no-ops.
    #[default]
    Ignore,
    /// Return the failure to the caller.
    Propagate,
}

impl std::fmt::Display for PersistencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignore => f.pad("ignore"),
            Self::Propagate => f.pad("propagate"),
        }
    }
}

/// The local record store.
///
/// Construct one at startup and hand it by reference to everything that
/// needs it. Reads take `&self`; writes take `&mut self`.
#[derive(Debug)]
pub struct Store<B = SqliteBackend> {
    backend: B,
    policy: PersistencePolicy,
    /// Ids handed out by this instance, so a record dropped from its slot
    /// (deleted, evicted or never persisted) cannot get its id reissued.
    /// Grows by one entry per add for the life of the store and is never
    /// pruned; a `watch` session only reads, so it does not grow there.
    issued_ids: HashSet<String>,
}

impl Store<SqliteBackend> {
    /// Open or create a store backed by the `SQLite` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened. The persistence
    /// policy does not apply here: a store that cannot be opened at all is
    /// always an error.
    pub fn open(path: impl AsRef<Path>, policy: PersistencePolicy) -> Result<Self> {
        Ok(Self::new(SqliteBackend::open(path)?, policy))
    }

    /// Create a store over an in-memory database, for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(
            SqliteBackend::open_in_memory()?,
            PersistencePolicy::default(),
        ))
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.backend.path()
    }
}

impl<B: SlotBackend> Store<B> {
    /// Create a store over an arbitrary backend.
    pub fn new(backend: B, policy: PersistencePolicy) -> Self {
        Self {
            backend,
            policy,
            issued_ids: HashSet::new(),
        }
    }

    /// Replace the persistence policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PersistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active persistence policy.
    #[must_use]
    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Shared access to the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Exclusive access to the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // === Incidents ===

    /// All incidents in insertion order.
    ///
    /// An unset or corrupt slot reads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn list_incidents(&self) -> Result<Vec<Incident>> {
        Ok(self.read_slot(Slot::Incidents)?.unwrap_or_default())
    }

    /// Look up a single incident.
    ///
    /// # Errors
    ///
    /// See [`Store::list_incidents`].
    pub fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
        Ok(self.list_incidents()?.into_iter().find(|i| i.id == id))
    }

    /// Store a new incident and return it with its id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn add_incident(&mut self, fields: NewIncident) -> Result<Incident> {
        let mut incidents = self.list_incidents()?;
        let id = self.next_id(INCIDENT_ID_PREFIX, |id| {
            incidents.iter().any(|i| i.id == id)
        });

        let incident = fields.into_incident(id, timestamp_now());
        incidents.push(incident.clone());
        self.write_slot(Slot::Incidents, &incidents)?;

        info!("Added incident {} ({})", incident.id, incident.kind);
        Ok(incident)
    }

    /// Merge `patch` into the incident with the given id.
    ///
    /// Returns `None`, without writing anything, if no such incident exists.
    /// Otherwise `updated_at` moves strictly forward.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn update_incident(&mut self, id: &str, patch: IncidentPatch) -> Result<Option<Incident>> {
        let mut incidents = self.list_incidents()?;
        let Some(incident) = incidents.iter_mut().find(|i| i.id == id) else {
            debug!("Update skipped, no incident with id {}", id);
            return Ok(None);
        };

        incident.apply(patch);
        incident.updated_at = timestamp_after(incident.updated_at);
        let updated = incident.clone();
        self.write_slot(Slot::Incidents, &incidents)?;

        info!("Updated incident {}", updated.id);
        Ok(Some(updated))
    }

    /// Remove the incident with the given id.
    ///
    /// Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn delete_incident(&mut self, id: &str) -> Result<bool> {
        let mut incidents = self.list_incidents()?;
        let before = incidents.len();
        incidents.retain(|i| i.id != id);
        if incidents.len() == before {
            debug!("Delete skipped, no incident with id {}", id);
            return Ok(false);
        }

        self.write_slot(Slot::Incidents, &incidents)?;
        info!("Deleted incident {}", id);
        Ok(true)
    }

    // === Messages ===

    /// Message history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn list_messages(&self) -> Result<Vec<Message>> {
        Ok(self.read_slot(Slot::Messages)?.unwrap_or_default())
    }

    /// Put a new message at the front of the history.
    ///
    /// The history is capped at [`crate::message::MESSAGE_HISTORY_LIMIT`];
    /// the oldest messages beyond it are dropped without notice.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn add_message(&mut self, fields: NewMessage) -> Result<Message> {
        let mut messages = self.list_messages()?;
        let id = self.next_id(MESSAGE_ID_PREFIX, |id| messages.iter().any(|m| m.id == id));

        let message = fields.into_message(id);
        push_front_bounded(&mut messages, message.clone());
        self.write_slot(Slot::Messages, &messages)?;

        debug!("Added message {} on channel {}", message.id, message.channel);
        Ok(message)
    }

    // === Settings ===

    /// The persisted settings, or the defaults if none were saved.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn settings(&self) -> Result<UserSettings> {
        Ok(self.read_slot(Slot::UserSettings)?.unwrap_or_default())
    }

    /// Overwrite the persisted settings.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn save_settings(&mut self, settings: &UserSettings) -> Result<()> {
        self.write_slot(Slot::UserSettings, settings)
    }

    // === Session ===

    /// The current session.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn session(&self) -> Result<Session> {
        Ok(Session::from(self.read_slot::<User>(Slot::User)?))
    }

    /// Persist `user` as the session user.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn save_user(&mut self, user: &User) -> Result<()> {
        self.write_slot(Slot::User, user)
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn clear_user(&mut self) -> Result<()> {
        if let Err(err) = self.backend.remove(Slot::User) {
            self.degrade("remove", Slot::User.key(), err)?;
        }
        Ok(())
    }

    /// Change the session user's plan label in place.
    ///
    /// Returns the updated user, or `None` for an anonymous session.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn change_plan(&mut self, plan: &str) -> Result<Option<User>> {
        let Some(mut user) = self.session()?.into_user() else {
            return Ok(None);
        };
        user.plan = plan.to_string();
        self.save_user(&user)?;
        info!("Plan changed to {}", plan);
        Ok(Some(user))
    }

    // === Seeding flag ===

    /// Check whether example data has been seeded.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.read_slot(Slot::Initialized)?.unwrap_or(false))
    }

    /// Record that example data has been seeded.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn mark_initialized(&mut self) -> Result<()> {
        self.write_slot(Slot::Initialized, &true)
    }

    // === Bulk operations ===

    /// Serialize incidents, messages and settings into one JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, or under
    /// [`PersistencePolicy::Propagate`] when the backend cannot be read.
    pub fn export_all(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }

    /// Take a snapshot of incidents, messages and settings.
    ///
    /// # Errors
    ///
    /// See [`Store::export_all`].
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            incidents: self.list_incidents()?,
            messages: self.list_messages()?,
            settings: self.settings()?,
            export_date: timestamp_now(),
        })
    }

    /// Apply an export document.
    ///
    /// Returns `false`, leaving the store untouched, if the document is
    /// malformed. Otherwise every field present in the document replaces its
    /// slot in a single backend batch, and absent fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails; nothing has been written in that case.
    pub fn import_all(&mut self, document: &str) -> Result<bool> {
        let import = match SnapshotImport::parse(document) {
            Ok(import) => import,
            Err(err) => {
                warn!("Rejected import document: {}", err);
                return Ok(false);
            }
        };

        if import.is_empty() {
            info!("Import document had nothing to apply");
            return Ok(true);
        }

        let entries = import.into_entries()?;
        if let Err(err) = self.backend.write_batch(&entries) {
            self.degrade("import", "snapshot", err)?;
            return Ok(false);
        }

        info!("Imported {} slots", entries.len());
        Ok(true)
    }

    /// Erase every slot, including the session user and seeding flag.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend fails.
    pub fn reset_all(&mut self) -> Result<()> {
        if let Err(err) = self.backend.clear() {
            return self.degrade("clear", "all slots", err);
        }
        warn!("All stored data was reset");
        Ok(())
    }

    /// Summary counts for status displays.
    ///
    /// # Errors
    ///
    /// Returns an error only under [`PersistencePolicy::Propagate`] when the
    /// backend cannot be read.
    pub fn stats(&self) -> Result<StoreStats> {
        let incidents = self.list_incidents()?;
        let count = |status: Status| incidents.iter().filter(|i| i.status == status).count();

        Ok(StoreStats {
            total_incidents: incidents.len(),
            active_incidents: count(Status::Active),
            in_progress_incidents: count(Status::InProgress),
            resolved_incidents: count(Status::Resolved),
            total_messages: self.list_messages()?.len(),
            authenticated: self.session()?.is_authenticated(),
            db_size_bytes: self.backend.size_bytes(),
        })
    }

    // === Internals ===

    /// Read and decode a slot. Corrupt contents read as unset.
    fn read_slot<T: DeserializeOwned>(&self, slot: Slot) -> Result<Option<T>> {
        let raw = match self.backend.read(slot) {
            Ok(raw) => raw,
            Err(err) => {
                self.degrade("read", slot.key(), err)?;
                return Ok(None);
            }
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Ignoring corrupt contents of slot {}: {}", slot, err);
                Ok(None)
            }
        }
    }

    fn write_slot<T: Serialize + ?Sized>(&mut self, slot: Slot, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        if let Err(err) = self.backend.write(slot, &raw) {
            return self.degrade("write", slot.key(), err);
        }
        Ok(())
    }

    /// Apply the persistence policy to a backend failure.
    fn degrade(&self, operation: &str, target: &str, err: Error) -> Result<()> {
        match self.policy {
            PersistencePolicy::Ignore if err.is_persistence_failure() => {
                warn!("Ignoring failed {} of {}: {}", operation, target, err);
                Ok(())
            }
            _ => Err(err),
        }
    }

    fn next_id(&mut self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let millis = Utc::now().timestamp_millis();
            let suffix = Uuid::new_v4().as_u128() % 1000;
            let id = format!("{prefix}-{millis}-{suffix}");
            if !taken(&id) && self.issued_ids.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// The current instant at millisecond precision.
fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The current instant, or one millisecond past `previous` if the clock has
/// not moved beyond it yet.
fn timestamp_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    timestamp_now().max(previous + Duration::milliseconds(1))
}

/// Summary counts of the stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of incidents.
    pub total_incidents: usize,
    /// Incidents with status Active.
    pub active_incidents: usize,
    /// Incidents with status In Progress.
    pub in_progress_incidents: usize,
    /// Incidents with status Resolved.
    pub resolved_incidents: usize,
    /// Messages in the history.
    pub total_messages: usize,
    /// Whether a user is signed in.
    pub authenticated: bool,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
