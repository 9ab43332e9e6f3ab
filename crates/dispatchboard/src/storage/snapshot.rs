//! The export/import document.
//!
//! An export carries the full incident list, message history and settings
//! plus the instant it was taken. An import applies whichever of those three
//! fields are present and leaves the rest of the store alone.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::incident::Incident;
use crate::message::{Message, MESSAGE_HISTORY_LIMIT};
use crate::settings::UserSettings;

use super::backend::Slot;

/// Reasons an import document is rejected as a whole.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The document is not valid JSON or a field has the wrong shape.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two incidents in the document share an id.
    #[error("duplicate incident id in snapshot: {0}")]
    DuplicateIncidentId(String),

    /// Two messages in the document share an id.
    #[error("duplicate message id in snapshot: {0}")]
    DuplicateMessageId(String),
}

/// A full export of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Every incident, insertion order.
    pub incidents: Vec<Incident>,
    /// Message history, newest first.
    pub messages: Vec<Message>,
    /// User preferences.
    pub settings: UserSettings,
    /// When the export was taken.
    pub export_date: DateTime<Utc>,
}

impl Snapshot {
    /// Suggested file name for an export taken at `export_date`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("emergency-data-{}.json", self.export_date.format("%Y-%m-%d"))
    }
}

/// The accepted fields of an import document.
///
/// Missing or `null` fields stay `None` and leave their slot untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotImport {
    /// Replacement incident list.
    pub incidents: Option<Vec<Incident>>,
    /// Replacement message history.
    pub messages: Option<Vec<Message>>,
    /// Replacement settings.
    pub settings: Option<UserSettings>,
}

impl SnapshotImport {
    /// Parse and validate an import document.
    ///
    /// Message histories longer than [`MESSAGE_HISTORY_LIMIT`] keep only their
    /// first (newest) entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or repeats an incident
    /// or message id.
    pub fn parse(document: &str) -> Result<Self, ImportError> {
        let mut import: Self = serde_json::from_str(document)?;

        if let Some(incidents) = &import.incidents {
            let mut seen = HashSet::with_capacity(incidents.len());
            for incident in incidents {
                if !seen.insert(incident.id.as_str()) {
                    return Err(ImportError::DuplicateIncidentId(incident.id.clone()));
                }
            }
        }

        if let Some(messages) = &import.messages {
            let mut seen = HashSet::with_capacity(messages.len());
            for message in messages {
                if !seen.insert(message.id.as_str()) {
                    return Err(ImportError::DuplicateMessageId(message.id.clone()));
                }
            }
        }

        if let Some(messages) = &mut import.messages {
            messages.truncate(MESSAGE_HISTORY_LIMIT);
        }

        Ok(import)
    }

    /// Check if the document carried nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_none() && self.messages.is_none() && self.settings.is_none()
    }

    /// Encode the present fields as slot writes.
    ///
    /// # Errors
    ///
    /// Returns an error if a value fails to serialize.
    pub fn into_entries(self) -> crate::Result<Vec<(Slot, String)>> {
        let mut entries = Vec::with_capacity(3);
        if let Some(incidents) = self.incidents {
            entries.push((Slot::Incidents, serde_json::to_string(&incidents)?));
        }
        if let Some(messages) = self.messages {
            entries.push((Slot::Messages, serde_json::to_string(&messages)?));
        }
        if let Some(settings) = self.settings {
            entries.push((Slot::UserSettings, serde_json::to_string(&settings)?));
        }
        Ok(entries)
    }
}
