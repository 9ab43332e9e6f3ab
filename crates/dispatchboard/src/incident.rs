//! Incident records.
//!
//! An incident is a tracked emergency event with a severity, a lifecycle
//! status and a number of assigned responders.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How serious an incident is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Minor, no immediate danger.
    Low,
    /// Needs attention but is contained.
    Medium,
    /// Serious, escalating.
    High,
    /// Life-threatening or widespread.
    Critical,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.pad("Low"),
            Self::Medium => f.pad("Medium"),
            Self::High => f.pad("High"),
            Self::Critical => f.pad("Critical"),
        }
    }
}

/// Where an incident is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Reported, responders not yet engaged.
    Active,
    /// Responders are working on it.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Closed.
    Resolved,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.pad("Active"),
            Self::InProgress => f.pad("In Progress"),
            Self::Resolved => f.pad("Resolved"),
        }
    }
}

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// A stored incident.
///
/// `id` and `created_at` are assigned by the store and never change;
/// `updated_at` is refreshed on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique identifier, `INC-<millis>-<suffix>`.
    pub id: String,
    /// Kind of incident ("Fire", "Medical", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text location.
    pub location: String,
    /// How serious the incident is.
    pub severity: Severity,
    /// Free-text time label shown on the dashboard.
    pub time: String,
    /// Number of responders assigned.
    pub responders: u32,
    /// Lifecycle status.
    pub status: Status,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Optional map position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Merge the fields present in `patch` over this record.
    ///
    /// Timestamps are left alone; the store refreshes `updated_at`.
    /// Coordinates can be replaced but not cleared: once an incident has a
    /// map position it keeps one.
    pub fn apply(&mut self, patch: IncidentPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(responders) = patch.responders {
            self.responders = responders;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = Some(coordinates);
        }
    }
}

/// The caller-supplied fields of a new incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    /// Kind of incident.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text location.
    pub location: String,
    /// How serious the incident is.
    pub severity: Severity,
    /// Free-text time label.
    pub time: String,
    /// Number of responders assigned.
    pub responders: u32,
    /// Lifecycle status.
    pub status: Status,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Optional map position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl NewIncident {
    /// Build a stored incident from these fields.
    #[must_use]
    pub fn into_incident(self, id: String, now: DateTime<Utc>) -> Incident {
        Incident {
            id,
            kind: self.kind,
            location: self.location,
            severity: self.severity,
            time: self.time,
            responders: self.responders,
            status: self.status,
            description: self.description,
            coordinates: self.coordinates,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to an incident. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncidentPatch {
    /// New kind.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New severity.
    pub severity: Option<Severity>,
    /// New time label.
    pub time: Option<String>,
    /// New responder count.
    pub responders: Option<u32>,
    /// New status.
    pub status: Option<Status>,
    /// New description.
    pub description: Option<String>,
    /// New map position. `None` keeps the current one, so a patch cannot
    /// remove coordinates.
    pub coordinates: Option<Coordinates>,
}

impl IncidentPatch {
    /// Check if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Selection criteria for listing incidents.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Only incidents with this status.
    pub status: Option<Status>,
    /// Only incidents with this severity.
    pub severity: Option<Severity>,
    /// Only incidents whose type, location or description match.
    pub pattern: Option<Regex>,
}

impl IncidentFilter {
    /// Build a filter with a case-insensitive search pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn with_pattern(mut self, pattern: &str) -> crate::Result<Self> {
        self.pattern = Some(Regex::new(&format!("(?i){pattern}"))?);
        Ok(self)
    }

    /// Check whether an incident passes the filter.
    #[must_use]
    pub fn matches(&self, incident: &Incident) -> bool {
        if self.status.is_some_and(|s| s != incident.status) {
            return false;
        }
        if self.severity.is_some_and(|s| s != incident.severity) {
            return false;
        }
        match &self.pattern {
            Some(re) => {
                re.is_match(&incident.kind)
                    || re.is_match(&incident.location)
                    || re.is_match(&incident.description)
            }
            None => true,
        }
    }

    /// Keep only the incidents that pass the filter, preserving order.
    #[must_use]
    pub fn apply(&self, incidents: Vec<Incident>) -> Vec<Incident> {
        incidents.into_iter().filter(|i| self.matches(i)).collect()
    }
}
