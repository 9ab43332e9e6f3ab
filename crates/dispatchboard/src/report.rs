//! Incident reports.
//!
//! Reports are computed on demand from the current incident list; nothing
//! here is persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incident::{Incident, Severity, Status};

/// Kind of report requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Headline counts.
    #[default]
    Summary,
    /// Counts plus per-incident detail.
    Detailed,
    /// Responder deployment.
    Performance,
    /// Distribution by type and severity.
    Trends,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summary => f.pad("summary"),
            Self::Detailed => f.pad("detailed"),
            Self::Performance => f.pad("performance"),
            Self::Trends => f.pad("trends"),
        }
    }
}

/// Period label attached to a report.
///
/// The label is informational; the report always covers every stored incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    /// Today.
    Today,
    /// This week.
    #[default]
    Week,
    /// This month.
    Month,
    /// This quarter.
    Quarter,
    /// This year.
    Year,
}

impl std::fmt::Display for ReportRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => f.pad("today"),
            Self::Week => f.pad("week"),
            Self::Month => f.pad("month"),
            Self::Quarter => f.pad("quarter"),
            Self::Year => f.pad("year"),
        }
    }
}

/// Aggregate figures over a set of incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummary {
    /// Number of incidents.
    pub total: usize,
    /// Incidents with status Active.
    pub active: usize,
    /// Incidents with status In Progress.
    pub in_progress: usize,
    /// Incidents with status Resolved.
    pub resolved: usize,
    /// Sum of responders over all incidents.
    pub total_responders: u64,
    /// Mean responders per incident, rounded; 0 when there are no incidents.
    pub average_responders: u64,
    /// Incident count per type label.
    pub by_type: BTreeMap<String, usize>,
    /// Incident count per severity.
    pub by_severity: BTreeMap<Severity, usize>,
}

impl IncidentSummary {
    /// Compute the summary of `incidents`.
    #[must_use]
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        let mut summary = Self {
            total: incidents.len(),
            ..Self::default()
        };

        for incident in incidents {
            match incident.status {
                Status::Active => summary.active += 1,
                Status::InProgress => summary.in_progress += 1,
                Status::Resolved => summary.resolved += 1,
            }
            summary.total_responders += u64::from(incident.responders);
            *summary.by_type.entry(incident.kind.clone()).or_insert(0) += 1;
            *summary.by_severity.entry(incident.severity).or_insert(0) += 1;
        }

        if summary.total > 0 {
            let count = summary.total as u64;
            summary.average_responders = (summary.total_responders * 2 + count) / (count * 2);
        }

        summary
    }
}

/// Body of a generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    /// Number of incidents.
    pub total_incidents: usize,
    /// Incidents with status Active.
    pub active_incidents: usize,
    /// Incidents with status Resolved.
    pub resolved_incidents: usize,
    /// Incident count per type label.
    pub by_type: BTreeMap<String, usize>,
    /// Incident count per severity.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Sum of responders.
    pub total_responders: u64,
    /// The incidents the report was computed from.
    pub incidents: Vec<Incident>,
}

/// A downloadable report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Requested kind.
    #[serde(rename = "type")]
    pub kind: ReportKind,
    /// Requested period label.
    pub date_range: ReportRange,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Report body.
    pub data: ReportData,
}

impl Report {
    /// Generate a report over `incidents`.
    #[must_use]
    pub fn generate(kind: ReportKind, date_range: ReportRange, incidents: &[Incident]) -> Self {
        let summary = IncidentSummary::from_incidents(incidents);
        Self {
            kind,
            date_range,
            generated_at: Utc::now(),
            data: ReportData {
                total_incidents: summary.total,
                active_incidents: summary.active,
                resolved_incidents: summary.resolved,
                by_type: summary.by_type,
                by_severity: summary.by_severity,
                total_responders: summary.total_responders,
                incidents: incidents.to_vec(),
            },
        }
    }

    /// Suggested file name, e.g. `emergency-report-summary-2024-05-01.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "emergency-report-{}-{}.json",
            self.kind,
            self.generated_at.format("%Y-%m-%d")
        )
    }
}
