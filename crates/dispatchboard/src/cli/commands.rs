//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::incident::{Coordinates, IncidentFilter, IncidentPatch, NewIncident, Severity, Status};
use crate::message::Priority;
use crate::report::{ReportKind, ReportRange};
use crate::session::{ENTERPRISE_PLAN, PROFESSIONAL_PLAN};
use crate::settings::Theme;

/// Incident commands.
#[derive(Debug, Subcommand)]
pub enum IncidentCommand {
    /// List incidents
    List {
        /// Only incidents with this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Only incidents with this severity
        #[arg(long, value_enum)]
        severity: Option<SeverityArg>,

        /// Search type, location and description (regex, case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one incident
    Show {
        /// Incident ID
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Report a new incident
    Add(IncidentAddArgs),

    /// Change fields of an incident
    Update {
        /// Incident ID
        id: String,

        /// Fields to change
        #[command(flatten)]
        fields: IncidentUpdateArgs,
    },

    /// Delete an incident
    Delete {
        /// Incident ID
        id: String,
    },
}

/// Fields of a new incident.
#[derive(Debug, Args)]
pub struct IncidentAddArgs {
    /// Kind of incident (Fire, Medical, ...)
    #[arg(short = 't', long = "type")]
    pub kind: String,

    /// Where it is happening
    #[arg(short, long)]
    pub location: String,

    /// How serious it is
    #[arg(short, long, value_enum, default_value = "medium")]
    pub severity: SeverityArg,

    /// Time label (defaults to the current local time)
    #[arg(long)]
    pub time: Option<String>,

    /// Responders assigned
    #[arg(short, long, default_value = "0")]
    pub responders: u32,

    /// Initial status
    #[arg(long, value_enum, default_value = "active")]
    pub status: StatusArg,

    /// Free-text description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Latitude of the incident
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the incident
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

impl IncidentAddArgs {
    /// Build the incident fields, using `default_time` when no time was given.
    #[must_use]
    pub fn into_new_incident(self, default_time: String) -> NewIncident {
        NewIncident {
            kind: self.kind,
            location: self.location,
            severity: self.severity.into(),
            time: self.time.unwrap_or(default_time),
            responders: self.responders,
            status: self.status.into(),
            description: self.description,
            coordinates: coordinates(self.lat, self.lng),
        }
    }
}

/// Incident fields that can be changed.
#[derive(Debug, Default, Args)]
pub struct IncidentUpdateArgs {
    /// New kind
    #[arg(short = 't', long = "type")]
    pub kind: Option<String>,

    /// New location
    #[arg(short, long)]
    pub location: Option<String>,

    /// New severity
    #[arg(short, long, value_enum)]
    pub severity: Option<SeverityArg>,

    /// New time label
    #[arg(long)]
    pub time: Option<String>,

    /// New responder count
    #[arg(short, long)]
    pub responders: Option<u32>,

    /// New status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// New longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

impl From<IncidentUpdateArgs> for IncidentPatch {
    fn from(args: IncidentUpdateArgs) -> Self {
        Self {
            kind: args.kind,
            location: args.location,
            severity: args.severity.map(Into::into),
            time: args.time,
            responders: args.responders,
            status: args.status.map(Into::into),
            description: args.description,
            coordinates: coordinates(args.lat, args.lng),
        }
    }
}

fn coordinates(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    }
}

/// Build an incident filter from `incident list` options.
///
/// # Errors
///
/// Returns an error if `search` is not a valid pattern.
pub fn incident_filter(
    status: Option<StatusArg>,
    severity: Option<SeverityArg>,
    search: Option<&str>,
) -> crate::Result<IncidentFilter> {
    let filter = IncidentFilter {
        status: status.map(Into::into),
        severity: severity.map(Into::into),
        pattern: None,
    };
    match search {
        Some(pattern) => filter.with_pattern(pattern),
        None => Ok(filter),
    }
}

/// Message commands.
#[derive(Debug, Subcommand)]
pub enum MessageCommand {
    /// Show the message history, newest first
    List {
        /// Show at most this many messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Broadcast a message
    Send {
        /// Sender label
        #[arg(short, long)]
        from: String,

        /// Channel to broadcast on
        #[arg(long, default_value = "Command")]
        channel: String,

        /// Urgency
        #[arg(short, long, value_enum, default_value = "medium")]
        priority: PriorityArg,

        /// Time label (defaults to the current local time)
        #[arg(long)]
        time: Option<String>,

        /// Message body
        text: String,
    },
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change settings
    Set {
        /// Enable or disable notifications
        #[arg(long)]
        notifications: Option<bool>,

        /// Enable or disable auto-refresh
        #[arg(long)]
        auto_refresh: Option<bool>,

        /// Color theme
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,

        /// Locale code
        #[arg(long)]
        language: Option<String>,
    },
}

/// User session commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Show the signed-in user
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Sign in, named after the email's local part
    Login {
        /// Email address
        email: String,
    },

    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        email: String,
    },

    /// Sign out
    Logout,

    /// Start a free trial of the professional plan
    Trial,

    /// Switch to a paid plan
    Upgrade {
        /// Plan to switch to
        #[arg(value_enum)]
        plan: PlanArg,
    },
}

/// Data management commands.
#[derive(Debug, Subcommand)]
pub enum DataCommand {
    /// Export incidents, messages and settings as JSON
    Export {
        /// Write to this file (defaults to emergency-data-<date>.json)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print the document instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Import a previously exported document
    Import {
        /// Document to import
        file: PathBuf,
    },

    /// Erase all stored data
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Kind of report
    #[arg(short, long, value_enum, default_value = "summary")]
    pub kind: ReportKindArg,

    /// Period label attached to the report
    #[arg(short, long, value_enum, default_value = "week")]
    pub range: ReportRangeArg,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Stop after this many refreshes
    #[arg(short = 'n', long)]
    pub ticks: Option<u64>,

    /// Refresh period in milliseconds (overrides configuration)
    #[arg(short, long)]
    pub interval_ms: Option<u64>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Incident status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Reported, not yet engaged
    Active,
    /// Being worked on
    InProgress,
    /// Closed
    Resolved,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Resolved => Self::Resolved,
        }
    }
}

/// Incident severity argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    /// Minor
    Low,
    /// Contained
    Medium,
    /// Escalating
    High,
    /// Life-threatening
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => Self::Low,
            SeverityArg::Medium => Self::Medium,
            SeverityArg::High => Self::High,
            SeverityArg::Critical => Self::Critical,
        }
    }
}

/// Message priority argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Informational
    Low,
    /// Normal traffic
    Medium,
    /// Urgent
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

/// Theme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    /// Dark background
    Dark,
    /// Light background
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Self::Dark,
            ThemeArg::Light => Self::Light,
        }
    }
}

/// Paid plan argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanArg {
    /// Professional plan
    Professional,
    /// Enterprise plan
    Enterprise,
}

impl PlanArg {
    /// The stored plan label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Professional => PROFESSIONAL_PLAN,
            Self::Enterprise => ENTERPRISE_PLAN,
        }
    }
}

/// Report kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKindArg {
    /// Headline counts
    Summary,
    /// Counts plus every incident
    Detailed,
    /// Responder deployment
    Performance,
    /// Distribution by type and severity
    Trends,
}

impl From<ReportKindArg> for ReportKind {
    fn from(arg: ReportKindArg) -> Self {
        match arg {
            ReportKindArg::Summary => Self::Summary,
            ReportKindArg::Detailed => Self::Detailed,
            ReportKindArg::Performance => Self::Performance,
            ReportKindArg::Trends => Self::Trends,
        }
    }
}

/// Report range argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportRangeArg {
    /// Today
    Today,
    /// This week
    Week,
    /// This month
    Month,
    /// This quarter
    Quarter,
    /// This year
    Year,
}

impl From<ReportRangeArg> for ReportRange {
    fn from(arg: ReportRangeArg) -> Self {
        match arg {
            ReportRangeArg::Today => Self::Today,
            ReportRangeArg::Week => Self::Week,
            ReportRangeArg::Month => Self::Month,
            ReportRangeArg::Quarter => Self::Quarter,
            ReportRangeArg::Year => Self::Year,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
