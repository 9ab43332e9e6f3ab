//! Command-line interface for dispatchboard.
//!
//! This module provides the CLI structure for the `dispatchboard` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    incident_filter, ConfigCommand, DataCommand, IncidentAddArgs, IncidentCommand,
    IncidentUpdateArgs, MessageCommand, OutputFormat, PlanArg, PriorityArg, ReportCommand,
    ReportKindArg, ReportRangeArg, SettingsCommand, SeverityArg, StatusArg, StatusCommand,
    ThemeArg, UserCommand, WatchCommand,
};

/// dispatchboard - Track incidents and broadcast messages
///
/// A local dashboard for emergency incidents, operator broadcasts and user
/// preferences, stored in a single `SQLite` file.
#[derive(Debug, Parser)]
#[command(name = "dispatchboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage incidents
    #[command(subcommand)]
    Incident(IncidentCommand),

    /// Read or send broadcast messages
    #[command(subcommand)]
    Message(MessageCommand),

    /// View or change user settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage the signed-in user
    #[command(subcommand)]
    User(UserCommand),

    /// Export, import or reset stored data
    #[command(subcommand)]
    Data(DataCommand),

    /// Generate an incident report
    Report(ReportCommand),

    /// Show the dashboard and refresh it periodically
    Watch(WatchCommand),

    /// Show store status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
