//! `dispatchboard` - A local incident tracking and broadcast dashboard
//!
//! This library keeps emergency incidents, operator broadcast messages, user
//! preferences and the signed-in user in a local `SQLite` file, and provides
//! the export/import, reporting and auto-refresh logic the dashboard needs.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod incident;
pub mod logging;
pub mod message;
pub mod refresh;
pub mod report;
pub mod seed;
pub mod session;
pub mod settings;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use incident::{Incident, IncidentPatch, NewIncident, Severity, Status};
pub use logging::init_logging;
pub use message::{Message, NewMessage, Priority};
pub use session::{Session, User};
pub use settings::UserSettings;
pub use storage::{PersistencePolicy, Store, StoreStats};
