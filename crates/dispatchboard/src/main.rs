//! `dispatchboard` - CLI for the local incident dashboard
//!
//! This binary provides the command-line interface for tracking incidents,
//! broadcasting messages and managing the stored dashboard data.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tracing::{debug, warn};

use dispatchboard::cli::{
    incident_filter, Cli, Command, ConfigCommand, DataCommand, IncidentCommand, MessageCommand,
    OutputFormat, ReportCommand, SettingsCommand, UserCommand, WatchCommand,
};
use dispatchboard::incident::{Incident, IncidentPatch};
use dispatchboard::message::NewMessage;
use dispatchboard::refresh::{run_refresh_loop, DashboardView, RefreshHandle};
use dispatchboard::report::{IncidentSummary, Report, ReportKind};
use dispatchboard::seed::seed_defaults;
use dispatchboard::session::{User, TRIAL_PLAN};
use dispatchboard::{init_logging, Config, Store};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    dispatch(&config, cli.command)
}

/// Run one command. Everything except `config` opens the store first.
fn dispatch(config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Incident(cmd) => handle_incident(&mut open_store(config)?, cmd),
        Command::Message(cmd) => handle_message(&mut open_store(config)?, cmd),
        Command::Settings(cmd) => handle_settings(&mut open_store(config)?, cmd),
        Command::User(cmd) => handle_user(&mut open_store(config)?, cmd),
        Command::Data(cmd) => handle_data(&mut open_store(config)?, cmd),
        Command::Report(cmd) => handle_report(&open_store(config)?, &cmd),
        Command::Watch(cmd) => handle_watch(&open_store(config)?, config, &cmd),
        Command::Status(cmd) => handle_status(&open_store(config)?, cmd.json),
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

/// Open the configured store, seeding example data into an empty one.
fn open_store(config: &Config) -> anyhow::Result<Store> {
    let path = config.database_path();
    let mut store = Store::open(&path, config.storage.on_persistence_error)
        .with_context(|| format!("failed to open store at {}", path.display()))?;

    if config.dashboard.seed_defaults
        && store.list_incidents()?.is_empty()
        && store.list_messages()?.is_empty()
    {
        seed_defaults(&mut store)?;
    }

    debug!("Opened store at {}", path.display());
    Ok(store)
}

/// Current local time as the dashboard's `HH:MM` label.
fn local_time_label() -> String {
    Local::now().format("%H:%M").to_string()
}

fn local_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn handle_incident(store: &mut Store, cmd: IncidentCommand) -> anyhow::Result<()> {
    match cmd {
        IncidentCommand::List {
            status,
            severity,
            search,
            json,
        } => {
            let filter = incident_filter(status, severity, search.as_deref())?;
            let incidents = filter.apply(store.list_incidents()?);
            if json {
                println!("{}", serde_json::to_string_pretty(&incidents)?);
            } else if incidents.is_empty() {
                println!("No incidents.");
            } else {
                for incident in &incidents {
                    println!(
                        "{:<22} {:<9} {:<12} {:>3}  {} @ {}",
                        incident.id,
                        incident.severity,
                        incident.status,
                        incident.responders,
                        incident.kind,
                        incident.location
                    );
                }
            }
        }
        IncidentCommand::Show { id, json } => {
            let Some(incident) = store.get_incident(&id)? else {
                bail!("no incident with id {id}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&incident)?);
            } else {
                print_incident(&incident);
            }
        }
        IncidentCommand::Add(args) => {
            let incident = store.add_incident(args.into_new_incident(local_time_label()))?;
            println!("Added incident {}", incident.id);
        }
        IncidentCommand::Update { id, fields } => {
            let patch = IncidentPatch::from(fields);
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field to change");
            }
            match store.update_incident(&id, patch)? {
                Some(incident) => println!("Updated incident {} ({})", incident.id, incident.status),
                None => bail!("no incident with id {id}"),
            }
        }
        IncidentCommand::Delete { id } => {
            if !store.delete_incident(&id)? {
                bail!("no incident with id {id}");
            }
            println!("Deleted incident {id}");
        }
    }
    Ok(())
}

fn print_incident(incident: &Incident) {
    println!("ID:          {}", incident.id);
    println!("Type:        {}", incident.kind);
    println!("Location:    {}", incident.location);
    println!("Severity:    {}", incident.severity);
    println!("Status:      {}", incident.status);
    println!("Responders:  {}", incident.responders);
    println!("Time:        {}", incident.time);
    if let Some(coordinates) = incident.coordinates {
        println!("Coordinates: {}, {}", coordinates.lat, coordinates.lng);
    }
    println!("Created:     {}", local_timestamp(incident.created_at));
    println!("Updated:     {}", local_timestamp(incident.updated_at));
    if !incident.description.is_empty() {
        println!();
        println!("{}", incident.description);
    }
}

fn handle_message(store: &mut Store, cmd: MessageCommand) -> anyhow::Result<()> {
    match cmd {
        MessageCommand::List { limit, json } => {
            let mut messages = store.list_messages()?;
            if let Some(limit) = limit {
                messages.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if messages.is_empty() {
                println!("No messages.");
            } else {
                for message in &messages {
                    println!(
                        "[{}] {:<6} {} / {}: {}",
                        message.time, message.priority, message.channel, message.from, message.message
                    );
                }
            }
        }
        MessageCommand::Send {
            from,
            channel,
            priority,
            time,
            text,
        } => {
            let message = store.add_message(NewMessage {
                from,
                message: text,
                time: time.unwrap_or_else(local_time_label),
                priority: priority.into(),
                channel,
            })?;
            println!("Sent message {} on {}", message.id, message.channel);
        }
    }
    Ok(())
}

fn handle_settings(store: &mut Store, cmd: SettingsCommand) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::Show { json } => {
            let settings = store.settings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("Notifications: {}", settings.notifications);
                println!("Auto-refresh:  {}", settings.auto_refresh);
                println!("Theme:         {}", settings.theme);
                println!("Language:      {}", settings.language);
            }
        }
        SettingsCommand::Set {
            notifications,
            auto_refresh,
            theme,
            language,
        } => {
            if notifications.is_none()
                && auto_refresh.is_none()
                && theme.is_none()
                && language.is_none()
            {
                bail!("nothing to change; pass at least one setting");
            }

            let mut settings = store.settings()?;
            if let Some(notifications) = notifications {
                settings.notifications = notifications;
            }
            if let Some(auto_refresh) = auto_refresh {
                settings.auto_refresh = auto_refresh;
            }
            if let Some(theme) = theme {
                settings.theme = theme.into();
            }
            if let Some(language) = language {
                settings.language = language;
            }
            store.save_settings(&settings)?;
            println!("Settings saved.");
        }
    }
    Ok(())
}

fn handle_user(store: &mut Store, cmd: UserCommand) -> anyhow::Result<()> {
    match cmd {
        UserCommand::Show { json } => {
            let session = store.session()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session.user())?);
            } else if let Some(user) = session.user() {
                println!("Name:  {}", user.name);
                println!("Email: {}", user.email);
                println!("Plan:  {}", user.plan);
            } else {
                println!("Not signed in.");
            }
        }
        UserCommand::Login { email } => {
            let user = User::from_email(&email);
            store.save_user(&user)?;
            println!("Signed in as {} ({})", user.name, user.plan);
        }
        UserCommand::Register { name, email } => {
            let user = User::new(name, email);
            store.save_user(&user)?;
            println!("Registered and signed in as {} ({})", user.name, user.plan);
        }
        UserCommand::Logout => {
            store.clear_user()?;
            println!("Signed out.");
        }
        UserCommand::Trial => change_plan(store, TRIAL_PLAN)?,
        UserCommand::Upgrade { plan } => change_plan(store, plan.label())?,
    }
    Ok(())
}

fn change_plan(store: &mut Store, plan: &str) -> anyhow::Result<()> {
    match store.change_plan(plan)? {
        Some(user) => {
            println!("{} is now on the {} plan", user.name, user.plan);
            Ok(())
        }
        None => bail!("sign in before changing plans"),
    }
}

fn handle_data(store: &mut Store, cmd: DataCommand) -> anyhow::Result<()> {
    match cmd {
        DataCommand::Export { output, stdout } => {
            if stdout {
                println!("{}", store.export_all()?);
                return Ok(());
            }

            let snapshot = store.snapshot()?;
            let path = output.unwrap_or_else(|| PathBuf::from(snapshot.file_name()));
            fs::write(&path, serde_json::to_string_pretty(&snapshot)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Exported {} incidents and {} messages to {}",
                snapshot.incidents.len(),
                snapshot.messages.len(),
                path.display()
            );
        }
        DataCommand::Import { file } => {
            let document = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if !store.import_all(&document)? {
                bail!(
                    "could not import {}: not a valid export document, or storage is unavailable",
                    file.display()
                );
            }
            println!("Imported {}", file.display());
        }
        DataCommand::Reset { yes } => {
            if !yes {
                println!("This will erase all incidents, messages, settings and the signed-in user.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            store.reset_all()?;
            println!("All data erased.");
        }
    }
    Ok(())
}

fn handle_report(store: &Store, cmd: &ReportCommand) -> anyhow::Result<()> {
    let report = Report::generate(cmd.kind.into(), cmd.range.into(), &store.list_incidents()?);

    if let Some(path) = &cmd.output {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} report to {}", report.kind, path.display());
        return Ok(());
    }

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &Report) {
    let data = &report.data;
    println!("Incident {} report ({})", report.kind, report.date_range);
    println!("Generated: {}", local_timestamp(report.generated_at));
    println!("Suggested file: {}", report.file_name());
    println!();
    println!("Total incidents:  {}", data.total_incidents);
    println!("Active:           {}", data.active_incidents);
    println!("Resolved:         {}", data.resolved_incidents);
    println!("Total responders: {}", data.total_responders);

    match report.kind {
        ReportKind::Summary => {}
        ReportKind::Detailed => {
            println!();
            for incident in &data.incidents {
                println!(
                    "{}  {} @ {}  [{} / {}]",
                    incident.id, incident.kind, incident.location, incident.severity, incident.status
                );
            }
        }
        ReportKind::Performance => {
            let summary = IncidentSummary::from_incidents(&data.incidents);
            println!("In progress:      {}", summary.in_progress);
            println!("Avg responders:   {}", summary.average_responders);
        }
        ReportKind::Trends => {
            println!();
            println!("By type:");
            for (kind, count) in &data.by_type {
                println!("  {kind:<18} {count}");
            }
            println!("By severity:");
            for (severity, count) in &data.by_severity {
                println!("  {severity:<18} {count}");
            }
        }
    }
}

fn handle_watch(store: &Store, config: &Config, cmd: &WatchCommand) -> anyhow::Result<()> {
    let period = cmd
        .interval_ms
        .map_or_else(|| config.refresh_interval(), Duration::from_millis);

    if !store.settings()?.auto_refresh {
        warn!("Auto-refresh is disabled in settings; showing a single snapshot");
        print_dashboard(&DashboardView::load(store)?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let handle = RefreshHandle::new();
    let ticks = cmd.ticks;
    let mut shown = 0_u64;

    let refreshes = runtime.block_on(async {
        let on_ctrl_c = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.stop();
            }
        });

        run_refresh_loop(store, period, &handle, |view| {
            print_dashboard(view);
            shown += 1;
            if ticks.is_some_and(|limit| shown >= limit) {
                handle.stop();
            }
        })
        .await
    })?;

    debug!("Watch finished after {} refreshes", refreshes);
    Ok(())
}

fn print_dashboard(view: &DashboardView) {
    println!(
        "=== Dispatch board ({}) ===",
        view.loaded_at.with_timezone(&Local).format("%H:%M:%S")
    );
    println!("{}", view.status_line());
    if let Some(user) = view.session.user() {
        println!("Signed in: {} [{}]", user.name, user.plan);
    }

    println!();
    println!("Active incidents:");
    let active = view.active_incidents();
    if active.is_empty() {
        println!("  none");
    }
    for incident in active {
        println!(
            "  {:<9} {} @ {} ({} responders)",
            incident.severity, incident.kind, incident.location, incident.responders
        );
    }

    println!();
    println!("Latest messages:");
    for message in view.messages.iter().take(3) {
        println!("  [{}] {}: {}", message.time, message.from, message.message);
    }
    println!();
}

fn handle_status(store: &Store, json: bool) -> anyhow::Result<()> {
    let stats = store.stats()?;
    let session = store.session()?;

    if json {
        let status = serde_json::json!({
            "database_path": store.path(),
            "persistence_policy": store.policy().to_string(),
            "plan": session.plan(),
            "user": session.user(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("dispatchboard status");
        println!("--------------------");
        println!("Database:      {}", store.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("On failure:    {}", store.policy());
        println!(
            "Incidents:     {} ({} active, {} in progress, {} resolved)",
            stats.total_incidents,
            stats.active_incidents,
            stats.in_progress_incidents,
            stats.resolved_incidents
        );
        println!("Messages:      {}", stats.total_messages);
        match session.user() {
            Some(user) => println!("User:          {} ({})", user.name, user.plan),
            None => println!("User:          not signed in"),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
                println!(
                    "  On persistence error: {}",
                    config.storage.on_persistence_error
                );
                println!();
                println!("[Dashboard]");
                println!(
                    "  Refresh interval:     {} ms",
                    config.dashboard.refresh_interval_ms
                );
                println!("  Seed defaults:        {}", config.dashboard.seed_defaults);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_file(&path)
                .with_context(|| format!("configuration at {} is invalid", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
