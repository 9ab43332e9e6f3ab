//! Dashboard projection and auto-refresh.
//!
//! A [`DashboardView`] is a disposable copy of what the store holds at one
//! instant. The refresh loop rebuilds it on a fixed period while the user's
//! `autoRefresh` setting is on. It polls; it never subscribes to writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::incident::{Incident, Status};
use crate::message::Message;
use crate::report::IncidentSummary;
use crate::session::Session;
use crate::settings::UserSettings;
use crate::storage::{SlotBackend, Store};

/// How many active incidents the dashboard previews.
pub const ACTIVE_PREVIEW_LIMIT: usize = 5;

/// A read-only projection of the store.
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// All incidents.
    pub incidents: Vec<Incident>,
    /// Message history, newest first.
    pub messages: Vec<Message>,
    /// Current settings.
    pub settings: UserSettings,
    /// Current session.
    pub session: Session,
    /// When the projection was taken.
    pub loaded_at: DateTime<Utc>,
}

impl DashboardView {
    /// Read everything the dashboard shows from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store propagates backend failures.
    pub fn load<B: SlotBackend>(store: &Store<B>) -> Result<Self> {
        Ok(Self {
            incidents: store.list_incidents()?,
            messages: store.list_messages()?,
            settings: store.settings()?,
            session: store.session()?,
            loaded_at: Utc::now(),
        })
    }

    /// The first few active incidents, in insertion order.
    #[must_use]
    pub fn active_incidents(&self) -> Vec<&Incident> {
        self.incidents
            .iter()
            .filter(|i| i.status == Status::Active)
            .take(ACTIVE_PREVIEW_LIMIT)
            .collect()
    }

    /// Responders assigned across all incidents.
    #[must_use]
    pub fn responders_deployed(&self) -> u64 {
        self.incidents
            .iter()
            .map(|i| u64::from(i.responders))
            .sum()
    }

    /// Aggregate figures for the loaded incidents.
    #[must_use]
    pub fn summary(&self) -> IncidentSummary {
        IncidentSummary::from_incidents(&self.incidents)
    }

    /// One-line status banner.
    #[must_use]
    pub fn status_line(&self) -> String {
        let active = self
            .incidents
            .iter()
            .filter(|i| i.status == Status::Active)
            .count();
        format!(
            "{} Active Incidents • {} Responders Deployed • {} Messages",
            active,
            self.responders_deployed(),
            self.messages.len()
        )
    }
}

/// A handle to stop a running refresh loop.
///
/// Cloneable; every clone shares the same signal.
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle {
    stop_signal: Arc<AtomicBool>,
}

impl RefreshHandle {
    /// Create a handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the loop to stop at its next tick.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Reset the stop signal.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }
}

/// Re-read the store every `period` while auto-refresh is enabled.
///
/// The first tick fires immediately. Settings are re-read on every tick, so
/// switching `autoRefresh` off pauses the callbacks without ending the loop.
/// Returns the number of refreshes once `handle` is stopped.
///
/// # Errors
///
/// Returns an error if `period` is zero, or when the store propagates
/// backend failures.
pub async fn run_refresh_loop<B, F>(
    store: &Store<B>,
    period: Duration,
    handle: &RefreshHandle,
    mut on_refresh: F,
) -> Result<u64>
where
    B: SlotBackend,
    F: FnMut(&DashboardView),
{
    if period.is_zero() {
        return Err(Error::ConfigValidation {
            message: "refresh period must be greater than 0".to_string(),
        });
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refreshes = 0;

    loop {
        interval.tick().await;
        if handle.should_stop() {
            break;
        }

        if !store.settings()?.auto_refresh {
            trace!("Auto-refresh disabled, skipping tick");
            continue;
        }

        let view = DashboardView::load(store)?;
        refreshes += 1;
        on_refresh(&view);
    }

    debug!("Refresh loop stopped after {} refreshes", refreshes);
    Ok(refreshes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{NewIncident, Severity};
    use crate::seed::seed_defaults;

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        seed_defaults(&mut store).unwrap();
        store
    }

    #[test]
    fn test_view_load() {
        let store = seeded_store();
        let view = DashboardView::load(&store).unwrap();

        assert_eq!(view.incidents.len(), 5);
        assert_eq!(view.messages.len(), 5);
        assert_eq!(view.settings, UserSettings::default());
        assert!(!view.session.is_authenticated());
    }

    #[test]
    fn test_view_active_and_responders() {
        let store = seeded_store();
        let view = DashboardView::load(&store).unwrap();

        assert_eq!(view.active_incidents().len(), 2);
        assert_eq!(view.responders_deployed(), 36);
        assert_eq!(view.summary().resolved, 2);
        assert!(view
            .status_line()
            .starts_with("2 Active Incidents • 36 Responders Deployed"));
    }

    #[test]
    fn test_active_preview_is_capped() {
        let mut store = Store::open_in_memory().unwrap();
        for _ in 0..ACTIVE_PREVIEW_LIMIT + 2 {
            store
                .add_incident(NewIncident {
                    kind: "Fire".to_string(),
                    location: "X".to_string(),
                    severity: Severity::Low,
                    time: "09:00".to_string(),
                    responders: 1,
                    status: Status::Active,
                    description: String::new(),
                    coordinates: None,
                })
                .unwrap();
        }
        let view = DashboardView::load(&store).unwrap();
        assert_eq!(view.active_incidents().len(), ACTIVE_PREVIEW_LIMIT);
    }

    #[test]
    fn test_refresh_handle() {
        let handle = RefreshHandle::new();
        let clone = handle.clone();
        assert!(!handle.should_stop());

        clone.stop();
        assert!(handle.should_stop());

        handle.reset();
        assert!(!clone.should_stop());
    }

    #[tokio::test]
    async fn test_refresh_loop_runs_until_stopped() {
        let store = seeded_store();
        let handle = RefreshHandle::new();
        let mut seen = Vec::new();

        let refreshes = run_refresh_loop(&store, Duration::from_millis(5), &handle, |view| {
            seen.push(view.incidents.len());
            if seen.len() == 3 {
                handle.stop();
            }
        })
        .await
        .unwrap();

        assert_eq!(refreshes, 3);
        assert_eq!(seen, vec![5, 5, 5]);
    }

    #[tokio::test]
    async fn test_refresh_loop_rejects_zero_period() {
        let store = seeded_store();
        let result = run_refresh_loop(&store, Duration::ZERO, &RefreshHandle::new(), |_| {}).await;
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[tokio::test]
    async fn test_refresh_loop_stopped_before_start() {
        let store = seeded_store();
        let handle = RefreshHandle::new();
        handle.stop();

        let refreshes = run_refresh_loop(&store, Duration::from_millis(5), &handle, |_| {})
            .await
            .unwrap();
        assert_eq!(refreshes, 0);
    }

    #[tokio::test]
    async fn test_refresh_loop_idle_when_auto_refresh_off() {
        let mut store = seeded_store();
        store
            .save_settings(&UserSettings {
                auto_refresh: false,
                ..UserSettings::default()
            })
            .unwrap();
        let handle = RefreshHandle::new();
        let mut calls = 0;

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            run_refresh_loop(&store, Duration::from_millis(5), &handle, |_| calls += 1),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(calls, 0);
    }
}
