//! Example data for a fresh dashboard.

use tracing::info;

use crate::error::Result;
use crate::incident::{NewIncident, Severity, Status};
use crate::message::{NewMessage, Priority};
use crate::storage::{SlotBackend, Store};

/// Add the example incidents and messages to an empty, never-seeded store.
///
/// Returns whether anything was added. Once seeded, the store's initialized
/// flag keeps this from running again until the store is reset.
///
/// # Errors
///
/// Returns an error only when the store propagates backend failures.
pub fn seed_defaults<B: SlotBackend>(store: &mut Store<B>) -> Result<bool> {
    if store.is_initialized()? || !store.list_incidents()?.is_empty() {
        return Ok(false);
    }

    let incidents = default_incidents();
    let incident_count = incidents.len();
    for incident in incidents {
        store.add_incident(incident)?;
    }

    let mut message_count = 0;
    if store.list_messages()?.is_empty() {
        for message in default_messages() {
            store.add_message(message)?;
            message_count += 1;
        }
    }

    store.mark_initialized()?;
    info!(
        "Seeded {} example incidents and {} example messages",
        incident_count, message_count
    );
    Ok(true)
}

fn incident(
    kind: &str,
    location: &str,
    severity: Severity,
    time: &str,
    responders: u32,
    status: Status,
    description: &str,
) -> NewIncident {
    NewIncident {
        kind: kind.to_string(),
        location: location.to_string(),
        severity,
        time: time.to_string(),
        responders,
        status,
        description: description.to_string(),
        coordinates: None,
    }
}

/// The example incidents, in insertion order.
#[must_use]
pub fn default_incidents() -> Vec<NewIncident> {
    vec![
        incident(
            "Fire",
            "Downtown District - Main Street 123",
            Severity::High,
            "14:32",
            8,
            Status::Active,
            "Large building fire with potential for spread to adjacent structures. Multiple units responding.",
        ),
        incident(
            "Medical",
            "Residential Area - Oak Avenue 456",
            Severity::Medium,
            "15:45",
            3,
            Status::InProgress,
            "Cardiac emergency, patient stabilized and being transported to hospital.",
        ),
        incident(
            "Accident",
            "Highway 101 - Mile Marker 15",
            Severity::Low,
            "16:12",
            4,
            Status::Active,
            "Multi-vehicle accident, minor injuries reported. Traffic being diverted.",
        ),
        incident(
            "Natural Disaster",
            "Riverside Park Area",
            Severity::Critical,
            "13:20",
            15,
            Status::Resolved,
            "Flash flood warning issued. Area evacuated successfully, no casualties reported.",
        ),
        incident(
            "Security",
            "City Hall - Government District",
            Severity::Medium,
            "11:30",
            6,
            Status::Resolved,
            "Suspicious package reported. Bomb squad cleared the area, false alarm confirmed.",
        ),
    ]
}

fn message(from: &str, body: &str, time: &str, priority: Priority, channel: &str) -> NewMessage {
    NewMessage {
        from: from.to_string(),
        message: body.to_string(),
        time: time.to_string(),
        priority,
        channel: channel.to_string(),
    }
}

/// The example messages, in the order they are added.
///
/// Each is put at the front of the history, so the first one here ends up
/// last.
#[must_use]
pub fn default_messages() -> Vec<NewMessage> {
    vec![
        message(
            "Fire Chief",
            "Unit 7 requesting backup at downtown incident. Fire spreading to adjacent building.",
            "16:45",
            Priority::High,
            "Fire Ops",
        ),
        message(
            "Medical Team 3",
            "Patient stabilized, en route to General Hospital. ETA 10 minutes.",
            "16:42",
            Priority::Medium,
            "Medical",
        ),
        message(
            "Police Captain",
            "Traffic diverted from Highway 101, all clear. Tow trucks en route.",
            "16:38",
            Priority::Low,
            "Police",
        ),
        message(
            "Rescue Team 1",
            "Search area secured, no additional casualties found. Standing by for further orders.",
            "16:35",
            Priority::Medium,
            "Command",
        ),
        message(
            "Command Center",
            "All units, weather alert issued. Thunderstorms expected in 2 hours.",
            "16:30",
            Priority::Medium,
            "Command",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_fresh_store() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(seed_defaults(&mut store).unwrap());

        let incidents = store.list_incidents().unwrap();
        assert_eq!(incidents.len(), 5);
        assert_eq!(incidents[0].kind, "Fire");

        let messages = store.list_messages().unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].from, "Command Center");
        assert_eq!(messages[4].from, "Fire Chief");
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_seed_runs_once() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(seed_defaults(&mut store).unwrap());
        assert!(!seed_defaults(&mut store).unwrap());
        assert_eq!(store.list_incidents().unwrap().len(), 5);
    }

    #[test]
    fn test_seed_skipped_when_flag_set_even_if_empty() {
        let mut store = Store::open_in_memory().unwrap();
        seed_defaults(&mut store).unwrap();
        for incident in store.list_incidents().unwrap() {
            store.delete_incident(&incident.id).unwrap();
        }
        assert!(!seed_defaults(&mut store).unwrap());
        assert!(store.list_incidents().unwrap().is_empty());
    }

    #[test]
    fn test_seed_again_after_reset() {
        let mut store = Store::open_in_memory().unwrap();
        seed_defaults(&mut store).unwrap();
        store.reset_all().unwrap();
        assert!(seed_defaults(&mut store).unwrap());
        assert_eq!(store.list_messages().unwrap().len(), 5);
    }

    #[test]
    fn test_seed_keeps_existing_messages() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .add_message(message("Ops", "hello", "09:00", Priority::Low, "Command"))
            .unwrap();
        assert!(seed_defaults(&mut store).unwrap());
        assert_eq!(store.list_messages().unwrap().len(), 1);
        assert_eq!(store.list_incidents().unwrap().len(), 5);
    }
}
