use std::path::Path;

use dispatchboard::incident::Coordinates;
use dispatchboard::seed::seed_defaults;
use dispatchboard::session::TRIAL_PLAN;
use dispatchboard::settings::Theme;
use dispatchboard::{
    IncidentPatch, NewIncident, NewMessage, PersistencePolicy, Priority, Session, Severity,
    Status, Store, User, UserSettings,
};
use tempfile::tempdir;

fn open(path: &Path) -> Store {
    Store::open(path, PersistencePolicy::Propagate).expect("open store")
}

fn incident(kind: &str) -> NewIncident {
    NewIncident {
        kind: kind.to_string(),
        location: "Harbor Road 12".to_string(),
        severity: Severity::Medium,
        time: "08:30".to_string(),
        responders: 2,
        status: Status::Active,
        description: "Reported by passer-by".to_string(),
        coordinates: Some(Coordinates {
            lat: 52.37,
            lng: 4.89,
        }),
    }
}

fn broadcast(n: usize) -> NewMessage {
    NewMessage {
        from: "Dispatch".to_string(),
        message: format!("update {n}"),
        time: "08:31".to_string(),
        priority: Priority::Low,
        channel: "Command".to_string(),
    }
}

#[test]
fn records_survive_reopen() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("nested").join("dashboard.db");

    let added = {
        let mut store = open(&path);
        let added = store.add_incident(incident("Fire")).expect("add");
        store.add_message(broadcast(1)).expect("message");
        store
            .save_settings(&UserSettings {
                theme: Theme::Light,
                ..UserSettings::default()
            })
            .expect("settings");
        store
            .save_user(&User::new("Dana", "dana@example.org"))
            .expect("user");
        added
    };

    let store = open(&path);
    assert_eq!(store.get_incident(&added.id).expect("get"), Some(added));
    assert_eq!(store.list_messages().expect("messages").len(), 1);
    assert_eq!(store.settings().expect("settings").theme, Theme::Light);
    assert!(matches!(
        store.session().expect("session"),
        Session::Authenticated(user) if user.name == "Dana"
    ));
}

#[test]
fn update_changes_only_given_fields() {
    let dir = tempdir().expect("tmp");
    let mut store = open(&dir.path().join("dashboard.db"));
    let original = store.add_incident(incident("Medical")).expect("add");

    let updated = store
        .update_incident(
            &original.id,
            IncidentPatch {
                status: Some(Status::Resolved),
                responders: Some(0),
                ..IncidentPatch::default()
            },
        )
        .expect("update")
        .expect("present");

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at > original.updated_at);
    assert_eq!(updated.status, Status::Resolved);
    assert_eq!(updated.responders, 0);
    assert_eq!(updated.location, original.location);
    assert_eq!(updated.coordinates, original.coordinates);

    assert!(store
        .update_incident("INC-0-0", IncidentPatch::default())
        .expect("update")
        .is_none());
}

#[test]
fn deleting_keeps_other_incidents_in_order() {
    let dir = tempdir().expect("tmp");
    let mut store = open(&dir.path().join("dashboard.db"));
    let a = store.add_incident(incident("A")).expect("a");
    let b = store.add_incident(incident("B")).expect("b");
    let c = store.add_incident(incident("C")).expect("c");

    assert!(store.delete_incident(&b.id).expect("delete"));
    assert!(!store.delete_incident(&b.id).expect("delete again"));

    let ids: Vec<String> = store
        .list_incidents()
        .expect("list")
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec![a.id, c.id]);
}

#[test]
fn message_history_keeps_newest_hundred() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("dashboard.db");
    let mut store = open(&path);
    for n in 0..105 {
        store.add_message(broadcast(n)).expect("message");
    }
    drop(store);

    let messages = open(&path).list_messages().expect("messages");
    assert_eq!(messages.len(), 100);
    assert_eq!(messages[0].message, "update 104");
    assert_eq!(messages[99].message, "update 5");
}

#[test]
fn export_then_import_into_fresh_store() {
    let dir = tempdir().expect("tmp");
    let mut source = open(&dir.path().join("source.db"));
    source.add_incident(incident("Fire")).expect("add");
    source.add_incident(incident("Flood")).expect("add");
    source.add_message(broadcast(1)).expect("message");
    source
        .save_settings(&UserSettings {
            language: "de".to_string(),
            ..UserSettings::default()
        })
        .expect("settings");
    let document = source.export_all().expect("export");

    let mut target = open(&dir.path().join("target.db"));
    target.save_user(&User::new("Sam", "sam@example.org")).expect("user");
    assert!(target.import_all(&document).expect("import"));

    assert_eq!(
        target.list_incidents().expect("list"),
        source.list_incidents().expect("list")
    );
    assert_eq!(
        target.list_messages().expect("messages"),
        source.list_messages().expect("messages")
    );
    assert_eq!(target.settings().expect("settings").language, "de");
    // The session user is not part of an export.
    assert!(target.session().expect("session").is_authenticated());
}

#[test]
fn rejected_import_leaves_store_untouched() {
    let dir = tempdir().expect("tmp");
    let mut store = open(&dir.path().join("dashboard.db"));
    store.add_incident(incident("Fire")).expect("add");
    let before = store.export_all().expect("export");

    assert!(!store.import_all("not json at all").expect("import"));
    assert!(!store
        .import_all(r#"{"incidents": [{"id": "x"}], "messages": []}"#)
        .expect("import"));

    let after = store.snapshot().expect("snapshot");
    let before: serde_json::Value = serde_json::from_str(&before).expect("json");
    assert_eq!(
        serde_json::to_value(&after.incidents).expect("json"),
        before["incidents"]
    );
}

#[test]
fn corrupt_slot_reads_as_default() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("dashboard.db");
    {
        let mut store = open(&path);
        store.add_incident(incident("Fire")).expect("add");
    }

    let conn = rusqlite::Connection::open(&path).expect("raw open");
    conn.execute(
        "UPDATE slots SET value = '{broken' WHERE key = 'incidents'",
        [],
    )
    .expect("corrupt");
    drop(conn);

    let mut store = open(&path);
    assert!(store.list_incidents().expect("list").is_empty());
    store.add_incident(incident("Medical")).expect("add after corruption");
    assert_eq!(store.list_incidents().expect("list").len(), 1);
}

#[test]
fn plan_changes_need_a_signed_in_user() {
    let dir = tempdir().expect("tmp");
    let mut store = open(&dir.path().join("dashboard.db"));

    assert!(store.change_plan(TRIAL_PLAN).expect("plan").is_none());

    store
        .save_user(&User::from_email("lee@example.org"))
        .expect("user");
    let user = store.change_plan(TRIAL_PLAN).expect("plan").expect("user");
    assert_eq!(user.name, "lee");
    assert_eq!(store.session().expect("session").plan(), TRIAL_PLAN);

    store.clear_user().expect("logout");
    assert_eq!(store.session().expect("session"), Session::Anonymous);
}

#[test]
fn reset_erases_everything_and_allows_reseeding() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("dashboard.db");
    let mut store = open(&path);
    assert!(seed_defaults(&mut store).expect("seed"));
    store
        .save_user(&User::new("Ari", "ari@example.org"))
        .expect("user");

    store.reset_all().expect("reset");
    drop(store);

    let mut store = open(&path);
    assert!(store.list_incidents().expect("list").is_empty());
    assert!(store.list_messages().expect("messages").is_empty());
    assert_eq!(store.settings().expect("settings"), UserSettings::default());
    assert!(!store.session().expect("session").is_authenticated());

    assert!(seed_defaults(&mut store).expect("reseed"));
    assert_eq!(store.stats().expect("stats").total_incidents, 5);
}
