use super::*;

use std::time::Duration;

use tokio::time::timeout;

fn march() -> Period {
    Period::new(3, 2024).expect("period")
}

fn records() -> Vec<Record> {
    vec![
        Record::new("Ana", "Triagem")
            .with_status("Alta")
            .with_entry("2024-03-05"),
        Record::new("Bruno", "Triagem")
            .with_status("Internado")
            .with_entry("2024-04-15T12:00:00"),
        Record::new("Carla", "Observação"),
    ]
}

#[test]
fn new_session_starts_empty() {
    let session = Session::new(march());
    assert!(session.records().is_empty());
    assert_eq!(session.period(), march());
    assert!(session.view().is_empty());
}

#[test]
fn sink_replaces_records_wholesale() {
    let session = Session::new(march());
    session.receive(records());
    assert_eq!(session.records().len(), 3);

    session.receive(vec![Record::new("Davi", "Sala")]);
    let current = session.records();
    let names: Vec<&str> = current.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Davi"]);
}

#[test]
fn view_follows_period_changes() {
    let session = Session::new(march());
    session.receive(records());

    let view = session.view();
    assert_eq!(view.filtered.len(), 1);
    assert_eq!(view.by_status.get("Alta"), Some(&1));

    session.set_period(Period::new(4, 2024).expect("period"));
    let view = session.view();
    assert_eq!(view.filtered.len(), 1);
    assert_eq!(view.by_status.get("Internado"), Some(&1));
    assert_eq!(session.records().len(), 3);
}

#[tokio::test]
async fn watcher_recomputes_on_each_change() {
    let session = Session::new(march());
    let mut watcher = session.subscribe();

    session.receive(records());
    let view = timeout(Duration::from_secs(1), watcher.changed())
        .await
        .expect("records change observed")
        .expect("session alive");
    assert_eq!(view.filtered.len(), 1);

    session.set_period(Period::new(4, 2024).expect("period"));
    let view = timeout(Duration::from_secs(1), watcher.changed())
        .await
        .expect("period change observed")
        .expect("session alive");
    assert_eq!(view.by_sector.get("Triagem"), Some(&1));
    assert_eq!(view.filtered[0].name, "Bruno");
}

#[tokio::test]
async fn watcher_ends_when_session_dropped() {
    let session = Session::new(march());
    let mut watcher = session.subscribe();
    drop(session);
    assert!(watcher.changed().await.is_none());
}
