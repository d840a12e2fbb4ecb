use serde_json::json;
use storage::{JsonFileStore, SessionStore, Storage, StoreDocument};
use tally_core::model::{AnswerEvent, AnswerKind, QuestionMeta, Session};
use tally_core::time::{default_offset, fixed_clock};

fn session(subject: &str, correct: u32, incorrect: u32) -> Session {
    Session::new(
        fixed_clock().local_now(default_offset()),
        subject,
        "Caderno",
        correct,
        incorrect,
    )
}

#[tokio::test]
async fn append_round_trips_through_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let store = JsonFileStore::new(&path);

    let first = session("Law", 1, 1);
    let second = session("Math", 7, 3);
    let event = AnswerEvent::new(
        AnswerKind::Correct,
        fixed_clock().local_now(default_offset()),
        QuestionMeta::default()
            .with_subject("Math")
            .with_extra("id", "42"),
    );

    store.append(first, Vec::new()).await.unwrap();
    store.append(second.clone(), vec![event.clone()]).await.unwrap();

    let reopened = JsonFileStore::new(&path);
    let sessions = reopened.load().await;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.last(), Some(&second));
    assert_eq!(reopened.history().await, vec![event]);
    assert!(!dir.path().join("sessions.json.tmp").exists());
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path().join("absent.json"));

    assert_eq!(store.load_document().await, StoreDocument::default());
}

#[tokio::test]
async fn corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    std::fs::write(&path, b"{\"sessions\": [").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(store.load().await.is_empty());
    assert!(store.history().await.is_empty());
}

#[tokio::test]
async fn legacy_list_is_upgraded_on_next_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let legacy = json!([
        {"date": "01/01/2023 10:00", "materia": "Math", "caderno": "x", "acertos": 5, "erros": 5}
    ]);
    std::fs::write(&path, legacy.to_string()).unwrap();

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load().await.len(), 1);

    store.append(session("Law", 2, 0), Vec::new()).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["sessions"].as_array().map(Vec::len), Some(2));
    assert_eq!(raw["sessions"][0]["total"], json!(10));
    assert_eq!(raw["sessions"][0]["taxa_acerto"], json!(50.0));
    assert_eq!(raw["history"], json!([]));
}

#[tokio::test]
async fn delete_at_length_leaves_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let store = JsonFileStore::new(&path);
    store.append(session("Math", 1, 0), Vec::new()).await.unwrap();
    let before = std::fs::read(&path).unwrap();

    let removed = store.delete_at(1).await.unwrap();

    assert!(removed.is_none());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn json_file_storage_creates_empty_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("sessions.json");

    let storage = Storage::json_file(&path).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw, json!({"sessions": [], "history": []}));
    assert!(storage.sessions.load().await.is_empty());
}

#[tokio::test]
async fn unreadable_entries_survive_append() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.json");
    let law = json!({"date": "2024-03-05 10:00", "materia": "Law", "caderno": "", "acertos": 1, "erros": 0});
    let event = json!({"tipo": "acerto", "timestamp": "05/03/2024 10:00", "questao": {"subject": "Law"}});
    let raw = json!({
        "sessions": [
            law,
            {"date": "05/03/2024 10:00", "materia": "Math", "caderno": "", "acertos": 2, "erros": 1}
        ],
        "history": [event]
    });
    std::fs::write(&path, raw.to_string()).unwrap();

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load().await.len(), 1);

    store.append(session("Geo", 1, 1), Vec::new()).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let materias: Vec<_> = written["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["materia"].clone())
        .collect();
    assert_eq!(materias, vec![json!("Law"), json!("Math"), json!("Geo")]);
    assert_eq!(written["sessions"][0], law);
    assert_eq!(written["history"], json!([event]));

    let subjects: Vec<_> = store
        .load()
        .await
        .iter()
        .map(|s| s.subject().to_owned())
        .collect();
    assert_eq!(subjects, vec!["Math", "Geo"]);
}
