use chrono::{TimeZone, Utc};

use octagon_terminal::history::{
    EMPTY_HISTORY, HISTORY_KEY, HistoryEntry, HistoryStore, MAX_HISTORY, history_view, prepend,
    summary_line,
};
use octagon_terminal::persist::KvStore;
use octagon_terminal::state::PredictionResult;

fn entry(n: u32) -> HistoryEntry {
    HistoryEntry {
        fighter1: format!("Fighter {n}"),
        fighter2: "Opponent".to_string(),
        result: PredictionResult {
            prediction: String::new(),
            winner: format!("Fighter {n}"),
            win_probability: 0.6,
            confidence_level: 0.2,
            weight_class: "Lightweight".to_string(),
            fighter_order_randomized: false,
            model_details: Default::default(),
        },
        timestamp: Utc
            .with_ymd_and_hms(2024, 3, 9, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

#[test]
fn prepend_keeps_newest_first_and_caps() {
    let mut entries = Vec::new();
    for n in 0..12 {
        entries = prepend(entries, entry(n));
    }
    assert_eq!(entries.len(), MAX_HISTORY);
    assert_eq!(entries[0].fighter1, "Fighter 11");
    assert_eq!(entries[MAX_HISTORY - 1].fighter1, "Fighter 2");
}

#[test]
fn saves_survive_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let store = HistoryStore::new(KvStore::at(&path));
    for n in 0..11 {
        store.save(entry(n)).expect("save");
    }

    let reopened = HistoryStore::new(KvStore::at(&path));
    let loaded = reopened.load();
    assert_eq!(loaded.len(), 10);
    assert_eq!(loaded[0].fighter1, "Fighter 10");
    assert_eq!(loaded[9].fighter1, "Fighter 1");
}

#[test]
fn clear_shows_empty_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = KvStore::at(dir.path().join("state.json"));
    kv.set("theme", &"dark").expect("theme");
    let store = HistoryStore::new(kv.clone());
    store.save(entry(1)).expect("save");
    assert!(history_view(&store.load()).show_clear);

    store.clear().expect("clear");
    let view = history_view(&store.load());
    assert_eq!(view.lines, vec![EMPTY_HISTORY.to_string()]);
    assert!(!view.show_clear);
    assert!(kv.get::<serde_json::Value>(HISTORY_KEY).is_none());
    assert_eq!(kv.get::<String>("theme").as_deref(), Some("dark"));
}

#[test]
fn summary_line_format() {
    assert_eq!(
        summary_line(&entry(3)),
        "Fighter 3 | Fighter 3 vs Opponent | Win Probability: 60.0% | 2024-03-09"
    );
}

#[test]
fn stored_entries_flatten_the_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = KvStore::at(dir.path().join("state.json"));
    HistoryStore::new(kv.clone()).save(entry(7)).expect("save");
    let raw: Vec<serde_json::Value> = kv.get(HISTORY_KEY).expect("history present");
    assert_eq!(raw[0]["winner"], "Fighter 7");
    assert_eq!(raw[0]["fighter1"], "Fighter 7");
    assert!(raw[0]["timestamp"].is_string());
}
