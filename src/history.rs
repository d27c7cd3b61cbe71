use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persist::KvStore;
use crate::state::PredictionResult;
use crate::workflow::Outcome;

pub const HISTORY_KEY: &str = "prediction_history";
pub const MAX_HISTORY: usize = 10;
pub const EMPTY_HISTORY: &str = "No predictions yet. Make your first prediction above!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub fighter1: String,
    pub fighter2: String,
    #[serde(flatten)]
    pub result: PredictionResult,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_outcome(outcome: &Outcome) -> Self {
        Self {
            fighter1: outcome.request.fighter1.clone(),
            fighter2: outcome.request.fighter2.clone(),
            result: outcome.result.clone(),
            timestamp: outcome.captured_at,
        }
    }
}

/// Newest first, never longer than `MAX_HISTORY`.
pub fn prepend(mut prior: Vec<HistoryEntry>, entry: HistoryEntry) -> Vec<HistoryEntry> {
    prior.insert(0, entry);
    prior.truncate(MAX_HISTORY);
    prior
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    store: KvStore,
}

impl HistoryStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self.store.get(HISTORY_KEY).unwrap_or_default();
        entries.truncate(MAX_HISTORY);
        entries
    }

    // TODO: route writes through a single writer so two running terminals
    // sharing a state file stop losing each other's entries.
    pub fn save(&self, entry: HistoryEntry) -> Result<Vec<HistoryEntry>> {
        let updated = prepend(self.load(), entry);
        self.store.set(HISTORY_KEY, &updated)?;
        Ok(updated)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(HISTORY_KEY)
    }
}

pub fn summary_line(entry: &HistoryEntry) -> String {
    format!(
        "{} | {} vs {} | Win Probability: {:.1}% | {}",
        entry.result.winner,
        entry.fighter1,
        entry.fighter2,
        entry.result.win_probability * 100.0,
        entry.timestamp.format("%Y-%m-%d")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub lines: Vec<String>,
    pub show_clear: bool,
}

pub fn history_view(entries: &[HistoryEntry]) -> HistoryView {
    if entries.is_empty() {
        return HistoryView {
            lines: vec![EMPTY_HISTORY.to_string()],
            show_clear: false,
        };
    }
    HistoryView {
        lines: entries.iter().map(summary_line).collect(),
        show_clear: true,
    }
}
