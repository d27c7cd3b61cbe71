use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::Utc;
use octagon_terminal::autocomplete::suggest;
use octagon_terminal::comparison::normalize;
use octagon_terminal::directory::FighterDirectory;
use octagon_terminal::history::{HistoryEntry, MAX_HISTORY, prepend};
use octagon_terminal::state::{Comparison, Fighter, FighterStats, PredictionResult};

const CLASSES: [&str; 8] = [
    "Flyweight",
    "Bantamweight",
    "Featherweight",
    "Lightweight",
    "Welterweight",
    "Middleweight",
    "Light Heavyweight",
    "Heavyweight",
];

fn large_directory(n: usize) -> FighterDirectory {
    let fighters = (0..n)
        .map(|i| Fighter {
            name: format!("Fighter {i:05} Surname{}", i % 97),
            weight_classes: vec![CLASSES[i % CLASSES.len()].to_string()],
        })
        .collect();
    FighterDirectory::from_fighters(fighters)
}

fn stats(name: &str, scale: f64) -> FighterStats {
    FighterStats {
        name: name.to_string(),
        career_wins: 20,
        career_losses: 4,
        win_rate: 0.83 * scale,
        career_fights: 24,
        avg_strikes: 50.0 * scale,
        avg_takedowns: 2.5 * scale,
        avg_knockdowns: 0.4 * scale,
    }
}

fn entry(i: usize) -> HistoryEntry {
    HistoryEntry {
        fighter1: format!("Fighter {i}"),
        fighter2: "Opponent".to_string(),
        result: PredictionResult {
            prediction: String::new(),
            winner: format!("Fighter {i}"),
            win_probability: 0.6,
            confidence_level: 0.2,
            weight_class: "Lightweight".to_string(),
            fighter_order_randomized: false,
            model_details: Default::default(),
        },
        timestamp: Utc::now(),
    }
}

fn bench_suggest(c: &mut Criterion) {
    let dir = large_directory(4000);
    c.bench_function("suggest_unfiltered", |b| {
        b.iter(|| suggest(black_box(&dir), black_box("surname4"), None, 10).count())
    });
    c.bench_function("suggest_by_class", |b| {
        b.iter(|| {
            suggest(
                black_box(&dir),
                black_box("surname9"),
                Some("Heavyweight"),
                10,
            )
            .count()
        })
    });
    c.bench_function("suggest_no_match", |b| {
        b.iter(|| suggest(black_box(&dir), black_box("zzzz"), None, 10).count())
    });
}

fn bench_history_and_radar(c: &mut Criterion) {
    let full: Vec<HistoryEntry> = (0..MAX_HISTORY).map(entry).collect();
    c.bench_function("history_prepend_full", |b| {
        b.iter(|| prepend(black_box(full.clone()), entry(99)))
    });

    let cmp = Comparison {
        fighter1: stats("A", 1.0),
        fighter2: stats("B", 0.7),
    };
    c.bench_function("radar_normalize", |b| b.iter(|| normalize(black_box(&cmp))));
}

criterion_group!(benches, bench_suggest, bench_history_and_radar);
criterion_main!(benches);
