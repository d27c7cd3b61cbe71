use std::f64::consts::{FRAC_PI_2, TAU};

use crate::state::{Comparison, FighterStats};

pub const RADAR_LABELS: [&str; 5] = ["Win Rate", "Experience", "Striking", "Takedowns", "Knockdowns"];

#[derive(Debug, Clone, PartialEq)]
pub struct RadarSeries {
    pub name: String,
    /// One value per `RADAR_LABELS` entry, each in 0..=100.
    pub values: [f64; 5],
}

fn raw_metrics(stats: &FighterStats) -> [f64; 5] {
    [
        stats.win_rate,
        f64::from(stats.career_fights),
        stats.avg_strikes,
        stats.avg_takedowns,
        stats.avg_knockdowns,
    ]
}

/// Scales each metric against the larger of the pair so the leader sits at
/// 100. A metric both fighters score zero (or less) on maps to 0.
pub fn normalize(comparison: &Comparison) -> [RadarSeries; 2] {
    let first = raw_metrics(&comparison.fighter1);
    let second = raw_metrics(&comparison.fighter2);
    let mut scaled = [[0.0; 5]; 2];
    for i in 0..RADAR_LABELS.len() {
        let max = first[i].max(second[i]);
        if max > 0.0 && max.is_finite() {
            scaled[0][i] = (first[i] / max * 100.0).clamp(0.0, 100.0);
            scaled[1][i] = (second[i] / max * 100.0).clamp(0.0, 100.0);
        }
    }
    [
        RadarSeries {
            name: comparison.fighter1.name.clone(),
            values: scaled[0],
        },
        RadarSeries {
            name: comparison.fighter2.name.clone(),
            values: scaled[1],
        },
    ]
}

/// Direction of each spoke on the unit circle, first spoke pointing up,
/// proceeding clockwise.
pub fn spoke(i: usize) -> (f64, f64) {
    let angle = FRAC_PI_2 - TAU * i as f64 / RADAR_LABELS.len() as f64;
    (angle.cos(), angle.sin())
}

/// Polygon vertices for a series, radius 1.0 at a value of 100.
pub fn radar_vertices(series: &RadarSeries) -> Vec<(f64, f64)> {
    series
        .values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let (x, y) = spoke(i);
            let r = value / 100.0;
            (x * r, y * r)
        })
        .collect()
}

pub fn stat_lines(stats: &FighterStats) -> Vec<String> {
    vec![
        format!("Record: {}-{}", stats.career_wins, stats.career_losses),
        format!("Win Rate: {:.1}%", stats.win_rate * 100.0),
        format!("Career Fights: {}", stats.career_fights),
        format!("Avg Strikes: {:.2}", stats.avg_strikes),
        format!("Avg Takedowns: {:.2}", stats.avg_takedowns),
    ]
}
