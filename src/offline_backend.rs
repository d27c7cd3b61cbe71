use std::cell::RefCell;
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{BackendError, PredictionBackend};
use crate::directory::normalize_name;
use crate::state::{
    Comparison, DatasetStats, Fighter, FighterStats, HealthStatus, ModelDetails,
    PredictionRequest, PredictionResult,
};

const MIXED_WEIGHT_CLASS: &str = "Mixed";

/// A pre-scored matchup. `probability` is the winner's chance.
#[derive(Debug, Clone)]
pub struct CannedPrediction {
    pub fighter1: String,
    pub fighter2: String,
    pub winner: String,
    pub probability: f64,
    pub confidence: f64,
    pub details: ModelDetails,
}

/// Answers the service interface from an in-memory roster. Known matchups
/// return their canned prediction; anything else is scored at random.
pub struct OfflineBackend {
    roster: Vec<Fighter>,
    canned: Vec<CannedPrediction>,
    rng: RefCell<StdRng>,
    latency: Duration,
}

impl OfflineBackend {
    pub fn new(roster: Vec<Fighter>, canned: Vec<CannedPrediction>, seed: u64) -> Self {
        Self {
            roster,
            canned,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
        }
    }

    /// Demo roster with the simulated service delay.
    pub fn demo() -> Self {
        let mut backend = Self::new(demo_roster(), demo_predictions(), rand::random());
        backend.latency = Duration::from_millis(1500);
        backend
    }

    fn find(&self, name: &str) -> Option<&Fighter> {
        let key = normalize_name(name);
        self.roster.iter().find(|f| normalize_name(&f.name) == key)
    }

    fn canned_for(&self, fighter1: &str, fighter2: &str) -> Option<&CannedPrediction> {
        let (a, b) = (normalize_name(fighter1), normalize_name(fighter2));
        self.canned.iter().find(|c| {
            let (x, y) = (normalize_name(&c.fighter1), normalize_name(&c.fighter2));
            (x == a && y == b) || (x == b && y == a)
        })
    }

    fn generated(&self, fighter1: &str, fighter2: &str) -> (String, f64, ModelDetails) {
        let mut rng = self.rng.borrow_mut();
        let probability = 0.55 + rng.gen_range(0.0..0.3);
        let winner = if rng.gen_bool(0.5) { fighter1 } else { fighter2 };
        let details = ModelDetails {
            red_model_confidence: Some(0.6 + rng.gen_range(0.0..0.3)),
            blue_model_confidence: Some(0.6 + rng.gen_range(0.0..0.3)),
            prediction_method: Some(
                if rng.gen_bool(0.5) {
                    "weighted"
                } else {
                    "simple_average"
                }
                .to_string(),
            ),
        };
        (winner.to_string(), probability, details)
    }
}

impl PredictionBackend for OfflineBackend {
    fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: None,
            models_loaded: true,
        })
    }

    fn dataset_stats(&self) -> Result<DatasetStats, BackendError> {
        let classes: BTreeSet<&str> = self
            .roster
            .iter()
            .flat_map(|f| f.weight_classes.iter().map(String::as_str))
            .collect();
        Ok(DatasetStats {
            total_fights: self.canned.len() as u64,
            total_fighters: self.roster.len() as u64,
            weight_classes: classes.len() as u64,
        })
    }

    fn weight_classes(&self) -> Result<Vec<String>, BackendError> {
        let classes: BTreeSet<&str> = self
            .roster
            .iter()
            .flat_map(|f| f.weight_classes.iter().map(String::as_str))
            .collect();
        Ok(classes.into_iter().map(str::to_string).collect())
    }

    fn fighters(&self, weight_class: Option<&str>) -> Result<Vec<String>, BackendError> {
        Ok(self
            .roster
            .iter()
            .filter(|f| match weight_class {
                Some(class) => f.weight_classes.iter().any(|c| c == class),
                None => true,
            })
            .map(|f| f.name.clone())
            .collect())
    }

    fn fighter_weight_classes(&self, name: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .find(name)
            .map(|f| f.weight_classes.clone())
            .unwrap_or_default())
    }

    fn compare(&self, fighter1: &str, fighter2: &str) -> Result<Comparison, BackendError> {
        let (Some(a), Some(b)) = (self.find(fighter1), self.find(fighter2)) else {
            return Err(BackendError::service(
                404,
                Some("One or both fighters not found".to_string()),
                "",
            ));
        };
        Ok(Comparison {
            fighter1: synthetic_stats(&a.name),
            fighter2: synthetic_stats(&b.name),
        })
    }

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, BackendError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if normalize_name(&request.fighter1) == normalize_name(&request.fighter2) {
            return Err(BackendError::service(
                400,
                Some("Cannot predict a fighter against themselves".to_string()),
                "",
            ));
        }
        let (Some(first), Some(second)) = (self.find(&request.fighter1), self.find(&request.fighter2))
        else {
            return Err(BackendError::service(
                404,
                Some("One or both fighters not found in processed data".to_string()),
                "",
            ));
        };

        let (winner, probability, confidence_level, details) =
            match self.canned_for(&first.name, &second.name) {
                Some(canned) => (
                    canned.winner.clone(),
                    canned.probability,
                    canned.confidence,
                    canned.details.clone(),
                ),
                None => {
                    let (winner, probability, details) =
                        self.generated(&first.name, &second.name);
                    (winner, probability, (probability - 0.5).abs() * 2.0, details)
                }
            };
        let weight_class = if request.weight_class.is_empty() {
            MIXED_WEIGHT_CLASS.to_string()
        } else {
            request.weight_class.clone()
        };

        Ok(PredictionResult {
            prediction: format!(
                "{winner} is predicted to win with {:.1}% probability",
                probability * 100.0
            ),
            winner,
            win_probability: probability,
            confidence_level,
            weight_class,
            fighter_order_randomized: self.rng.borrow_mut().gen_bool(0.5),
            model_details: details,
        })
    }
}

/// Career numbers derived from the name alone, so repeated lookups agree.
fn synthetic_stats(name: &str) -> FighterStats {
    let seed = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    let mut rng = StdRng::seed_from_u64(seed);
    let career_fights = rng.gen_range(5..=30);
    let career_wins = rng.gen_range(career_fights / 2..=career_fights);
    FighterStats {
        name: name.to_string(),
        career_wins,
        career_losses: career_fights - career_wins,
        win_rate: f64::from(career_wins) / f64::from(career_fights),
        career_fights,
        avg_strikes: rng.gen_range(20.0..80.0),
        avg_takedowns: rng.gen_range(0.0..4.0),
        avg_knockdowns: rng.gen_range(0.0..1.0),
    }
}

fn fighter(name: &str, classes: &[&str]) -> Fighter {
    Fighter {
        name: name.to_string(),
        weight_classes: classes.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn demo_roster() -> Vec<Fighter> {
    vec![
        fighter("Jon Jones", &["Light Heavyweight", "Heavyweight"]),
        fighter("Daniel Cormier", &["Light Heavyweight", "Heavyweight"]),
        fighter("Conor McGregor", &["Featherweight", "Lightweight", "Welterweight"]),
        fighter("Nate Diaz", &["Lightweight", "Welterweight"]),
        fighter("Anderson Silva", &["Middleweight", "Light Heavyweight"]),
        fighter("Chael Sonnen", &["Middleweight", "Light Heavyweight"]),
        fighter("Francis Ngannou", &["Heavyweight"]),
        fighter("Stipe Miocic", &["Heavyweight"]),
        fighter("Khabib Nurmagomedov", &["Lightweight"]),
        fighter("Tony Ferguson", &["Lightweight"]),
        fighter("Israel Adesanya", &["Middleweight", "Light Heavyweight"]),
        fighter("Robert Whittaker", &["Middleweight"]),
        fighter("Kamaru Usman", &["Welterweight"]),
        fighter("Colby Covington", &["Welterweight"]),
        fighter("Max Holloway", &["Featherweight"]),
        fighter("Alexander Volkanovski", &["Featherweight"]),
        fighter("Aljamain Sterling", &["Bantamweight"]),
        fighter("Petr Yan", &["Bantamweight"]),
        fighter("Deiveson Figueiredo", &["Flyweight"]),
        fighter("Brandon Moreno", &["Flyweight"]),
    ]
}

fn canned(
    matchup: (&str, &str),
    probability: f64,
    confidence: f64,
    (red, blue, method): (f64, f64, &str),
) -> CannedPrediction {
    CannedPrediction {
        fighter1: matchup.0.to_string(),
        fighter2: matchup.1.to_string(),
        winner: matchup.0.to_string(),
        probability,
        confidence,
        details: ModelDetails {
            red_model_confidence: Some(red),
            blue_model_confidence: Some(blue),
            prediction_method: Some(method.to_string()),
        },
    }
}

pub fn demo_predictions() -> Vec<CannedPrediction> {
    vec![
        canned(("Jon Jones", "Daniel Cormier"), 0.652, 0.304, (0.73, 0.69, "weighted")),
        canned(("Conor McGregor", "Nate Diaz"), 0.589, 0.178, (0.61, 0.58, "simple_average")),
        canned(("Anderson Silva", "Chael Sonnen"), 0.734, 0.468, (0.78, 0.72, "weighted")),
        canned(("Francis Ngannou", "Stipe Miocic"), 0.612, 0.224, (0.65, 0.62, "simple_average")),
        canned(("Khabib Nurmagomedov", "Tony Ferguson"), 0.687, 0.374, (0.71, 0.68, "weighted")),
        canned(("Israel Adesanya", "Robert Whittaker"), 0.623, 0.246, (0.64, 0.61, "simple_average")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_stats_are_stable_per_name() {
        let a = synthetic_stats("Jon Jones");
        let b = synthetic_stats("Jon Jones");
        assert_eq!(a, b);
        assert_eq!(a.career_wins + a.career_losses, a.career_fights);
        assert!((0.0..=1.0).contains(&a.win_rate));
    }

    #[test]
    fn self_matchup_is_rejected() {
        let backend = OfflineBackend::new(demo_roster(), demo_predictions(), 1);
        let err = backend
            .predict(&PredictionRequest {
                fighter1: "Jon Jones".to_string(),
                fighter2: "jon jones".to_string(),
                weight_class: String::new(),
            })
            .expect_err("same fighter");
        assert!(matches!(err, BackendError::Service { status: 400, .. }));
    }

    #[test]
    fn canned_matchups_keep_their_numbers() {
        let backend = OfflineBackend::new(demo_roster(), demo_predictions(), 1);
        let result = backend
            .predict(&PredictionRequest {
                fighter1: "Tony Ferguson".to_string(),
                fighter2: "Khabib Nurmagomedov".to_string(),
                weight_class: "Lightweight".to_string(),
            })
            .expect("canned");
        assert_eq!(result.winner, "Khabib Nurmagomedov");
        assert!((result.confidence_level - 0.374).abs() < 1e-9);
        assert_eq!(result.model_details.method(), "weighted");
    }
}
