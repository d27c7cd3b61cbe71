//! Prediction request lifecycle: `Idle -> Loading -> {Result, Error}`.
//!
//! Transitions are plain methods taking the current `Instant`, so the whole
//! machine runs without a terminal. Rendering reads `Workflow::phase` and
//! `prediction_view`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::directory::{FighterDirectory, normalize_name};
use crate::state::{PredictionRequest, PredictionResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter both fighter names")]
    MissingFighter,
    #[error("Please select two different fighters")]
    SameFighter,
    #[error("One or both fighters not found. Try selecting from the suggestions.")]
    UnknownFighter,
    #[error("Both fighters must compete in {0}. Please check their weight classes.")]
    WeightClassMismatch(String),
}

/// A successful prediction together with what was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub request: PredictionRequest,
    pub result: PredictionResult,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Loading {
        submission: u64,
        request: PredictionRequest,
    },
    Result(Outcome),
    Error {
        message: String,
        since: Instant,
    },
}

#[derive(Debug)]
pub struct Workflow {
    phase: Phase,
    last_submission: u64,
    error_dismiss: Option<Duration>,
}

pub fn validate(
    fighter1: &str,
    fighter2: &str,
    weight_class: Option<&str>,
    directory: &FighterDirectory,
) -> Result<PredictionRequest, ValidationError> {
    let fighter1 = fighter1.trim();
    let fighter2 = fighter2.trim();
    if fighter1.is_empty() || fighter2.is_empty() {
        return Err(ValidationError::MissingFighter);
    }
    if normalize_name(fighter1) == normalize_name(fighter2) {
        return Err(ValidationError::SameFighter);
    }
    let (Some(first), Some(second)) = (directory.resolve(fighter1), directory.resolve(fighter2))
    else {
        return Err(ValidationError::UnknownFighter);
    };
    let weight_class = weight_class.map(str::trim).filter(|c| !c.is_empty());
    if let Some(class) = weight_class {
        let competes = |classes: &[String]| classes.iter().any(|c| c == class);
        if !competes(&first.weight_classes) || !competes(&second.weight_classes) {
            return Err(ValidationError::WeightClassMismatch(class.to_string()));
        }
    }
    Ok(PredictionRequest {
        fighter1: first.name.clone(),
        fighter2: second.name.clone(),
        weight_class: weight_class.unwrap_or_default().to_string(),
    })
}

impl Workflow {
    pub fn new(error_dismiss: Option<Duration>) -> Self {
        Self {
            phase: Phase::Idle,
            last_submission: 0,
            error_dismiss,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// True while `submission` is the request the UI is waiting on.
    pub fn is_current(&self, submission: u64) -> bool {
        matches!(self.phase, Phase::Loading { submission: s, .. } if s == submission)
    }

    /// Validates the inputs and enters `Loading`, or `Error` on failure.
    /// A submit while already loading supersedes the outstanding request.
    pub fn submit(
        &mut self,
        fighter1: &str,
        fighter2: &str,
        weight_class: Option<&str>,
        directory: &FighterDirectory,
        now: Instant,
    ) -> Result<(u64, PredictionRequest), ValidationError> {
        match validate(fighter1, fighter2, weight_class, directory) {
            Ok(request) => {
                self.last_submission += 1;
                self.phase = Phase::Loading {
                    submission: self.last_submission,
                    request: request.clone(),
                };
                Ok((self.last_submission, request))
            }
            Err(err) => {
                self.phase = Phase::Error {
                    message: err.to_string(),
                    since: now,
                };
                Err(err)
            }
        }
    }

    /// Lands a response. Responses for superseded submissions are dropped
    /// and reported as `false`.
    pub fn resolve(
        &mut self,
        submission: u64,
        response: Result<PredictionResult, String>,
        now: Instant,
    ) -> bool {
        if !self.is_current(submission) {
            return false;
        }
        let Phase::Loading { request, .. } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return false;
        };
        self.phase = match response {
            Ok(result) => Phase::Result(Outcome {
                request,
                result,
                captured_at: Utc::now(),
            }),
            Err(message) => Phase::Error {
                message,
                since: now,
            },
        };
        true
    }

    /// Auto-hides a stale error banner.
    pub fn tick(&mut self, now: Instant) {
        let Some(dismiss) = self.error_dismiss else {
            return;
        };
        if let Phase::Error { since, .. } = self.phase {
            if now.saturating_duration_since(since) >= dismiss {
                self.phase = Phase::Idle;
            }
        }
    }

    pub fn dismiss(&mut self) {
        if matches!(self.phase, Phase::Error { .. }) {
            self.phase = Phase::Idle;
        }
    }
}

pub fn confidence_label(level: f64) -> &'static str {
    if level > 0.4 {
        "High"
    } else if level > 0.2 {
        "Medium"
    } else {
        "Low"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub sentence: String,
    pub confidence: String,
    /// Input order, each with its win chance in percent.
    pub split: [(String, f64); 2],
    pub weight_class: String,
    pub method: String,
    pub model_confidences: String,
    pub order_randomized: String,
}

pub fn prediction_view(outcome: &Outcome, qualitative_confidence: bool) -> PredictionView {
    let request = &outcome.request;
    let result = &outcome.result;
    let win_pct = result.win_probability * 100.0;
    let lose_pct = (1.0 - result.win_probability) * 100.0;
    let confidence_pct = result.confidence_level * 100.0;

    let confidence = if qualitative_confidence {
        format!(
            "Confidence: {} confidence ({confidence_pct:.1}%)",
            confidence_label(result.confidence_level)
        )
    } else {
        format!("Confidence Level: {confidence_pct:.1}%")
    };

    let first_won = normalize_name(&result.winner) == normalize_name(&request.fighter1);
    let (first_pct, second_pct) = if first_won {
        (win_pct, lose_pct)
    } else {
        (lose_pct, win_pct)
    };

    let details = &result.model_details;
    PredictionView {
        sentence: format!(
            "{} is predicted to win with {win_pct:.1}% probability",
            result.winner
        ),
        confidence,
        split: [
            (request.fighter1.clone(), first_pct),
            (request.fighter2.clone(), second_pct),
        ],
        weight_class: format!("Weight Class: {}", result.weight_class),
        method: format!("Prediction Method: {}", details.method()),
        model_confidences: format!(
            "Red Model Confidence: {:.1}% | Blue Model Confidence: {:.1}%",
            details.red_confidence() * 100.0,
            details.blue_confidence() * 100.0
        ),
        order_randomized: format!(
            "Fighter Order Randomized: {}",
            if result.fighter_order_randomized {
                "Yes"
            } else {
                "No"
            }
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_thresholds_are_exclusive() {
        assert_eq!(confidence_label(0.41), "High");
        assert_eq!(confidence_label(0.4), "Medium");
        assert_eq!(confidence_label(0.21), "Medium");
        assert_eq!(confidence_label(0.2), "Low");
        assert_eq!(confidence_label(0.0), "Low");
    }
}
