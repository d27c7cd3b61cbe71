use thiserror::Error;

use crate::directory::normalize_name;
use crate::state::{
    Comparison, DatasetStats, HealthStatus, PredictionRequest, PredictionResult,
};

pub const PREDICTION_FAILED: &str = "Prediction failed";
pub const COMPARISON_FAILED: &str = "Failed to load comparison data";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Non-success response; `message` is the service's own error text.
    #[error("{message}")]
    Service { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Parse(String),
}

impl BackendError {
    pub fn service(status: u16, message: Option<String>, fallback: &str) -> Self {
        BackendError::Service {
            status,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// The prediction service as seen by the client. `LiveBackend` talks HTTP;
/// `OfflineBackend` answers from fixtures.
pub trait PredictionBackend: Send {
    fn health(&self) -> Result<HealthStatus, BackendError>;
    fn dataset_stats(&self) -> Result<DatasetStats, BackendError>;
    fn weight_classes(&self) -> Result<Vec<String>, BackendError>;
    fn fighters(&self, weight_class: Option<&str>) -> Result<Vec<String>, BackendError>;
    fn fighter_weight_classes(&self, name: &str) -> Result<Vec<String>, BackendError>;
    fn compare(&self, fighter1: &str, fighter2: &str) -> Result<Comparison, BackendError>;
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, BackendError>;
}

/// Rejects results whose probabilities fall outside [0, 1].
pub fn check_result(result: PredictionResult) -> Result<PredictionResult, BackendError> {
    let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_unit(result.win_probability) {
        return Err(BackendError::Parse(format!(
            "win_probability {} outside [0, 1]",
            result.win_probability
        )));
    }
    if !in_unit(result.confidence_level) {
        return Err(BackendError::Parse(format!(
            "confidence_level {} outside [0, 1]",
            result.confidence_level
        )));
    }
    if result.winner.trim().is_empty() {
        return Err(BackendError::Parse("missing winner".to_string()));
    }
    Ok(result)
}

/// Rejects a winner that is neither of the requested fighters.
pub fn check_winner(
    request: &PredictionRequest,
    result: PredictionResult,
) -> Result<PredictionResult, BackendError> {
    let winner = normalize_name(&result.winner);
    let named = [&request.fighter1, &request.fighter2]
        .iter()
        .any(|name| normalize_name(name) == winner);
    if !named {
        return Err(BackendError::Parse(format!(
            "winner {} is not one of {} / {}",
            result.winner, request.fighter1, request.fighter2
        )));
    }
    Ok(result)
}

/// Weight classes as offered in the selector.
pub fn displayable_weight_classes(classes: Vec<String>) -> Vec<String> {
    classes
        .into_iter()
        .filter(|c| !c.trim().is_empty() && c != "Unknown")
        .collect()
}
