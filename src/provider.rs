use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::backend::PredictionBackend;
use crate::config::Variant;
use crate::state::{Delta, ProviderCommand};

/// Runs backend calls off the UI thread until the command channel closes.
pub fn spawn_provider(
    backend: Box<dyn PredictionBackend>,
    variant: Variant,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            if !handle_command(backend.as_ref(), variant, cmd, &tx) {
                break;
            }
        }
    })
}

/// Executes one command. Returns `false` once the UI side has hung up.
pub fn handle_command(
    backend: &dyn PredictionBackend,
    variant: Variant,
    cmd: ProviderCommand,
    tx: &Sender<Delta>,
) -> bool {
    match cmd {
        ProviderCommand::CheckHealth => match backend.health() {
            Ok(health) => {
                info!("backend status: {}", health.status);
                tx.send(Delta::Health(health)).is_ok()
            }
            Err(err) => {
                warn!("Health check failed: {err}");
                true
            }
        },
        ProviderCommand::FetchStats => match backend.dataset_stats() {
            Ok(stats) => tx.send(Delta::SetStats(stats)).is_ok(),
            Err(err) => {
                warn!("Error loading stats: {err}");
                true
            }
        },
        ProviderCommand::FetchWeightClasses => match backend.weight_classes() {
            Ok(classes) => tx.send(Delta::SetWeightClasses(classes)).is_ok(),
            Err(err) => {
                warn!("Error loading weight classes: {err}");
                true
            }
        },
        ProviderCommand::FetchFighters { weight_class } => {
            match backend.fighters(weight_class.as_deref()) {
                Ok(names) => {
                    info!(
                        "loaded {} fighters ({})",
                        names.len(),
                        weight_class.as_deref().unwrap_or("all weight classes")
                    );
                    tx.send(Delta::SetFighters {
                        weight_class,
                        names,
                    })
                    .is_ok()
                }
                Err(err) => {
                    warn!("Error loading fighters: {err}");
                    true
                }
            }
        }
        ProviderCommand::FetchFighterWeightClasses { slot, name } => {
            match backend.fighter_weight_classes(&name) {
                Ok(weight_classes) => tx
                    .send(Delta::SetFighterWeightClasses {
                        slot,
                        name,
                        weight_classes,
                    })
                    .is_ok(),
                Err(err) => {
                    warn!("Error loading fighter weight classes: {err}");
                    true
                }
            }
        }
        ProviderCommand::Predict {
            submission,
            request,
        } => {
            // Comparison goes out first; its failure never blocks the prediction.
            if variant.fetches_comparison() {
                let delta = match backend.compare(&request.fighter1, &request.fighter2) {
                    Ok(comparison) => Delta::SetComparison {
                        submission,
                        comparison,
                    },
                    Err(err) => Delta::ComparisonFailed {
                        submission,
                        message: err.to_string(),
                    },
                };
                if tx.send(delta).is_err() {
                    return false;
                }
            }
            let delta = match backend.predict(&request) {
                Ok(result) => {
                    info!(
                        "prediction: {} ({:.3})",
                        result.winner, result.win_probability
                    );
                    Delta::PredictionReady { submission, result }
                }
                Err(err) => {
                    warn!("Error in prediction: {err}");
                    Delta::PredictionFailed {
                        submission,
                        message: err.to_string(),
                    }
                }
            };
            tx.send(delta).is_ok()
        }
    }
}
