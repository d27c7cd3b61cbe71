use std::collections::VecDeque;
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::autocomplete::SuggestionPanel;
use crate::config::Variant;
use crate::directory::{FighterDirectory, normalize_name};
use crate::history::{self, HistoryEntry, HistoryStore};
use crate::theme::Theme;
use crate::workflow::{Phase, Workflow};

pub const ALL_WEIGHT_CLASSES: &str = "All Weight Classes";

const DEFAULT_RED_CONFIDENCE: f64 = 0.70;
const DEFAULT_BLUE_CONFIDENCE: f64 = 0.69;
const DEFAULT_METHOD: &str = "weighted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub name: String,
    #[serde(default)]
    pub weight_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub fighter1: String,
    pub fighter2: String,
    /// Empty means no weight-class filter.
    pub weight_class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub red_model_confidence: Option<f64>,
    #[serde(default)]
    pub blue_model_confidence: Option<f64>,
    #[serde(default)]
    pub prediction_method: Option<String>,
}

impl ModelDetails {
    pub fn red_confidence(&self) -> f64 {
        self.red_model_confidence.unwrap_or(DEFAULT_RED_CONFIDENCE)
    }

    pub fn blue_confidence(&self) -> f64 {
        self.blue_model_confidence.unwrap_or(DEFAULT_BLUE_CONFIDENCE)
    }

    pub fn method(&self) -> &str {
        self.prediction_method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_METHOD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default)]
    pub prediction: String,
    pub winner: String,
    pub win_probability: f64,
    pub confidence_level: f64,
    #[serde(default)]
    pub weight_class: String,
    #[serde(default)]
    pub fighter_order_randomized: bool,
    #[serde(default)]
    pub model_details: ModelDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterStats {
    pub name: String,
    #[serde(default)]
    pub career_wins: u32,
    #[serde(default)]
    pub career_losses: u32,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub career_fights: u32,
    #[serde(default)]
    pub avg_strikes: f64,
    #[serde(default)]
    pub avg_takedowns: f64,
    #[serde(default)]
    pub avg_knockdowns: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub fighter1: FighterStats,
    pub fighter2: FighterStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    #[serde(default)]
    pub total_fights: u64,
    #[serde(default)]
    pub total_fighters: u64,
    #[serde(default)]
    pub weight_classes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub models_loaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FighterSlot {
    First,
    Second,
}

impl FighterSlot {
    fn index(self) -> usize {
        match self {
            FighterSlot::First => 0,
            FighterSlot::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Fighter(FighterSlot),
    WeightClass,
}

#[derive(Debug, Clone, Default)]
pub struct FighterInput {
    pub text: String,
    pub suggestions: SuggestionPanel,
    /// Weight classes reported for the fighter currently in the field.
    pub weight_class_hint: Option<Vec<String>>,
}

impl FighterInput {
    fn reset(&mut self) {
        self.text.clear();
        self.suggestions.hide();
        self.weight_class_hint = None;
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    Health(HealthStatus),
    SetStats(DatasetStats),
    SetWeightClasses(Vec<String>),
    SetFighters {
        weight_class: Option<String>,
        names: Vec<String>,
    },
    SetFighterWeightClasses {
        slot: FighterSlot,
        name: String,
        weight_classes: Vec<String>,
    },
    SetComparison {
        submission: u64,
        comparison: Comparison,
    },
    ComparisonFailed {
        submission: u64,
        message: String,
    },
    PredictionReady {
        submission: u64,
        result: PredictionResult,
    },
    PredictionFailed {
        submission: u64,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    CheckHealth,
    FetchStats,
    FetchWeightClasses,
    FetchFighters {
        weight_class: Option<String>,
    },
    FetchFighterWeightClasses {
        slot: FighterSlot,
        name: String,
    },
    Predict {
        submission: u64,
        request: PredictionRequest,
    },
}

#[derive(Debug)]
pub struct AppState {
    pub variant: Variant,
    pub focus: Focus,
    pub inputs: [FighterInput; 2],
    pub weight_classes: Vec<String>,
    /// Index into `weight_classes`; `None` is "All".
    pub weight_class_selected: Option<usize>,
    pub directory: FighterDirectory,
    pub stats: Option<DatasetStats>,
    pub backend_healthy: Option<bool>,
    pub workflow: Workflow,
    pub comparison: Option<Comparison>,
    pub history: Vec<HistoryEntry>,
    pub confirm_clear: bool,
    pub show_model_details: bool,
    pub theme: Theme,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(variant: Variant, workflow: Workflow) -> Self {
        Self {
            variant,
            focus: Focus::Fighter(FighterSlot::First),
            inputs: [FighterInput::default(), FighterInput::default()],
            weight_classes: Vec::new(),
            weight_class_selected: None,
            directory: FighterDirectory::new(),
            stats: None,
            backend_healthy: None,
            workflow,
            comparison: None,
            history: Vec::new(),
            confirm_clear: false,
            show_model_details: false,
            theme: Theme::default(),
            help_overlay: false,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Commands issued once at startup.
    pub fn startup_commands(&self) -> Vec<ProviderCommand> {
        vec![
            ProviderCommand::CheckHealth,
            ProviderCommand::FetchWeightClasses,
            ProviderCommand::FetchFighters { weight_class: None },
            ProviderCommand::FetchStats,
        ]
    }

    pub fn input(&self, slot: FighterSlot) -> &FighterInput {
        &self.inputs[slot.index()]
    }

    fn input_mut(&mut self, slot: FighterSlot) -> &mut FighterInput {
        &mut self.inputs[slot.index()]
    }

    pub fn selected_weight_class(&self) -> Option<&str> {
        self.weight_class_selected
            .and_then(|idx| self.weight_classes.get(idx))
            .map(String::as_str)
    }

    pub fn weight_class_label(&self) -> &str {
        self.selected_weight_class().unwrap_or(ALL_WEIGHT_CLASSES)
    }

    pub fn type_char(&mut self, ch: char) {
        if let Focus::Fighter(slot) = self.focus {
            self.input_mut(slot).text.push(ch);
            self.refresh_suggestions(slot);
        }
    }

    pub fn backspace(&mut self) {
        if let Focus::Fighter(slot) = self.focus {
            self.input_mut(slot).text.pop();
            self.refresh_suggestions(slot);
        }
    }

    fn refresh_suggestions(&mut self, slot: FighterSlot) {
        let limit = self.variant.suggestion_limit();
        let class = self.selected_weight_class().map(str::to_string);
        let input = &mut self.inputs[slot.index()];
        input.weight_class_hint = None;
        input
            .suggestions
            .update(&self.directory, &input.text, class.as_deref(), limit);
    }

    /// Moves focus to the next field. Leaving a fighter field starts the
    /// suggestion panel's grace timer and may look up that fighter's classes.
    pub fn focus_next(&mut self, now: Instant) -> Option<ProviderCommand> {
        let next = match self.focus {
            Focus::Fighter(FighterSlot::First) => Focus::Fighter(FighterSlot::Second),
            Focus::Fighter(FighterSlot::Second) => Focus::WeightClass,
            Focus::WeightClass => Focus::Fighter(FighterSlot::First),
        };
        self.move_focus(next, now)
    }

    pub fn focus_prev(&mut self, now: Instant) -> Option<ProviderCommand> {
        let prev = match self.focus {
            Focus::Fighter(FighterSlot::First) => Focus::WeightClass,
            Focus::Fighter(FighterSlot::Second) => Focus::Fighter(FighterSlot::First),
            Focus::WeightClass => Focus::Fighter(FighterSlot::Second),
        };
        self.move_focus(prev, now)
    }

    fn move_focus(&mut self, to: Focus, now: Instant) -> Option<ProviderCommand> {
        let from = self.focus;
        self.focus = to;
        let Focus::Fighter(slot) = from else {
            return None;
        };
        let grace = self.variant.blur_grace();
        self.input_mut(slot).suggestions.blur(now, grace);
        self.weight_class_lookup(slot)
    }

    fn weight_class_lookup(&self, slot: FighterSlot) -> Option<ProviderCommand> {
        let input = self.input(slot);
        if input.weight_class_hint.is_some() {
            return None;
        }
        let fighter = self.directory.resolve(&input.text)?;
        Some(ProviderCommand::FetchFighterWeightClasses {
            slot,
            name: fighter.name.clone(),
        })
    }

    pub fn move_suggestion(&mut self, step: isize) {
        if let Focus::Fighter(slot) = self.focus {
            self.input_mut(slot).suggestions.move_selection(step);
        }
    }

    /// Closes the focused field's suggestion panel; `false` if none was open.
    pub fn dismiss_suggestions(&mut self) -> bool {
        let Focus::Fighter(slot) = self.focus else {
            return false;
        };
        let panel = &mut self.input_mut(slot).suggestions;
        if !panel.is_visible() {
            return false;
        }
        panel.hide();
        true
    }

    pub fn has_highlighted_suggestion(&self) -> bool {
        match self.focus {
            Focus::Fighter(slot) => self.input(slot).suggestions.highlighted().is_some(),
            Focus::WeightClass => false,
        }
    }

    /// Writes the highlighted suggestion into the focused field.
    pub fn accept_suggestion(&mut self) -> Option<ProviderCommand> {
        let Focus::Fighter(slot) = self.focus else {
            return None;
        };
        let name = self.input_mut(slot).suggestions.take_highlighted()?;
        let input = self.input_mut(slot);
        input.text = name.clone();
        input.weight_class_hint = None;
        Some(ProviderCommand::FetchFighterWeightClasses { slot, name })
    }

    /// Steps through the weight-class selector ("All" sits before the first
    /// class). Clears both fighters and reloads the directory for the class.
    pub fn cycle_weight_class(&mut self, step: isize) -> Option<ProviderCommand> {
        let total = self.weight_classes.len() as isize + 1;
        if total <= 1 {
            return None;
        }
        let current = self.weight_class_selected.map(|idx| idx as isize + 1).unwrap_or(0);
        let next = (current + step).rem_euclid(total);
        self.weight_class_selected = if next == 0 {
            None
        } else {
            Some((next - 1) as usize)
        };
        for input in &mut self.inputs {
            input.reset();
        }
        Some(ProviderCommand::FetchFighters {
            weight_class: self.selected_weight_class().map(str::to_string),
        })
    }

    pub fn submit(&mut self, now: Instant) -> Option<ProviderCommand> {
        let class = self.selected_weight_class().map(str::to_string);
        let outcome = self.workflow.submit(
            &self.inputs[0].text,
            &self.inputs[1].text,
            class.as_deref(),
            &self.directory,
            now,
        );
        for input in &mut self.inputs {
            input.suggestions.hide();
        }
        self.comparison = None;
        match outcome {
            Ok((submission, request)) => {
                info!(
                    "prediction request: {} vs {} ({})",
                    request.fighter1,
                    request.fighter2,
                    if request.weight_class.is_empty() {
                        "auto"
                    } else {
                        request.weight_class.as_str()
                    }
                );
                Some(ProviderCommand::Predict {
                    submission,
                    request,
                })
            }
            Err(err) => {
                warn!("validation failed: {err}");
                None
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        for input in &mut self.inputs {
            input.suggestions.tick(now);
        }
        self.workflow.tick(now);
    }

    pub fn toggle_model_details(&mut self) {
        self.show_model_details = !self.show_model_details;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    /// Returns `Ok(false)` when there is no prediction to save.
    pub fn save_prediction(&mut self, store: &HistoryStore) -> Result<bool> {
        let Phase::Result(outcome) = self.workflow.phase() else {
            return Ok(false);
        };
        let entry = HistoryEntry::from_outcome(outcome);
        self.history = store.save(entry)?;
        info!("Prediction saved to history");
        Ok(true)
    }

    pub fn request_clear_history(&mut self) {
        if !self.history.is_empty() {
            self.confirm_clear = true;
        }
    }

    pub fn resolve_clear_history(&mut self, confirmed: bool, store: &HistoryStore) -> Result<()> {
        self.confirm_clear = false;
        if !confirmed {
            return Ok(());
        }
        store.clear()?;
        self.history = store.load();
        info!("Prediction history cleared");
        Ok(())
    }

    pub fn history_view(&self) -> history::HistoryView {
        history::history_view(&self.history)
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Health(health) => {
            let healthy = health.status.eq_ignore_ascii_case("healthy");
            state.backend_healthy = Some(healthy && health.models_loaded);
        }
        Delta::SetStats(stats) => state.stats = Some(stats),
        Delta::SetWeightClasses(classes) => {
            let selected = state.selected_weight_class().map(str::to_string);
            state.weight_classes = classes;
            state.weight_class_selected = selected.as_deref().and_then(|sel| {
                state.weight_classes.iter().position(|c| c == sel)
            });
            if let (Some(gone), None) = (selected, state.weight_class_selected) {
                warn!("weight class {gone} is no longer offered; showing all weight classes");
                for input in &mut state.inputs {
                    input.reset();
                }
            }
        }
        Delta::SetFighters {
            weight_class,
            names,
        } => match weight_class {
            Some(class) => state.directory.record_class_members(&class, names),
            None => state.directory.replace_names(names),
        },
        Delta::SetFighterWeightClasses {
            slot,
            name,
            weight_classes,
        } => {
            state.directory.set_weight_classes(&name, weight_classes.clone());
            let input = state.input_mut(slot);
            // The field may have been edited while the lookup was in flight.
            if normalize_name(&input.text) == normalize_name(&name) {
                input.weight_class_hint = Some(weight_classes);
            }
        }
        Delta::SetComparison {
            submission,
            comparison,
        } => {
            if state.workflow.is_current(submission) {
                state.comparison = Some(comparison);
            }
        }
        Delta::ComparisonFailed {
            submission,
            message,
        } => {
            if state.workflow.is_current(submission) {
                warn!("Error loading fighter comparison: {message}");
            }
        }
        Delta::PredictionReady { submission, result } => {
            state.workflow.resolve(submission, Ok(result), Instant::now());
        }
        Delta::PredictionFailed {
            submission,
            message,
        } => {
            if state.workflow.resolve(submission, Err(message), Instant::now()) {
                state.comparison = None;
            }
        }
    }
}
