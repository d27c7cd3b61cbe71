use std::time::{Duration, Instant};

use octagon_terminal::config::Variant;
use octagon_terminal::history::HistoryStore;
use octagon_terminal::persist::KvStore;
use octagon_terminal::state::{
    AppState, Comparison, Delta, FighterSlot, FighterStats, Focus, PredictionResult,
    ProviderCommand, apply_delta,
};
use octagon_terminal::workflow::{Phase, Workflow};

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn loaded_state(variant: Variant) -> AppState {
    let mut state = AppState::new(variant, Workflow::new(None));
    apply_delta(
        &mut state,
        Delta::SetWeightClasses(names(&["Heavyweight", "Lightweight"])),
    );
    apply_delta(
        &mut state,
        Delta::SetFighters {
            weight_class: None,
            names: names(&[
                "Jon Jones",
                "Jon Fitch",
                "Daniel Cormier",
                "Stipe Miocic",
                "Khabib Nurmagomedov",
            ]),
        },
    );
    state
}

fn type_text(state: &mut AppState, text: &str) {
    for ch in text.chars() {
        state.type_char(ch);
    }
}

fn stats(name: &str) -> FighterStats {
    FighterStats {
        name: name.to_string(),
        career_wins: 10,
        career_losses: 2,
        win_rate: 0.83,
        career_fights: 12,
        avg_strikes: 40.0,
        avg_takedowns: 2.0,
        avg_knockdowns: 0.5,
    }
}

fn result(winner: &str) -> PredictionResult {
    PredictionResult {
        prediction: String::new(),
        winner: winner.to_string(),
        win_probability: 0.62,
        confidence_level: 0.24,
        weight_class: "Heavyweight".to_string(),
        fighter_order_randomized: false,
        model_details: Default::default(),
    }
}

fn submit_jones_cormier(state: &mut AppState) -> u64 {
    type_text(state, "Jon Jones");
    state.focus_next(Instant::now());
    type_text(state, "Daniel Cormier");
    match state.submit(Instant::now()) {
        Some(ProviderCommand::Predict { submission, .. }) => submission,
        other => panic!("expected predict command, got {other:?}"),
    }
}

#[test]
fn typing_offers_bounded_suggestions() {
    let mut state = loaded_state(Variant::Offline);
    type_text(&mut state, "j");
    assert!(!state.input(FighterSlot::First).suggestions.is_visible());
    type_text(&mut state, "on");
    let items = state.input(FighterSlot::First).suggestions.items().to_vec();
    assert_eq!(items, names(&["Jon Jones", "Jon Fitch"]));
}

#[test]
fn accepting_suggestion_fills_field_and_looks_up_classes() {
    let mut state = loaded_state(Variant::Live);
    type_text(&mut state, "corm");
    state.move_suggestion(1);
    assert!(state.has_highlighted_suggestion());
    let cmd = state.accept_suggestion();
    assert_eq!(
        cmd,
        Some(ProviderCommand::FetchFighterWeightClasses {
            slot: FighterSlot::First,
            name: "Daniel Cormier".to_string(),
        })
    );
    assert_eq!(state.input(FighterSlot::First).text, "Daniel Cormier");
    assert!(!state.input(FighterSlot::First).suggestions.is_visible());

    apply_delta(
        &mut state,
        Delta::SetFighterWeightClasses {
            slot: FighterSlot::First,
            name: "Daniel Cormier".to_string(),
            weight_classes: names(&["Heavyweight"]),
        },
    );
    assert_eq!(
        state.input(FighterSlot::First).weight_class_hint,
        Some(names(&["Heavyweight"]))
    );
}

#[test]
fn blur_keeps_panel_for_grace_period() {
    let mut state = loaded_state(Variant::Live);
    type_text(&mut state, "jon");
    let now = Instant::now();
    let cmd = state.focus_next(now);
    assert_eq!(cmd, None, "partial text resolves to no fighter");
    assert_eq!(state.focus, Focus::Fighter(FighterSlot::Second));

    state.tick(now + Duration::from_millis(100));
    assert!(state.input(FighterSlot::First).suggestions.is_visible());
    state.tick(now + Duration::from_millis(200));
    assert!(!state.input(FighterSlot::First).suggestions.is_visible());
}

#[test]
fn changing_weight_class_clears_inputs() {
    let mut state = loaded_state(Variant::Live);
    type_text(&mut state, "Jon Jones");
    state.focus = Focus::WeightClass;
    let cmd = state.cycle_weight_class(1);
    assert_eq!(
        cmd,
        Some(ProviderCommand::FetchFighters {
            weight_class: Some("Heavyweight".to_string()),
        })
    );
    assert_eq!(state.weight_class_label(), "Heavyweight");
    assert!(state.input(FighterSlot::First).text.is_empty());

    state.cycle_weight_class(-1);
    assert_eq!(state.weight_class_label(), "All Weight Classes");
    state.cycle_weight_class(-1);
    assert_eq!(state.weight_class_label(), "Lightweight");
}

#[test]
fn class_filter_requires_loaded_membership() {
    let mut state = loaded_state(Variant::Live);
    state.focus = Focus::WeightClass;
    state.cycle_weight_class(1);
    state.focus = Focus::Fighter(FighterSlot::First);
    type_text(&mut state, "Jon Jones");
    state.focus_next(Instant::now());
    type_text(&mut state, "Stipe Miocic");
    assert_eq!(state.submit(Instant::now()), None);
    assert!(matches!(state.workflow.phase(), Phase::Error { .. }));

    apply_delta(
        &mut state,
        Delta::SetFighters {
            weight_class: Some("Heavyweight".to_string()),
            names: names(&["Jon Jones", "Stipe Miocic"]),
        },
    );
    match state.submit(Instant::now()) {
        Some(ProviderCommand::Predict { request, .. }) => {
            assert_eq!(request.weight_class, "Heavyweight");
        }
        other => panic!("expected predict command, got {other:?}"),
    }
}

#[test]
fn stale_deltas_are_ignored() {
    let mut state = loaded_state(Variant::Live);
    let first = submit_jones_cormier(&mut state);
    let second = match state.submit(Instant::now()) {
        Some(ProviderCommand::Predict { submission, .. }) => submission,
        other => panic!("expected predict command, got {other:?}"),
    };

    apply_delta(
        &mut state,
        Delta::SetComparison {
            submission: first,
            comparison: Comparison {
                fighter1: stats("Jon Jones"),
                fighter2: stats("Daniel Cormier"),
            },
        },
    );
    assert!(state.comparison.is_none());
    apply_delta(
        &mut state,
        Delta::PredictionReady {
            submission: first,
            result: result("Jon Jones"),
        },
    );
    assert!(state.workflow.is_loading());

    apply_delta(
        &mut state,
        Delta::SetComparison {
            submission: second,
            comparison: Comparison {
                fighter1: stats("Jon Jones"),
                fighter2: stats("Daniel Cormier"),
            },
        },
    );
    assert!(state.comparison.is_some());
    apply_delta(
        &mut state,
        Delta::PredictionReady {
            submission: second,
            result: result("Daniel Cormier"),
        },
    );
    assert!(matches!(state.workflow.phase(), Phase::Result(o) if o.result.winner == "Daniel Cormier"));
}

#[test]
fn failed_prediction_drops_comparison() {
    let mut state = loaded_state(Variant::Live);
    let id = submit_jones_cormier(&mut state);
    apply_delta(
        &mut state,
        Delta::SetComparison {
            submission: id,
            comparison: Comparison {
                fighter1: stats("Jon Jones"),
                fighter2: stats("Daniel Cormier"),
            },
        },
    );
    apply_delta(
        &mut state,
        Delta::PredictionFailed {
            submission: id,
            message: "Prediction failed".to_string(),
        },
    );
    assert!(state.comparison.is_none());
    assert!(matches!(state.workflow.phase(), Phase::Error { message, .. } if message == "Prediction failed"));
}

#[test]
fn save_and_clear_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = HistoryStore::new(KvStore::at(dir.path().join("state.json")));
    let mut state = loaded_state(Variant::Offline);

    assert!(!state.save_prediction(&store).expect("nothing to save"));
    let id = submit_jones_cormier(&mut state);
    apply_delta(
        &mut state,
        Delta::PredictionReady {
            submission: id,
            result: result("Jon Jones"),
        },
    );
    assert!(state.save_prediction(&store).expect("save"));
    assert_eq!(state.history.len(), 1);
    assert!(state.history_view().show_clear);

    state.request_clear_history();
    assert!(state.confirm_clear);
    state.resolve_clear_history(false, &store).expect("cancel");
    assert_eq!(state.history.len(), 1);

    state.request_clear_history();
    state.resolve_clear_history(true, &store).expect("clear");
    assert!(!state.confirm_clear);
    assert!(state.history.is_empty());
    assert!(!state.history_view().show_clear);
}

#[test]
fn weight_class_refresh_keeps_selection() {
    let mut state = loaded_state(Variant::Live);
    state.focus = Focus::WeightClass;
    state.cycle_weight_class(2);
    assert_eq!(state.selected_weight_class(), Some("Lightweight"));
    apply_delta(
        &mut state,
        Delta::SetWeightClasses(names(&["Flyweight", "Lightweight"])),
    );
    assert_eq!(state.selected_weight_class(), Some("Lightweight"));
    apply_delta(&mut state, Delta::SetWeightClasses(names(&["Flyweight"])));
    assert_eq!(state.selected_weight_class(), None);
}

#[test]
fn typed_name_gets_hint_regardless_of_case() {
    let mut state = loaded_state(Variant::Offline);
    type_text(&mut state, "jon jones");
    let cmd = state.focus_next(Instant::now());
    assert_eq!(
        cmd,
        Some(ProviderCommand::FetchFighterWeightClasses {
            slot: FighterSlot::First,
            name: "Jon Jones".to_string(),
        })
    );
    apply_delta(
        &mut state,
        Delta::SetFighterWeightClasses {
            slot: FighterSlot::First,
            name: "Jon Jones".to_string(),
            weight_classes: names(&["Light Heavyweight", "Heavyweight"]),
        },
    );
    assert_eq!(
        state.input(FighterSlot::First).weight_class_hint,
        Some(names(&["Light Heavyweight", "Heavyweight"]))
    );

    // Once the hint is known, leaving the field again does not repeat the lookup.
    state.focus = Focus::Fighter(FighterSlot::First);
    assert_eq!(state.focus_next(Instant::now()), None);
}

#[test]
fn vanished_weight_class_resets_inputs() {
    let mut state = loaded_state(Variant::Live);
    state.focus = Focus::WeightClass;
    state.cycle_weight_class(1);
    assert_eq!(state.selected_weight_class(), Some("Heavyweight"));
    state.focus = Focus::Fighter(FighterSlot::First);
    type_text(&mut state, "Jon Jones");

    apply_delta(
        &mut state,
        Delta::SetWeightClasses(names(&["Heavyweight", "Flyweight"])),
    );
    assert_eq!(state.input(FighterSlot::First).text, "Jon Jones");

    apply_delta(&mut state, Delta::SetWeightClasses(names(&["Flyweight"])));
    assert_eq!(state.selected_weight_class(), None);
    assert_eq!(state.weight_class_label(), "All Weight Classes");
    assert!(state.input(FighterSlot::First).text.is_empty());
    assert!(!state.input(FighterSlot::First).suggestions.is_visible());
}
