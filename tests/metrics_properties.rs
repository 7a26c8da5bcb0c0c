//! Property-Based Tests for the metrics engine
//!
//! Tests the following invariants:
//! - Range: rates and efficiencies stay in [0, 1], fluency in [0, 100]
//! - Determinism: identical logs give identical metric sets, in parallel or not
//! - Sample accounting: appending later events never shrinks a measured sample size
//! - Value hygiene: every measured value is finite

use proptest::prelude::*;

use assessment_metrics::schema::{
    ClickInteraction, EventLog, KeyEventType, KeyboardEvent, MovementSample, ResponseEvent,
    StimulusPresentation,
};
use assessment_metrics::{
    compute_assessment_metrics, score_attention_test, EngineConfig, MetricKey,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

const TARGETS: [&str; 3] = ["opt-a", "opt-b", "opt-c"];
const QUESTIONS: [&str; 2] = ["q1", "q2"];
const KEYS: [&str; 8] = ["a", "e", "t", " ", "Enter", "Backspace", "Shift", "Delete"];

fn arb_question() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (0usize..QUESTIONS.len()).prop_map(|i| Some(QUESTIONS[i].to_string())),
    ]
}

fn arb_movement() -> impl Strategy<Value = MovementSample> {
    (
        0.0f64..1920.0, // x
        0.0f64..1080.0, // y
        0u32..60_000,   // timestamp
        proptest::option::of(0usize..TARGETS.len()),
        arb_question(),
    )
        .prop_map(|(x, y, t, target, question_id)| MovementSample {
            x,
            y,
            timestamp: t as f64,
            target_id: target.map(|i| TARGETS[i].to_string()),
            question_id,
        })
}

fn arb_click() -> impl Strategy<Value = ClickInteraction> {
    (
        0usize..TARGETS.len(),
        (0.0f64..1920.0, 0.0f64..1080.0), // click point
        (0.0f64..1920.0, 0.0f64..1080.0), // target center
        0u32..60_000,
        arb_question(),
    )
        .prop_map(|(target, click, center, t, question_id)| ClickInteraction {
            target_id: TARGETS[target].to_string(),
            target_type: "button".to_string(),
            question_id,
            click_x: click.0,
            click_y: click.1,
            target_x: center.0,
            target_y: center.1,
            timestamp: t as f64,
        })
}

fn arb_key_event() -> impl Strategy<Value = KeyboardEvent> {
    (any::<bool>(), 0usize..KEYS.len(), 0u32..60_000, arb_question()).prop_map(
        |(down, k, t, question_id)| KeyboardEvent {
            event_type: if down {
                KeyEventType::KeyDown
            } else {
                KeyEventType::KeyUp
            },
            key: KEYS[k].to_string(),
            is_modifier: KEYS[k] == "Shift",
            timestamp: t as f64,
            question_id,
        },
    )
}

fn arb_event_log() -> impl Strategy<Value = EventLog> {
    (
        prop::collection::vec(arb_movement(), 0..60),
        prop::collection::vec(arb_click(), 0..10),
        prop::collection::vec(arb_key_event(), 0..80),
    )
        .prop_map(|(movements, interactions, keyboard_events)| EventLog {
            movements,
            interactions,
            keyboard_events,
            ..Default::default()
        })
}

fn stimuli_for(targets: &[bool]) -> Vec<StimulusPresentation> {
    targets
        .iter()
        .enumerate()
        .map(|(i, &is_target)| StimulusPresentation {
            value: if is_target { "X".to_string() } else { "O".to_string() },
            is_target,
            presented_at: i as f64 * 1000.0,
        })
        .collect()
}

fn response(index: u32, is_target: bool, rt: f64) -> ResponseEvent {
    ResponseEvent {
        stimulus_value: if is_target { "X".to_string() } else { "O".to_string() },
        is_target,
        response_time: rt,
        stimulus_index: index,
    }
}

type AttentionRun = (Vec<StimulusPresentation>, Vec<ResponseEvent>);

/// Responses may point past the last stimulus or disagree with it
fn arb_noisy_attention_run() -> impl Strategy<Value = AttentionRun> {
    prop::collection::vec(any::<bool>(), 0..40)
        .prop_flat_map(|targets| {
            let n = targets.len() as u32;
            let responses =
                prop::collection::vec((0..n + 3, any::<bool>(), 0.0f64..2000.0), 0..50);
            (Just(targets), responses)
        })
        .prop_map(|(targets, responses)| {
            let responses = responses
                .into_iter()
                .map(|(index, is_target, rt)| response(index, is_target, rt))
                .collect();
            (stimuli_for(&targets), responses)
        })
}

/// Every response refers to a presented stimulus and agrees with it
fn arb_clean_attention_run() -> impl Strategy<Value = AttentionRun> {
    prop::collection::vec(any::<bool>(), 1..40)
        .prop_flat_map(|targets| {
            let n = targets.len() as u32;
            let responses = prop::collection::vec((0..n, 0.0f64..2000.0), 0..50);
            (Just(targets), responses)
        })
        .prop_map(|(targets, responses)| {
            let responses = responses
                .into_iter()
                .map(|(index, rt)| response(index, targets[index as usize], rt))
                .collect();
            (stimuli_for(&targets), responses)
        })
}

/// Shift every timestamp so the events start after `offset`
fn shifted(log: &EventLog, offset: f64) -> EventLog {
    let mut later = log.clone();
    for m in &mut later.movements {
        m.timestamp += offset;
    }
    for c in &mut later.interactions {
        c.timestamp += offset;
    }
    for k in &mut later.keyboard_events {
        k.timestamp += offset;
    }
    later
}

const UNIT_INTERVAL_METRICS: [MetricKey; 6] = [
    MetricKey::ClickPrecision,
    MetricKey::PathEfficiency,
    MetricKey::OvershootRate,
    MetricKey::PauseRate,
    MetricKey::DeepThinkingPauseRate,
    MetricKey::ImmediateCorrectionTendency,
];

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_metric_ranges(log in arb_event_log()) {
        let metrics = compute_assessment_metrics(&log, &EngineConfig::default());

        for set in std::iter::once(&metrics.global).chain(metrics.questions.values()) {
            for key in UNIT_INTERVAL_METRICS {
                if let Some(v) = set.get(key).value() {
                    prop_assert!((0.0..=1.0).contains(&v), "{} = {}", key, v);
                }
            }
            if let Some(v) = set.get(MetricKey::FluencyScore).value() {
                prop_assert!((0.0..=100.0).contains(&v), "fluency = {}", v);
            }
            for (key, v) in set.measured() {
                prop_assert!(v.is_finite() && v >= 0.0, "{} = {}", key, v);
            }
        }
    }

    #[test]
    fn prop_attention_rates_bounded((stimuli, responses) in arb_noisy_attention_run()) {
        let result = score_attention_test(&stimuli, &responses);

        for rate in [
            result.detection_rate,
            result.omission_error_rate,
            result.commission_error_rate,
        ] {
            prop_assert!((0.0..=1.0).contains(&rate), "rate = {}", rate);
        }
        if let Some(sd) = result.reaction_time_sd.value() {
            prop_assert!(sd >= 0.0);
        }
    }

    #[test]
    fn prop_attention_counts_consistent((stimuli, responses) in arb_clean_attention_run()) {
        let result = score_attention_test(&stimuli, &responses);

        prop_assert_eq!(
            result.correct_detections + result.omission_errors,
            result.total_targets
        );
        prop_assert!(result.commission_errors <= result.total_non_targets);
        prop_assert!(
            (result.detection_rate + result.omission_error_rate - 1.0).abs() < 1e-9
                || result.total_targets == 0
        );
        prop_assert_eq!(result.average_reaction_time.sample_size, result.correct_detections);
    }

    #[test]
    fn prop_deterministic(log in arb_event_log()) {
        let parallel = EngineConfig::default();
        let sequential = EngineConfig { parallel: false, ..EngineConfig::default() };

        let first = compute_assessment_metrics(&log, &parallel);
        prop_assert_eq!(&first, &compute_assessment_metrics(&log, &parallel));
        prop_assert_eq!(&first, &compute_assessment_metrics(&log, &sequential));
    }

    #[test]
    fn prop_appending_never_shrinks_sample_size(
        log in arb_event_log(),
        extra in arb_event_log(),
    ) {
        let config = EngineConfig::default();
        let before = compute_assessment_metrics(&log, &config);

        // Later events continue the same session
        let tail = shifted(&extra, 100_000.0);
        let mut combined = log.clone();
        combined.movements.extend(tail.movements);
        combined.interactions.extend(tail.interactions);
        combined.keyboard_events.extend(tail.keyboard_events);
        let after = compute_assessment_metrics(&combined, &config);

        let scopes = std::iter::once((None, &before.global))
            .chain(before.questions.iter().map(|(q, set)| (Some(q.as_str()), set)));
        for (question, set) in scopes {
            let later = match question {
                None => &after.global,
                Some(q) => &after.questions[q],
            };
            for (key, result) in set.entries() {
                if result.calculated {
                    prop_assert!(
                        later.get(key).sample_size >= result.sample_size,
                        "{} shrank from {} to {}",
                        key,
                        result.sample_size,
                        later.get(key).sample_size
                    );
                }
            }
        }
    }
}
