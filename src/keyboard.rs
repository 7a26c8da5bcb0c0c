//! Keyboard dynamics
//!
//! Typing speed, inter-key rhythm, pause behavior, key hold statistics,
//! correction behavior and a composite fluency score.

use crate::config::EngineConfig;
use crate::pointer::in_scope;
use crate::schema::{KeyEventType, KeyboardEvent};
use crate::stats;
use crate::types::{KeyboardMetrics, MetricResult};
use std::collections::HashMap;
use tracing::debug;

/// Events required before any keyboard metric is attempted
const MIN_EVENTS: usize = 3;

/// Key-down events required for speed and correction metrics
const MIN_KEY_DOWNS: usize = 5;

/// Raw intervals required for rhythm statistics
const MIN_INTERVALS: usize = 3;

/// Raw intervals required for pause statistics
const MIN_PAUSE_INTERVALS: usize = 5;

/// Content characters required for correction metrics
const MIN_CONTENT_KEYS: usize = 3;

/// Intervals above `p95 * INTERVAL_OUTLIER_FACTOR` are dropped
const INTERVAL_OUTLIER_FACTOR: f64 = 1.5;

/// A correction this many key-downs after the previous one counts as immediate
const IMMEDIATE_CORRECTION_WINDOW: usize = 3;

/// Typing speed (keys/s) that saturates the speed component of fluency
const FLUENCY_SPEED_CEILING: f64 = 5.0;

/// Calculator for keyboard-derived metrics
pub struct KeyboardDynamicsCalculator;

impl KeyboardDynamicsCalculator {
    /// Compute keyboard metrics for one scope (`None` = global)
    pub fn calculate(
        events: &[KeyboardEvent],
        question_id: Option<&str>,
        config: &EngineConfig,
    ) -> KeyboardMetrics {
        let mut events: Vec<&KeyboardEvent> = events
            .iter()
            .filter(|e| in_scope(e.question_id.as_deref(), question_id))
            .filter(|e| e.timestamp.is_finite())
            .collect();

        // Stable: a key-down and key-up sharing a timestamp keep their order
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        if events.len() < MIN_EVENTS {
            debug!(
                scope = question_id.unwrap_or("global"),
                events = events.len(),
                "too few keyboard events"
            );
            return not_calculated(&events, config);
        }

        let key_downs: Vec<&KeyboardEvent> =
            events.iter().copied().filter(|e| e.is_key_down()).collect();
        let content_keys = key_downs.iter().filter(|e| e.is_content_key()).count();
        let intervals: Vec<f64> = key_downs
            .windows(2)
            .map(|w| w[1].timestamp - w[0].timestamp)
            .collect();

        let typing_speed = compute_typing_speed(&key_downs, content_keys);
        let (average_inter_key_interval, rhythm_variability) = compute_rhythm(&intervals);
        let (pause_rate, deep_thinking_pause_rate) = compute_pauses(&intervals, config);
        let (average_key_hold_time, key_press_variability) =
            compute_hold_statistics(&events, config);
        let (correction_rate, immediate_correction_tendency) =
            compute_corrections(&key_downs, content_keys);
        let fluency_score = compute_fluency(
            typing_speed,
            average_inter_key_interval,
            rhythm_variability,
            correction_rate,
            key_downs.len(),
        );

        KeyboardMetrics {
            typing_speed,
            average_inter_key_interval,
            rhythm_variability,
            pause_rate,
            deep_thinking_pause_rate,
            average_key_hold_time,
            key_press_variability,
            correction_rate,
            immediate_correction_tendency,
            fluency_score,
        }
    }
}

/// Every metric short-circuited, each keeping the count of its own samples
fn not_calculated(events: &[&KeyboardEvent], config: &EngineConfig) -> KeyboardMetrics {
    let key_downs = events.iter().filter(|e| e.is_key_down()).count();
    let content_keys = events
        .iter()
        .filter(|e| e.is_key_down() && e.is_content_key())
        .count();
    let plausible_holds = hold_durations(events)
        .into_iter()
        .filter(|&h| h >= config.hold_min_ms && h <= config.hold_max_ms)
        .count();

    let per_key_down = MetricResult::insufficient(key_downs);
    let intervals = MetricResult::insufficient(key_downs.saturating_sub(1));
    let holds = MetricResult::insufficient(plausible_holds);
    let corrections = MetricResult::insufficient(content_keys);

    KeyboardMetrics {
        typing_speed: per_key_down,
        average_inter_key_interval: intervals,
        rhythm_variability: intervals,
        pause_rate: intervals,
        deep_thinking_pause_rate: intervals,
        average_key_hold_time: holds,
        key_press_variability: holds,
        correction_rate: corrections,
        immediate_correction_tendency: corrections,
        fluency_score: per_key_down,
    }
}

/// Content keys per second between the first and last key-down
fn compute_typing_speed(key_downs: &[&KeyboardEvent], content_keys: usize) -> MetricResult {
    if key_downs.len() < MIN_KEY_DOWNS {
        return MetricResult::insufficient(key_downs.len());
    }
    let (Some(first), Some(last)) = (key_downs.first(), key_downs.last()) else {
        return MetricResult::insufficient(0);
    };
    let elapsed_sec = (last.timestamp - first.timestamp) / 1000.0;
    if elapsed_sec <= 0.0 {
        return MetricResult::insufficient(key_downs.len());
    }
    MetricResult::measured(content_keys as f64 / elapsed_sec, key_downs.len())
}

/// Mean inter-key interval and Bessel-corrected CV after dropping outliers
fn compute_rhythm(intervals: &[f64]) -> (MetricResult, MetricResult) {
    if intervals.len() < MIN_INTERVALS {
        let r = MetricResult::insufficient(intervals.len());
        return (r, r);
    }

    let filtered = stats::filter_above_percentile(intervals, 0.95, INTERVAL_OUTLIER_FACTOR);
    if filtered.len() < MIN_INTERVALS {
        let r = MetricResult::insufficient(intervals.len());
        return (r, r);
    }

    let average = match stats::mean(&filtered) {
        Some(m) => MetricResult::measured(m, intervals.len()),
        None => MetricResult::insufficient(intervals.len()),
    };
    let variability = match stats::sample_cv(&filtered) {
        Some(cv) => MetricResult::measured(cv, intervals.len()),
        None => MetricResult::insufficient(intervals.len()),
    };
    (average, variability)
}

/// Fraction of intervals above the dynamic pause threshold and above the
/// fixed deep-thinking threshold
fn compute_pauses(intervals: &[f64], config: &EngineConfig) -> (MetricResult, MetricResult) {
    if intervals.len() < MIN_PAUSE_INTERVALS {
        let r = MetricResult::insufficient(intervals.len());
        return (r, r);
    }
    let Some(mean_interval) = stats::mean(intervals) else {
        let r = MetricResult::insufficient(0);
        return (r, r);
    };

    let threshold = (3.0 * mean_interval).max(config.pause_floor_ms);
    let n = intervals.len() as f64;
    let pauses = intervals.iter().filter(|&&i| i > threshold).count();
    let deep = intervals.iter().filter(|&&i| i > config.deep_pause_ms).count();

    (
        MetricResult::measured(pauses as f64 / n, intervals.len()),
        MetricResult::measured(deep as f64 / n, intervals.len()),
    )
}

/// Hold durations: each key-down paired with the next key-up of the same key.
/// Repeated key-downs while a key is already held are ignored.
fn hold_durations(events: &[&KeyboardEvent]) -> Vec<f64> {
    let mut pressed: HashMap<&str, f64> = HashMap::new();
    let mut holds = Vec::new();

    for e in events {
        match e.event_type {
            KeyEventType::KeyDown => {
                pressed.entry(e.key.as_str()).or_insert(e.timestamp);
            }
            KeyEventType::KeyUp => {
                if let Some(down_at) = pressed.remove(e.key.as_str()) {
                    holds.push(e.timestamp - down_at);
                }
            }
        }
    }

    holds
}

/// Mean hold time and Bessel-corrected CV over plausible, IQR-filtered holds
fn compute_hold_statistics(
    events: &[&KeyboardEvent],
    config: &EngineConfig,
) -> (MetricResult, MetricResult) {
    let plausible: Vec<f64> = hold_durations(events)
        .into_iter()
        .filter(|&h| h >= config.hold_min_ms && h <= config.hold_max_ms)
        .collect();

    if plausible.len() < config.hold_iqr_min_samples {
        let r = MetricResult::insufficient(plausible.len());
        return (r, r);
    }

    let filtered = stats::iqr_filter(&plausible, 1.5);
    if filtered.len() < config.hold_min_filtered {
        let r = MetricResult::insufficient(plausible.len());
        return (r, r);
    }

    let average = match stats::mean(&filtered) {
        Some(m) => MetricResult::measured(m, plausible.len()),
        None => MetricResult::insufficient(plausible.len()),
    };
    let variability = match stats::sample_cv(&filtered) {
        Some(cv) => MetricResult::measured(cv, plausible.len()),
        None => MetricResult::insufficient(plausible.len()),
    };
    (average, variability)
}

/// Corrections per content character, and the share of corrections that
/// closely follow the previous one
fn compute_corrections(
    key_downs: &[&KeyboardEvent],
    content_keys: usize,
) -> (MetricResult, MetricResult) {
    if key_downs.len() < MIN_KEY_DOWNS || content_keys < MIN_CONTENT_KEYS {
        let r = MetricResult::insufficient(content_keys);
        return (r, r);
    }

    let mut corrections = 0usize;
    let mut immediate = 0usize;
    let mut previous: Option<usize> = None;

    for (index, e) in key_downs.iter().enumerate() {
        if !e.is_correction_key() {
            continue;
        }
        corrections += 1;
        if let Some(prev) = previous {
            if index - prev <= IMMEDIATE_CORRECTION_WINDOW {
                immediate += 1;
            }
        }
        previous = Some(index);
    }

    let rate = MetricResult::measured(corrections as f64 / content_keys as f64, content_keys);
    let tendency = if corrections > 0 {
        MetricResult::measured(immediate as f64 / corrections as f64, corrections)
    } else {
        MetricResult::insufficient(0)
    };
    (rate, tendency)
}

/// Composite fluency score in [0, 100]
///
/// ```text
/// fluency = 100 * (0.4 * min(1, speed / 5)
///                + 0.4 / (1 + rhythm_variability)
///                + 0.2 * correction_quality)
/// ```
/// where `correction_quality = 1 / (1 + correction_rate)`, or 1 when the
/// correction rate could not be calculated.
fn compute_fluency(
    typing_speed: MetricResult,
    average_interval: MetricResult,
    rhythm_variability: MetricResult,
    correction_rate: MetricResult,
    key_downs: usize,
) -> MetricResult {
    let (Some(speed), Some(_), Some(rhythm)) = (
        typing_speed.value(),
        average_interval.value(),
        rhythm_variability.value(),
    ) else {
        return MetricResult::insufficient(key_downs);
    };

    let speed_component = (speed / FLUENCY_SPEED_CEILING).min(1.0);
    let rhythm_component = 1.0 / (1.0 + rhythm);
    let correction_quality = correction_rate
        .value()
        .map(|rate| 1.0 / (1.0 + rate))
        .unwrap_or(1.0);

    let score = 100.0 * (0.4 * speed_component + 0.4 * rhythm_component + 0.2 * correction_quality);
    MetricResult::measured(score.clamp(0.0, 100.0), key_downs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(key: &str, t: f64) -> KeyboardEvent {
        KeyboardEvent {
            event_type: KeyEventType::KeyDown,
            key: key.to_string(),
            is_modifier: false,
            timestamp: t,
            question_id: None,
        }
    }

    fn up(key: &str, t: f64) -> KeyboardEvent {
        KeyboardEvent {
            event_type: KeyEventType::KeyUp,
            ..down(key, t)
        }
    }

    /// Keys typed every `gap` ms, each held for `hold` ms
    fn typed(keys: &[&str], gap: f64, hold: f64) -> Vec<KeyboardEvent> {
        keys.iter()
            .enumerate()
            .flat_map(|(i, k)| {
                let t = i as f64 * gap;
                vec![down(k, t), up(k, t + hold)]
            })
            .collect()
    }

    fn calc(events: &[KeyboardEvent]) -> KeyboardMetrics {
        KeyboardDynamicsCalculator::calculate(events, None, &EngineConfig::default())
    }

    #[test]
    fn test_two_events_not_calculated() {
        let metrics = calc(&[down("a", 0.0), up("a", 80.0)]);
        assert!(!metrics.typing_speed.calculated);
        assert!(!metrics.average_key_hold_time.calculated);
        assert!(!metrics.fluency_score.calculated);
    }

    #[test]
    fn test_below_floor_keeps_per_metric_sample_sizes() {
        let metrics = calc(&[down("a", 0.0), up("a", 80.0)]);
        assert_eq!(metrics.typing_speed.sample_size, 1);
        assert_eq!(metrics.average_inter_key_interval.sample_size, 0);
        assert_eq!(metrics.pause_rate.sample_size, 0);
        assert_eq!(metrics.average_key_hold_time.sample_size, 1);
        assert_eq!(metrics.correction_rate.sample_size, 1);
        assert_eq!(metrics.fluency_score.sample_size, 1);

        // A stuck key is not a plausible hold
        let stuck = calc(&[down("b", 0.0), up("b", 4000.0)]);
        assert_eq!(stuck.average_key_hold_time.sample_size, 0);
        assert!(!stuck.average_key_hold_time.calculated);
    }

    #[test]
    fn test_regular_typing() {
        let events = typed(&["h", "e", "l", "l", "o", " ", "y", "o", "u"], 200.0, 80.0);
        let metrics = calc(&events);

        // 9 content keys over 1.6 s
        assert!((metrics.typing_speed.value - 9.0 / 1.6).abs() < 1e-9);
        assert_eq!(metrics.average_inter_key_interval.value(), Some(200.0));
        assert_eq!(metrics.rhythm_variability.value(), Some(0.0));
        assert_eq!(metrics.pause_rate.value(), Some(0.0));
        assert_eq!(metrics.deep_thinking_pause_rate.value(), Some(0.0));
        assert_eq!(metrics.average_key_hold_time.value(), Some(80.0));
        assert_eq!(metrics.correction_rate.value(), Some(0.0));
        assert!(!metrics.immediate_correction_tendency.calculated);

        // speed saturates, no variability, no corrections
        assert!((metrics.fluency_score.value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_hold_outlier_removed() {
        let holds = [50.0, 60.0, 55.0, 500.0, 52.0];
        let events: Vec<KeyboardEvent> = holds
            .iter()
            .enumerate()
            .flat_map(|(i, &h)| {
                let t = i as f64 * 1000.0;
                vec![down("k", t), up("k", t + h)]
            })
            .collect();

        let metrics = calc(&events);
        assert_eq!(metrics.average_key_hold_time.value(), Some(54.25));
        assert_eq!(metrics.average_key_hold_time.sample_size, 5);

        // Bessel-corrected CV of the four surviving holds
        let sd = (56.75f64 / 3.0).sqrt();
        let cv = metrics.key_press_variability.value().unwrap();
        assert!((cv - sd / 54.25).abs() < 1e-12, "cv = {}", cv);
    }

    /// Six key-downs with gaps [100, 200, 100, 300, 100] and one Backspace
    fn uneven_typing() -> Vec<KeyboardEvent> {
        let keys = ["a", "b", "c", "Backspace", "d", "e"];
        let times = [0.0, 100.0, 300.0, 400.0, 700.0, 800.0];
        let holds = [40.0, 60.0, 50.0, 70.0, 80.0, 60.0];
        keys.iter()
            .zip(times)
            .zip(holds)
            .flat_map(|((k, t), h)| vec![down(k, t), up(k, t + h)])
            .collect()
    }

    #[test]
    fn test_rhythm_variability_is_bessel_corrected() {
        let metrics = calc(&uneven_typing());

        assert_eq!(metrics.average_inter_key_interval.value(), Some(160.0));
        // Sum of squared deviations 32000 over n - 1 = 4
        let cv = metrics.rhythm_variability.value().unwrap();
        assert!((cv - 8000f64.sqrt() / 160.0).abs() < 1e-12, "cv = {}", cv);
        assert!((cv - 0.559_017).abs() < 1e-6);
    }

    #[test]
    fn test_key_press_variability_value() {
        let metrics = calc(&uneven_typing());

        // Holds [40, 60, 50, 70, 80, 60] all survive IQR; mean 60, variance 1000 / 5
        assert_eq!(metrics.average_key_hold_time.value(), Some(60.0));
        assert_eq!(metrics.average_key_hold_time.sample_size, 6);
        let cv = metrics.key_press_variability.value().unwrap();
        assert!((cv - 200f64.sqrt() / 60.0).abs() < 1e-12, "cv = {}", cv);
    }

    #[test]
    fn test_fluency_weights_with_correction() {
        let metrics = calc(&uneven_typing());

        // One correction over five content keys
        assert_eq!(metrics.correction_rate.value(), Some(0.2));

        // 5 keys in 0.8 s saturates speed
        let rhythm = 8000f64.sqrt() / 160.0;
        let expected = 100.0 * (0.4 + 0.4 / (1.0 + rhythm) + 0.2 / 1.2);
        let fluency = metrics.fluency_score.value().unwrap();
        assert!((fluency - expected).abs() < 1e-9, "fluency = {}", fluency);
        assert!((fluency - 82.3239).abs() < 1e-4);
        assert_eq!(metrics.fluency_score.sample_size, 6);
    }

    #[test]
    fn test_implausible_holds_dropped() {
        let mut events = typed(&["a", "b", "c", "d", "e", "f"], 300.0, 90.0);
        // Stuck key and a glitch
        events.push(down("x", 5000.0));
        events.push(up("x", 8000.0));
        events.push(down("y", 9000.0));
        events.push(up("y", 9005.0));

        let metrics = calc(&events);
        assert_eq!(metrics.average_key_hold_time.value(), Some(90.0));
        assert_eq!(metrics.average_key_hold_time.sample_size, 6);
    }

    #[test]
    fn test_auto_repeat_keeps_first_press() {
        let holds = hold_durations(&[
            &down("a", 0.0),
            &down("a", 30.0),
            &down("a", 60.0),
            &up("a", 100.0),
            &up("a", 150.0),
        ]);
        assert_eq!(holds, vec![100.0]);
    }

    #[test]
    fn test_corrections() {
        let keys = ["t", "h", "e", "Backspace", "Backspace", "e", "n", "x", "y", "z", "Backspace"];
        let metrics = calc(&typed(&keys, 150.0, 70.0));

        // 3 corrections over 8 content keys
        assert_eq!(metrics.correction_rate.value(), Some(3.0 / 8.0));
        assert_eq!(metrics.correction_rate.sample_size, 8);
        // Second backspace follows the first immediately; the last is 7 keys later
        assert_eq!(metrics.immediate_correction_tendency.value(), Some(1.0 / 3.0));
        assert_eq!(metrics.immediate_correction_tendency.sample_size, 3);
    }

    #[test]
    fn test_pause_thresholds() {
        // Nine 200 ms gaps, one 2 s gap, one 6 s gap
        let mut t = 0.0;
        let mut events = Vec::new();
        let gaps = [200.0, 200.0, 200.0, 200.0, 2000.0, 200.0, 200.0, 200.0, 6000.0, 200.0, 200.0];
        events.push(down("a", t));
        for g in gaps {
            t += g;
            events.push(down("a", t));
        }

        let metrics = calc(&events);
        // mean = 9800 / 11, threshold = max(2672.7, 1000) -> only the 6 s gap
        assert_eq!(metrics.pause_rate.value(), Some(1.0 / 11.0));
        assert_eq!(metrics.deep_thinking_pause_rate.value(), Some(1.0 / 11.0));
        assert_eq!(metrics.pause_rate.sample_size, 11);
    }

    #[test]
    fn test_interval_outlier_filtered_from_rhythm() {
        let mut events: Vec<KeyboardEvent> = (0..20).map(|i| down("a", i as f64 * 100.0)).collect();
        events.push(down("a", 1900.0 + 30_000.0));

        let metrics = calc(&events);
        assert_eq!(metrics.average_inter_key_interval.value(), Some(100.0));
        assert_eq!(metrics.average_inter_key_interval.sample_size, 20);
    }

    #[test]
    fn test_unsorted_input_matches_sorted() {
        let events = typed(&["a", "b", "c", "d", "e", "f"], 180.0, 60.0);
        let mut shuffled = events.clone();
        shuffled.reverse();
        assert_eq!(calc(&events), calc(&shuffled));
    }

    #[test]
    fn test_fluency_requires_rhythm() {
        // Five key-downs at the same instant: no elapsed time for speed
        let events: Vec<KeyboardEvent> = (0..5).map(|_| down("a", 10.0)).collect();
        let metrics = calc(&events);
        assert!(!metrics.typing_speed.calculated);
        assert!(!metrics.fluency_score.calculated);
        assert_eq!(metrics.fluency_score.sample_size, 5);
    }
}
