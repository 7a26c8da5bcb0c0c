//! Pointer metrics
//!
//! Derives click precision, path efficiency, overshoot rate and velocity
//! statistics from movement samples and click interactions.

use crate::config::EngineConfig;
use crate::schema::{ClickInteraction, MovementSample};
use crate::stats;
use crate::types::{MetricResult, PointerMetrics};
use std::collections::BTreeMap;
use tracing::debug;

/// Calculator for pointer-derived metrics
pub struct PointerMetricsCalculator;

impl PointerMetricsCalculator {
    /// Compute pointer metrics for one scope.
    ///
    /// `question_id` of `None` selects every record (global scope). The inputs
    /// are only borrowed; any sorting happens on private copies.
    pub fn calculate(
        movements: &[MovementSample],
        interactions: &[ClickInteraction],
        question_id: Option<&str>,
        config: &EngineConfig,
    ) -> PointerMetrics {
        let movements: Vec<&MovementSample> = movements
            .iter()
            .filter(|m| in_scope(m.question_id.as_deref(), question_id))
            .filter(|m| m.x.is_finite() && m.y.is_finite() && m.timestamp.is_finite())
            .collect();
        let interactions: Vec<&ClickInteraction> = interactions
            .iter()
            .filter(|c| in_scope(c.question_id.as_deref(), question_id))
            .filter(|c| {
                c.click_x.is_finite()
                    && c.click_y.is_finite()
                    && c.target_x.is_finite()
                    && c.target_y.is_finite()
            })
            .collect();

        debug!(
            scope = question_id.unwrap_or("global"),
            movements = movements.len(),
            interactions = interactions.len(),
            "computing pointer metrics"
        );

        let trajectories = group_by_target(&movements);
        let (average_velocity, velocity_variability) = compute_velocity(&movements);

        PointerMetrics {
            click_precision: compute_click_precision(&interactions),
            path_efficiency: compute_path_efficiency(
                &trajectories,
                &interactions,
                config.path_efficiency_min_samples,
            ),
            overshoot_rate: compute_overshoot_rate(&trajectories, config.overshoot_min_samples),
            average_velocity,
            velocity_variability,
        }
    }
}

/// Whether a record tagged with `record` belongs to the requested scope
pub(crate) fn in_scope(record: Option<&str>, scope: Option<&str>) -> bool {
    match scope {
        None => true,
        Some(q) => record == Some(q),
    }
}

/// Movement samples per target, each sorted by timestamp
fn group_by_target<'a>(
    movements: &[&'a MovementSample],
) -> BTreeMap<&'a str, Vec<&'a MovementSample>> {
    let mut by_target: BTreeMap<&str, Vec<&MovementSample>> = BTreeMap::new();
    for &m in movements {
        if let Some(target) = m.target_id.as_deref() {
            by_target.entry(target).or_default().push(m);
        }
    }
    for samples in by_target.values_mut() {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }
    by_target
}

/// Click precision: `1 - mean(min(1, dist(click, target) / maxDistance))`
///
/// `maxDistance = sqrt(targetX² + targetY²) / 2`, with 1 substituted for 0.
fn compute_click_precision(interactions: &[&ClickInteraction]) -> MetricResult {
    if interactions.is_empty() {
        return MetricResult::insufficient(0);
    }

    let normalized: Vec<f64> = interactions
        .iter()
        .map(|c| {
            let mut max_distance = c.target_x.hypot(c.target_y) / 2.0;
            if max_distance <= 0.0 {
                max_distance = 1.0;
            }
            let d = stats::distance(c.click_x, c.click_y, c.target_x, c.target_y);
            (d / max_distance).min(1.0)
        })
        .collect();

    match stats::mean(&normalized) {
        Some(m) => MetricResult::measured(1.0 - m, normalized.len()),
        None => MetricResult::insufficient(0),
    }
}

/// Path efficiency: mean over targets of `min(1, direct / actual)`
///
/// Direct distance runs from the first sample to the click point. Actual
/// distance is the sampled path plus the final segment to the click point.
fn compute_path_efficiency(
    trajectories: &BTreeMap<&str, Vec<&MovementSample>>,
    interactions: &[&ClickInteraction],
    min_samples: usize,
) -> MetricResult {
    // Earliest click per target
    let mut clicks: BTreeMap<&str, &ClickInteraction> = BTreeMap::new();
    for &c in interactions {
        clicks
            .entry(c.target_id.as_str())
            .and_modify(|existing| {
                if c.timestamp < existing.timestamp {
                    *existing = c;
                }
            })
            .or_insert(c);
    }

    let mut efficiencies = Vec::new();
    for (target, samples) in trajectories {
        if samples.len() < min_samples {
            continue;
        }
        let Some(click) = clicks.get(target) else {
            continue;
        };
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            continue;
        };

        let direct = stats::distance(first.x, first.y, click.click_x, click.click_y);
        let sampled: f64 = samples
            .windows(2)
            .map(|w| stats::distance(w[0].x, w[0].y, w[1].x, w[1].y))
            .sum();
        let actual = sampled + stats::distance(last.x, last.y, click.click_x, click.click_y);

        if actual <= 0.0 {
            continue;
        }
        efficiencies.push((direct / actual).min(1.0));
    }

    match stats::mean(&efficiencies) {
        Some(m) => MetricResult::measured(m, efficiencies.len()),
        None => MetricResult::insufficient(trajectories.len()),
    }
}

/// Overshoot rate: fraction of targets whose trajectory reverses direction
fn compute_overshoot_rate(
    trajectories: &BTreeMap<&str, Vec<&MovementSample>>,
    min_samples: usize,
) -> MetricResult {
    let mut evaluated = 0usize;
    let mut overshooting = 0usize;

    for samples in trajectories.values() {
        if samples.len() < min_samples {
            continue;
        }
        evaluated += 1;
        if has_reversal(samples) {
            overshooting += 1;
        }
    }

    if evaluated == 0 {
        return MetricResult::insufficient(trajectories.len());
    }
    MetricResult::measured(overshooting as f64 / evaluated as f64, evaluated)
}

/// A strict sign flip of the x or y component between consecutive segments.
/// Zero-length segments are ignored.
fn has_reversal(samples: &[&MovementSample]) -> bool {
    let segments: Vec<(f64, f64)> = samples
        .windows(2)
        .map(|w| (w[1].x - w[0].x, w[1].y - w[0].y))
        .filter(|&(dx, dy)| dx != 0.0 || dy != 0.0)
        .collect();

    segments
        .windows(2)
        .any(|s| s[0].0 * s[1].0 < 0.0 || s[0].1 * s[1].1 < 0.0)
}

/// Average velocity (px/s) and its coefficient of variation
fn compute_velocity(movements: &[&MovementSample]) -> (MetricResult, MetricResult) {
    let mut sorted = movements.to_vec();
    sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let velocities: Vec<f64> = sorted
        .windows(2)
        .filter_map(|w| {
            let dt_sec = (w[1].timestamp - w[0].timestamp) / 1000.0;
            if dt_sec <= 0.0 {
                return None;
            }
            Some(stats::distance(w[0].x, w[0].y, w[1].x, w[1].y) / dt_sec)
        })
        .collect();

    let average = match stats::mean(&velocities) {
        Some(m) => MetricResult::measured(m, velocities.len()),
        None => MetricResult::insufficient(0),
    };
    let variability = match stats::population_cv(&velocities) {
        Some(cv) => MetricResult::measured(cv, velocities.len()),
        None => MetricResult::insufficient(velocities.len()),
    };

    (average, variability)
}
