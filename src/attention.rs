//! Sustained-attention test scoring
//!
//! Scores one continuous performance test run: detections, omission and
//! commission errors, and reaction-time statistics over target hits.

use crate::schema::{AttentionTestLog, ResponseEvent, StimulusPresentation};
use crate::stats;
use crate::types::{AttentionTestResult, MetricResult};
use std::collections::BTreeSet;
use tracing::debug;

/// Scorer for attention-test runs
pub struct AttentionTestScorer;

impl AttentionTestScorer {
    /// Score a test log
    pub fn score_log(log: &AttentionTestLog) -> AttentionTestResult {
        Self::score(&log.stimuli, &log.responses)
    }

    /// Score stimulus and response streams of one run.
    ///
    /// Only the first response to each stimulus index counts, so a double tap
    /// on one target is a single detection.
    pub fn score(
        stimuli: &[StimulusPresentation],
        responses: &[ResponseEvent],
    ) -> AttentionTestResult {
        let total_targets = stimuli.iter().filter(|s| s.is_target).count();
        let total_non_targets = stimuli.len() - total_targets;

        let mut seen = BTreeSet::new();
        let first_responses: Vec<&ResponseEvent> = responses
            .iter()
            .filter(|r| seen.insert(r.stimulus_index))
            .collect();

        let hits: Vec<&ResponseEvent> = first_responses
            .iter()
            .copied()
            .filter(|r| r.is_target)
            .collect();
        let correct_detections = hits.len();
        let commission_errors = first_responses.len() - correct_detections;
        let omission_errors = total_targets.saturating_sub(correct_detections);

        let reaction_times: Vec<f64> = hits
            .iter()
            .map(|r| r.response_time)
            .filter(|rt| rt.is_finite() && *rt >= 0.0)
            .collect();

        let average_reaction_time = match stats::mean(&reaction_times) {
            Some(m) => MetricResult::measured(m, reaction_times.len()),
            None => MetricResult::insufficient(0),
        };
        let reaction_time_sd = if reaction_times.len() >= 2 {
            match stats::population_std_dev(&reaction_times) {
                Some(sd) => MetricResult::measured(sd, reaction_times.len()),
                None => MetricResult::insufficient(reaction_times.len()),
            }
        } else {
            MetricResult::insufficient(reaction_times.len())
        };

        debug!(
            stimuli = stimuli.len(),
            responses = responses.len(),
            duplicates = responses.len() - first_responses.len(),
            "scored attention test"
        );

        AttentionTestResult {
            total_targets: count(total_targets),
            total_non_targets: count(total_non_targets),
            correct_detections: count(correct_detections),
            omission_errors: count(omission_errors),
            commission_errors: count(commission_errors),
            detection_rate: bounded_rate(correct_detections, total_targets),
            omission_error_rate: bounded_rate(omission_errors, total_targets),
            commission_error_rate: bounded_rate(commission_errors, total_non_targets),
            average_reaction_time,
            reaction_time_sd,
        }
    }
}

/// Rate in [0, 1], 0 when nothing was presented
fn bounded_rate(numerator: usize, denominator: usize) -> f64 {
    stats::ratio_or_zero(numerator as f64, denominator as f64).clamp(0.0, 1.0)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stimuli(targets: usize, non_targets: usize) -> Vec<StimulusPresentation> {
        (0..targets + non_targets)
            .map(|i| StimulusPresentation {
                value: if i < targets { "X".to_string() } else { "O".to_string() },
                is_target: i < targets,
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

    #[test]
    fn test_rates() {
        let stimuli = stimuli(10, 20);
        let mut responses: Vec<ResponseEvent> =
            (0..7).map(|i| response(i, true, 400.0 + i as f64 * 10.0)).collect();
        responses.push(response(12, false, 350.0));
        responses.push(response(15, false, 500.0));

        let result = AttentionTestScorer::score(&stimuli, &responses);
        assert_eq!(result.correct_detections, 7);
        assert_eq!(result.omission_errors, 3);
        assert_eq!(result.commission_errors, 2);
        assert!((result.detection_rate - 0.7).abs() < 1e-12);
        assert!((result.omission_error_rate - 0.3).abs() < 1e-12);
        assert!((result.commission_error_rate - 0.1).abs() < 1e-12);
        assert_eq!(result.average_reaction_time.value(), Some(430.0));
        assert!((result.reaction_time_sd.value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_targets_presented() {
        let result = AttentionTestScorer::score(&stimuli(0, 5), &[response(1, false, 300.0)]);
        assert_eq!(result.detection_rate, 0.0);
        assert_eq!(result.omission_error_rate, 0.0);
        assert!((result.commission_error_rate - 0.2).abs() < 1e-12);
        assert!(!result.average_reaction_time.calculated);
        assert!(!result.reaction_time_sd.calculated);
    }

    #[test]
    fn test_empty_run() {
        let result = AttentionTestScorer::score(&[], &[]);
        assert_eq!(result.detection_rate, 0.0);
        assert_eq!(result.commission_error_rate, 0.0);
        assert_eq!(result.total_targets, 0);
    }

    #[test]
    fn test_single_hit_has_no_sd() {
        let result = AttentionTestScorer::score(&stimuli(3, 3), &[response(0, true, 0.0)]);
        // A zero reaction time is a real measurement, the SD is not
        assert_eq!(result.average_reaction_time.value(), Some(0.0));
        assert!(!result.reaction_time_sd.calculated);
        assert_eq!(result.reaction_time_sd.sample_size, 1);
    }

    #[test]
    fn test_duplicate_responses_count_once() {
        let responses = vec![
            response(0, true, 300.0),
            response(0, true, 320.0),
            response(1, true, 310.0),
        ];
        let result = AttentionTestScorer::score(&stimuli(2, 2), &responses);
        assert_eq!(result.correct_detections, 2);
        assert_eq!(result.detection_rate, 1.0);
        assert_eq!(result.omission_errors, 0);
        assert_eq!(result.average_reaction_time.value(), Some(305.0));
    }
}
