//! Scope aggregation
//!
//! Runs the pointer and keyboard calculators once for the whole submission
//! and once per question, then applies sample-size gating. Scopes share the
//! event log read-only, so they are evaluated in parallel.

use crate::config::EngineConfig;
use crate::keyboard::KeyboardDynamicsCalculator;
use crate::pointer::PointerMetricsCalculator;
use crate::schema::EventLog;
use crate::types::{AssessmentMetrics, MetricSet};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Aggregates per-scope metric sets for one event log
pub struct MetricsAggregator<'a> {
    config: &'a EngineConfig,
}

impl<'a> MetricsAggregator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Distinct question ids in the pointer and keyboard streams, in order
    pub fn question_ids(log: &EventLog) -> BTreeSet<&str> {
        let movements = log.movements.iter().filter_map(|m| m.question_id.as_deref());
        let clicks = log.interactions.iter().filter_map(|c| c.question_id.as_deref());
        let keys = log.keyboard_events.iter().filter_map(|k| k.question_id.as_deref());
        movements.chain(clicks).chain(keys).collect()
    }

    /// Metric set for one scope (`None` = global)
    pub fn scope(&self, log: &EventLog, question_id: Option<&str>) -> MetricSet {
        let pointer = PointerMetricsCalculator::calculate(
            &log.movements,
            &log.interactions,
            question_id,
            self.config,
        );
        let keyboard =
            KeyboardDynamicsCalculator::calculate(&log.keyboard_events, question_id, self.config);

        MetricSet { pointer, keyboard }.gated(self.config.min_sample_size)
    }

    /// Global metric set plus one set per question
    pub fn aggregate(&self, log: &EventLog) -> AssessmentMetrics {
        let question_ids: Vec<&str> = Self::question_ids(log).into_iter().collect();

        let questions: BTreeMap<String, MetricSet> = if self.config.parallel {
            question_ids
                .par_iter()
                .map(|&q| (q.to_string(), self.scope(log, Some(q))))
                .collect()
        } else {
            question_ids
                .iter()
                .map(|&q| (q.to_string(), self.scope(log, Some(q))))
                .collect()
        };
        let global = self.scope(log, None);

        debug!(
            questions = questions.len(),
            global_measured = global.measured_count(),
            "aggregated metric scopes"
        );

        AssessmentMetrics { global, questions }
    }
}
