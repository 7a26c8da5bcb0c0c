//! Metrics pipeline orchestration
//!
//! Public entry points: event log JSON → parse → per-scope aggregation →
//! attention-test scoring → report JSON.

use crate::aggregation::MetricsAggregator;
use crate::attention::AttentionTestScorer;
use crate::config::EngineConfig;
use crate::encoder::MetricsEncoder;
use crate::error::ComputeError;
use crate::schema::{
    AttentionTestLog, EventLog, EventLogAdapter, ResponseEvent, StimulusPresentation,
};
use crate::types::{AssessmentMetrics, AttentionTestResult, MetricsReport};
use tracing::info;

/// Compute global and per-question metric sets for an event log
pub fn compute_assessment_metrics(log: &EventLog, config: &EngineConfig) -> AssessmentMetrics {
    MetricsAggregator::new(config).aggregate(log)
}

/// Score one attention-test run
pub fn score_attention_test(
    stimuli: &[StimulusPresentation],
    responses: &[ResponseEvent],
) -> AttentionTestResult {
    AttentionTestScorer::score(stimuli, responses)
}

/// Convert event log JSON to a metrics report JSON (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let report_json = event_log_to_metrics(log_json)?;
/// ```
pub fn event_log_to_metrics(log_json: String) -> Result<String, ComputeError> {
    let processor = MetricsProcessor::new();
    processor.process(&log_json)
}

/// Configured, reusable processor.
///
/// Holds a validated configuration and an encoder whose instance ID is
/// stamped on every report it produces.
pub struct MetricsProcessor {
    config: EngineConfig,
    encoder: MetricsEncoder,
}

impl Default for MetricsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProcessor {
    /// Create a processor with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            encoder: MetricsEncoder::new(),
        }
    }

    /// Create a processor with a custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: MetricsEncoder::new(),
        })
    }

    /// Replace the encoder (e.g. to pin the instance ID)
    pub fn with_encoder(mut self, encoder: MetricsEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Encoder used to stamp and serialize reports
    pub fn encoder(&self) -> &MetricsEncoder {
        &self.encoder
    }

    /// Process event log JSON and return report JSON
    pub fn process(&self, log_json: &str) -> Result<String, ComputeError> {
        let log = EventLogAdapter::parse(log_json)?;
        let report = self.process_log(&log);
        self.encoder.to_json(&report)
    }

    /// Process an already parsed event log
    pub fn process_log(&self, log: &EventLog) -> MetricsReport {
        let metrics = compute_assessment_metrics(log, &self.config);
        let attention = log.attention_test.as_ref().map(AttentionTestScorer::score_log);

        info!(
            submission = log.submission_id.as_deref().unwrap_or("-"),
            events = log.interaction_event_count(),
            questions = metrics.questions.len(),
            global_measured = metrics.global.measured_count(),
            attention = attention.is_some(),
            "computed assessment metrics"
        );

        self.encoder.encode(log, metrics, attention)
    }

    /// Score attention-test JSON (`{"stimuli": [...], "responses": [...]}`)
    pub fn process_attention(&self, test_json: &str) -> Result<String, ComputeError> {
        let test: AttentionTestLog = serde_json::from_str(test_json).map_err(|e| {
            ComputeError::ParseError(format!("Failed to parse attention test: {}", e))
        })?;
        let result = AttentionTestScorer::score_log(&test);
        serde_json::to_string(&result).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
