//! Metrics report encoder
//!
//! Wraps computed metric sets with producer metadata, an event summary and
//! a computation timestamp. The metric values themselves are never altered.

use crate::error::ComputeError;
use crate::schema::EventLog;
use crate::types::{
    AssessmentMetrics, AttentionTestResult, EventSummary, MetricsReport, ReportProducer,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report encoder
pub struct MetricsEncoder {
    instance_id: String,
}

impl Default for MetricsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build the report for one submission
    pub fn encode(
        &self,
        log: &EventLog,
        metrics: AssessmentMetrics,
        attention: Option<AttentionTestResult>,
    ) -> MetricsReport {
        let (attention_stimuli, attention_responses) = log
            .attention_test
            .as_ref()
            .map(|t| (t.stimuli.len(), t.responses.len()))
            .unwrap_or((0, 0));

        let event_summary = EventSummary {
            movement_samples: count(log.movements.len()),
            click_interactions: count(log.interactions.len()),
            keyboard_events: count(log.keyboard_events.len()),
            questions: count(metrics.questions.len()),
            attention_stimuli: count(attention_stimuli),
            attention_responses: count(attention_responses),
        };

        MetricsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            submission_id: log.submission_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event_summary,
            global: metrics.global,
            questions: metrics.questions,
            attention,
        }
    }

    /// Serialize a report to compact JSON
    pub fn to_json(&self, report: &MetricsReport) -> Result<String, ComputeError> {
        serde_json::to_string(report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Serialize a report to pretty-printed JSON
    pub fn to_json_pretty(&self, report: &MetricsReport) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
