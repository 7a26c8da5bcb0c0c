//! Event log parsing and validation
//!
//! Validation is advisory. The calculators skip unusable records on their
//! own; these checks exist so callers can surface instrument bugs.

use crate::error::ComputeError;
use crate::schema::event_log::EventLog;

/// Adapter for turning submission payloads into event logs
pub struct EventLogAdapter;

impl EventLogAdapter {
    /// Parse a single event log JSON document
    pub fn parse(json: &str) -> Result<EventLog, ComputeError> {
        serde_json::from_str(json)
            .map_err(|e| ComputeError::ParseError(format!("Failed to parse event log: {}", e)))
    }

    /// Parse NDJSON containing one event log per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<EventLog>, ComputeError> {
        let mut logs = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<EventLog>(trimmed) {
                Ok(log) => logs.push(log),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(logs)
    }

    /// Check every record of a log and return the problems found
    pub fn validate(log: &EventLog) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (index, m) in log.movements.iter().enumerate() {
            if !(m.x.is_finite() && m.y.is_finite()) {
                issues.push(ValidationIssue::new(
                    RecordKind::Movement,
                    index,
                    ValidationError::NonFiniteCoordinate,
                ));
            }
            check_timestamp(&mut issues, RecordKind::Movement, index, m.timestamp);
        }

        for (index, c) in log.interactions.iter().enumerate() {
            if !(c.click_x.is_finite()
                && c.click_y.is_finite()
                && c.target_x.is_finite()
                && c.target_y.is_finite())
            {
                issues.push(ValidationIssue::new(
                    RecordKind::Interaction,
                    index,
                    ValidationError::NonFiniteCoordinate,
                ));
            }
            if c.target_id.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    RecordKind::Interaction,
                    index,
                    ValidationError::EmptyIdentifier("targetId"),
                ));
            }
            check_timestamp(&mut issues, RecordKind::Interaction, index, c.timestamp);
        }

        for (index, k) in log.keyboard_events.iter().enumerate() {
            if k.key.is_empty() {
                issues.push(ValidationIssue::new(
                    RecordKind::Keyboard,
                    index,
                    ValidationError::EmptyIdentifier("key"),
                ));
            }
            check_timestamp(&mut issues, RecordKind::Keyboard, index, k.timestamp);
        }

        if let Some(test) = &log.attention_test {
            for (index, s) in test.stimuli.iter().enumerate() {
                check_timestamp(&mut issues, RecordKind::Stimulus, index, s.presented_at);
            }
            for (index, r) in test.responses.iter().enumerate() {
                if !(r.response_time.is_finite() && r.response_time >= 0.0) {
                    issues.push(ValidationIssue::new(
                        RecordKind::Response,
                        index,
                        ValidationError::InvalidReactionTime(r.response_time),
                    ));
                }
                if r.stimulus_index as usize >= test.stimuli.len() {
                    issues.push(ValidationIssue::new(
                        RecordKind::Response,
                        index,
                        ValidationError::UnknownStimulus(r.stimulus_index),
                    ));
                }
            }
        }

        issues
    }
}

fn check_timestamp(issues: &mut Vec<ValidationIssue>, kind: RecordKind, index: usize, ts: f64) {
    if !ts.is_finite() || ts < 0.0 {
        issues.push(ValidationIssue::new(
            kind,
            index,
            ValidationError::InvalidTimestamp(ts),
        ));
    }
}

/// Which collection a validation issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Movement,
    Interaction,
    Keyboard,
    Stimulus,
    Response,
}

/// A single problem found in an event log
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: RecordKind,
    pub index: usize,
    pub error: ValidationError,
}

impl ValidationIssue {
    fn new(kind: RecordKind, index: usize, error: ValidationError) -> Self {
        Self { kind, index, error }
    }
}

/// Validation errors for event log records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Coordinate is not a finite number")]
    NonFiniteCoordinate,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Empty identifier field: {0}")]
    EmptyIdentifier(&'static str),

    #[error("Invalid reaction time: {0}")]
    InvalidReactionTime(f64),

    #[error("Response refers to unknown stimulus index {0}")]
    UnknownStimulus(u32),
}
