//! Event log input schema
//!
//! The raw interaction records captured by the assessment front end. Field
//! names on the wire are camelCase; every collection defaults to empty.

use serde::{Deserialize, Serialize};

/// Input schema identifier
pub const SCHEMA_VERSION: &str = "assessment.event_log.v1";

/// A pointer position sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSample {
    pub x: f64,
    pub y: f64,
    /// Milliseconds, monotonic within a session
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// A completed click or tap on an answerable element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickInteraction {
    pub target_id: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    pub click_x: f64,
    pub click_y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub timestamp: f64,
}

/// Key transition direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEventType {
    #[serde(alias = "keydown")]
    KeyDown,
    #[serde(alias = "keyup")]
    KeyUp,
}

/// A key-down or key-up transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardEvent {
    #[serde(rename = "type")]
    pub event_type: KeyEventType,
    /// Logical key identifier (`"a"`, `"Enter"`, `"Backspace"`, ...)
    pub key: String,
    #[serde(default)]
    pub is_modifier: bool,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

impl KeyboardEvent {
    pub fn is_key_down(&self) -> bool {
        self.event_type == KeyEventType::KeyDown
    }

    /// Single visible character, space, or Enter
    pub fn is_content_key(&self) -> bool {
        if self.is_modifier {
            return false;
        }
        if self.key == "Enter" {
            return true;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c == ' ' || !c.is_control(),
            _ => false,
        }
    }

    /// Backspace or Delete
    pub fn is_correction_key(&self) -> bool {
        matches!(self.key.as_str(), "Backspace" | "Delete")
    }
}

/// One stimulus shown during an attention test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusPresentation {
    pub value: String,
    pub is_target: bool,
    /// Milliseconds since test start
    pub presented_at: f64,
}

/// One response given during an attention test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub stimulus_value: String,
    pub is_target: bool,
    /// Milliseconds since stimulus onset
    pub response_time: f64,
    pub stimulus_index: u32,
}

/// Stimulus and response streams of one sustained-attention test run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionTestLog {
    #[serde(default)]
    pub stimuli: Vec<StimulusPresentation>,
    #[serde(default)]
    pub responses: Vec<ResponseEvent>,
}

/// Everything captured during one assessment submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub movements: Vec<MovementSample>,
    #[serde(default, alias = "clicks")]
    pub interactions: Vec<ClickInteraction>,
    #[serde(default)]
    pub keyboard_events: Vec<KeyboardEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_test: Option<AttentionTestLog>,
}

impl EventLog {
    /// Total number of pointer and keyboard records
    pub fn interaction_event_count(&self) -> usize {
        self.movements.len() + self.interactions.len() + self.keyboard_events.len()
    }
}
