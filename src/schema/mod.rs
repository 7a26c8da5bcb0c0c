//! Input schema for assessment event logs
//!
//! Defines the raw interaction records the engine consumes and the adapter
//! that parses and validates them.

pub mod adapter;
pub mod event_log;

pub use adapter::{EventLogAdapter, RecordKind, ValidationError, ValidationIssue};
pub use event_log::{
    AttentionTestLog, ClickInteraction, EventLog, KeyEventType, KeyboardEvent, MovementSample,
    ResponseEvent, StimulusPresentation, SCHEMA_VERSION,
};
