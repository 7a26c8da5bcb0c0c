//! Assessment Metrics - deterministic behavioral and cognitive-test metrics
//!
//! Turns the raw interaction log of one assessment submission into quantitative
//! features: event log parsing → per-scope pointer and keyboard calculation →
//! sample-size gating → attention-test scoring → report encoding.
//!
//! ## Modules
//!
//! - **Pointer**: click precision, path efficiency, overshoot, velocity
//! - **Keyboard**: typing speed, rhythm, pauses, hold times, corrections, fluency
//! - **Attention**: detections, omission/commission errors, reaction times
//!
//! Every metric carries an explicit `calculated` flag and the sample size it
//! was derived from. Insufficient data is never an error.

pub mod aggregation;
pub mod attention;
pub mod config;
pub mod encoder;
pub mod error;
pub mod keyboard;
pub mod pipeline;
pub mod pointer;
pub mod schema;
pub mod stats;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{
    compute_assessment_metrics, event_log_to_metrics, score_attention_test, MetricsProcessor,
};

// Schema exports
pub use schema::{EventLog, EventLogAdapter, SCHEMA_VERSION};

pub use types::{
    AssessmentMetrics, AttentionTestResult, MetricDisposition, MetricKey, MetricResult, MetricSet,
    MetricsReport,
};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "assessment-metrics";
