//! Metric result types
//!
//! Every metric the engine produces is a [`MetricResult`]: a value, a flag
//! saying whether it was actually measured, and the number of raw samples
//! that were considered. Metric sets are fixed structs with one named field
//! per metric, addressed through the closed [`MetricKey`] enum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Disposition of a metric result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDisposition {
    /// No samples relevant to this metric were observed
    Unknown,
    /// Some samples were observed, but fewer than the metric requires
    Insufficient,
    /// The metric was computed from enough data
    Measured,
}

/// A single metric value with its calculation status.
///
/// `value` only carries signal when `calculated` is true. It serializes as
/// `null` otherwise so a consumer can never mistake it for a measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetricResultWire", into = "MetricResultWire")]
pub struct MetricResult {
    pub value: f64,
    pub calculated: bool,
    pub sample_size: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricResultWire {
    value: Option<f64>,
    calculated: bool,
    sample_size: u32,
}

impl From<MetricResult> for MetricResultWire {
    fn from(result: MetricResult) -> Self {
        Self {
            value: result.value(),
            calculated: result.calculated,
            sample_size: result.sample_size,
        }
    }
}

impl From<MetricResultWire> for MetricResult {
    fn from(wire: MetricResultWire) -> Self {
        match wire.value {
            Some(value) if wire.calculated => Self::measured(value, wire.sample_size as usize),
            _ => Self::insufficient(wire.sample_size as usize),
        }
    }
}

impl MetricResult {
    /// A measured value. Non-finite values are demoted to not calculated.
    pub fn measured(value: f64, sample_size: usize) -> Self {
        if !value.is_finite() {
            return Self::insufficient(sample_size);
        }
        Self {
            value,
            calculated: true,
            sample_size: clamp_count(sample_size),
        }
    }

    /// Not enough data to compute this metric
    pub fn insufficient(sample_size: usize) -> Self {
        Self {
            value: 0.0,
            calculated: false,
            sample_size: clamp_count(sample_size),
        }
    }

    /// The value, if it was measured
    pub fn value(&self) -> Option<f64> {
        self.calculated.then_some(self.value)
    }

    /// Tri-state disposition derived from the flag and sample size
    pub fn disposition(&self) -> MetricDisposition {
        if self.calculated {
            MetricDisposition::Measured
        } else if self.sample_size == 0 {
            MetricDisposition::Unknown
        } else {
            MetricDisposition::Insufficient
        }
    }

    /// Demote a measured result whose sample size is below `min_sample_size`
    pub fn gated(self, min_sample_size: u32) -> Self {
        if self.calculated && self.sample_size < min_sample_size {
            Self::insufficient(self.sample_size as usize)
        } else {
            self
        }
    }
}

impl Default for MetricResult {
    fn default() -> Self {
        Self::insufficient(0)
    }
}

fn clamp_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Closed set of metric keys produced for every scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    ClickPrecision,
    PathEfficiency,
    OvershootRate,
    AverageVelocity,
    VelocityVariability,
    TypingSpeed,
    AverageInterKeyInterval,
    RhythmVariability,
    PauseRate,
    DeepThinkingPauseRate,
    AverageKeyHoldTime,
    KeyPressVariability,
    CorrectionRate,
    ImmediateCorrectionTendency,
    FluencyScore,
}

impl MetricKey {
    /// All keys in report order
    pub const ALL: [MetricKey; 15] = [
        MetricKey::ClickPrecision,
        MetricKey::PathEfficiency,
        MetricKey::OvershootRate,
        MetricKey::AverageVelocity,
        MetricKey::VelocityVariability,
        MetricKey::TypingSpeed,
        MetricKey::AverageInterKeyInterval,
        MetricKey::RhythmVariability,
        MetricKey::PauseRate,
        MetricKey::DeepThinkingPauseRate,
        MetricKey::AverageKeyHoldTime,
        MetricKey::KeyPressVariability,
        MetricKey::CorrectionRate,
        MetricKey::ImmediateCorrectionTendency,
        MetricKey::FluencyScore,
    ];

    /// Stable wire name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::ClickPrecision => "clickPrecision",
            MetricKey::PathEfficiency => "pathEfficiency",
            MetricKey::OvershootRate => "overshootRate",
            MetricKey::AverageVelocity => "averageVelocity",
            MetricKey::VelocityVariability => "velocityVariability",
            MetricKey::TypingSpeed => "typingSpeed",
            MetricKey::AverageInterKeyInterval => "averageInterKeyInterval",
            MetricKey::RhythmVariability => "rhythmVariability",
            MetricKey::PauseRate => "pauseRate",
            MetricKey::DeepThinkingPauseRate => "deepThinkingPauseRate",
            MetricKey::AverageKeyHoldTime => "averageKeyHoldTime",
            MetricKey::KeyPressVariability => "keyPressVariability",
            MetricKey::CorrectionRate => "correctionRate",
            MetricKey::ImmediateCorrectionTendency => "immediateCorrectionTendency",
            MetricKey::FluencyScore => "fluencyScore",
        }
    }

    /// Unit of the metric value, if it has one
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            MetricKey::AverageVelocity => Some("px/s"),
            MetricKey::TypingSpeed => Some("keys/s"),
            MetricKey::AverageInterKeyInterval | MetricKey::AverageKeyHoldTime => Some("ms"),
            MetricKey::FluencyScore => Some("score_0_100"),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics derived from pointer movement and clicks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerMetrics {
    pub click_precision: MetricResult,
    pub path_efficiency: MetricResult,
    pub overshoot_rate: MetricResult,
    pub average_velocity: MetricResult,
    pub velocity_variability: MetricResult,
}

/// Metrics derived from keyboard events
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardMetrics {
    pub typing_speed: MetricResult,
    pub average_inter_key_interval: MetricResult,
    pub rhythm_variability: MetricResult,
    pub pause_rate: MetricResult,
    pub deep_thinking_pause_rate: MetricResult,
    pub average_key_hold_time: MetricResult,
    pub key_press_variability: MetricResult,
    pub correction_rate: MetricResult,
    pub immediate_correction_tendency: MetricResult,
    pub fluency_score: MetricResult,
}

/// All metrics for one scope (global or a single question)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(flatten)]
    pub pointer: PointerMetrics,
    #[serde(flatten)]
    pub keyboard: KeyboardMetrics,
}

impl MetricSet {
    /// Look up a metric by key
    pub fn get(&self, key: MetricKey) -> MetricResult {
        let p = &self.pointer;
        let k = &self.keyboard;
        match key {
            MetricKey::ClickPrecision => p.click_precision,
            MetricKey::PathEfficiency => p.path_efficiency,
            MetricKey::OvershootRate => p.overshoot_rate,
            MetricKey::AverageVelocity => p.average_velocity,
            MetricKey::VelocityVariability => p.velocity_variability,
            MetricKey::TypingSpeed => k.typing_speed,
            MetricKey::AverageInterKeyInterval => k.average_inter_key_interval,
            MetricKey::RhythmVariability => k.rhythm_variability,
            MetricKey::PauseRate => k.pause_rate,
            MetricKey::DeepThinkingPauseRate => k.deep_thinking_pause_rate,
            MetricKey::AverageKeyHoldTime => k.average_key_hold_time,
            MetricKey::KeyPressVariability => k.key_press_variability,
            MetricKey::CorrectionRate => k.correction_rate,
            MetricKey::ImmediateCorrectionTendency => k.immediate_correction_tendency,
            MetricKey::FluencyScore => k.fluency_score,
        }
    }

    fn get_mut(&mut self, key: MetricKey) -> &mut MetricResult {
        let p = &mut self.pointer;
        let k = &mut self.keyboard;
        match key {
            MetricKey::ClickPrecision => &mut p.click_precision,
            MetricKey::PathEfficiency => &mut p.path_efficiency,
            MetricKey::OvershootRate => &mut p.overshoot_rate,
            MetricKey::AverageVelocity => &mut p.average_velocity,
            MetricKey::VelocityVariability => &mut p.velocity_variability,
            MetricKey::TypingSpeed => &mut k.typing_speed,
            MetricKey::AverageInterKeyInterval => &mut k.average_inter_key_interval,
            MetricKey::RhythmVariability => &mut k.rhythm_variability,
            MetricKey::PauseRate => &mut k.pause_rate,
            MetricKey::DeepThinkingPauseRate => &mut k.deep_thinking_pause_rate,
            MetricKey::AverageKeyHoldTime => &mut k.average_key_hold_time,
            MetricKey::KeyPressVariability => &mut k.key_press_variability,
            MetricKey::CorrectionRate => &mut k.correction_rate,
            MetricKey::ImmediateCorrectionTendency => &mut k.immediate_correction_tendency,
            MetricKey::FluencyScore => &mut k.fluency_score,
        }
    }

    /// All entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (MetricKey, MetricResult)> + '_ {
        MetricKey::ALL.iter().map(move |&key| (key, self.get(key)))
    }

    /// Only the entries that were actually measured
    pub fn measured(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        self.entries()
            .filter_map(|(key, result)| result.value().map(|v| (key, v)))
    }

    /// Number of measured entries
    pub fn measured_count(&self) -> usize {
        self.measured().count()
    }

    /// Apply sample-size gating to every entry
    pub fn gated(mut self, min_sample_size: u32) -> Self {
        for key in MetricKey::ALL {
            let slot = self.get_mut(key);
            *slot = slot.gated(min_sample_size);
        }
        self
    }
}

/// Pointer and keyboard metrics for the whole submission and per question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentMetrics {
    pub global: MetricSet,
    pub questions: BTreeMap<String, MetricSet>,
}

/// Scored result of one attention-test run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionTestResult {
    pub total_targets: u32,
    pub total_non_targets: u32,
    pub correct_detections: u32,
    pub omission_errors: u32,
    pub commission_errors: u32,
    pub detection_rate: f64,
    pub omission_error_rate: f64,
    pub commission_error_rate: f64,
    /// Mean reaction time over target hits (ms)
    pub average_reaction_time: MetricResult,
    /// Population standard deviation of hit reaction times (ms)
    pub reaction_time_sd: MetricResult,
}

// ============================================================================
// Report Types
// ============================================================================

/// Producer metadata embedded in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Counts of the raw records a report was computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub movement_samples: u32,
    pub click_interactions: u32,
    pub keyboard_events: u32,
    pub questions: u32,
    pub attention_stimuli: u32,
    pub attention_responses: u32,
}

/// Metrics report for one assessment submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    /// When this report was computed (RFC3339)
    pub computed_at_utc: String,
    pub event_summary: EventSummary,
    pub global: MetricSet,
    pub questions: BTreeMap<String, MetricSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention: Option<AttentionTestResult>,
}
