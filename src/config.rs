//! Engine configuration
//!
//! Tunable thresholds for the calculators and the aggregation layer. The
//! defaults are the canonical values; callers override them only for
//! product-level experiments.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Thresholds used across the calculators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Movement samples required per target for path efficiency
    pub path_efficiency_min_samples: usize,
    /// Movement samples required per target for overshoot detection
    pub overshoot_min_samples: usize,
    /// Shortest plausible key hold (ms)
    pub hold_min_ms: f64,
    /// Longest plausible key hold (ms)
    pub hold_max_ms: f64,
    /// Holds required before IQR filtering is applied
    pub hold_iqr_min_samples: usize,
    /// Holds that must survive filtering to report hold statistics
    pub hold_min_filtered: usize,
    /// Lower bound of the dynamic pause threshold (ms)
    pub pause_floor_ms: f64,
    /// Fixed deep-thinking pause threshold (ms)
    pub deep_pause_ms: f64,
    /// Measured results with a smaller sample size are reported as not calculated
    pub min_sample_size: u32,
    /// Evaluate question scopes on the rayon thread pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path_efficiency_min_samples: 2,
            overshoot_min_samples: 3,
            hold_min_ms: 20.0,
            hold_max_ms: 1000.0,
            hold_iqr_min_samples: 5,
            hold_min_filtered: 3,
            pause_floor_ms: 1000.0,
            deep_pause_ms: 5000.0,
            min_sample_size: 1,
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the calculators meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.path_efficiency_min_samples < 2 {
            return Err(ComputeError::InvalidConfig(
                "pathEfficiencyMinSamples must be at least 2".to_string(),
            ));
        }
        if self.overshoot_min_samples < 3 {
            return Err(ComputeError::InvalidConfig(
                "overshootMinSamples must be at least 3".to_string(),
            ));
        }
        if !(self.hold_min_ms.is_finite() && self.hold_max_ms.is_finite())
            || self.hold_min_ms < 0.0
            || self.hold_min_ms >= self.hold_max_ms
        {
            return Err(ComputeError::InvalidConfig(format!(
                "hold bounds must satisfy 0 <= min < max, got [{}, {}]",
                self.hold_min_ms, self.hold_max_ms
            )));
        }
        if self.hold_min_filtered == 0 || self.hold_iqr_min_samples < 4 {
            return Err(ComputeError::InvalidConfig(
                "holdMinFiltered must be positive and holdIqrMinSamples at least 4".to_string(),
            ));
        }
        if !(self.pause_floor_ms.is_finite() && self.pause_floor_ms > 0.0)
            || !(self.deep_pause_ms.is_finite() && self.deep_pause_ms > 0.0)
        {
            return Err(ComputeError::InvalidConfig(
                "pause thresholds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
