//! Configuration for the activation engine.

use serde::{Deserialize, Serialize};

use crate::error::{EngramError, EngramResult};

/// Parameters of the spreading activation walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// A node only propagates when its carried signal is above this value.
    pub cutoff: f64,

    /// Nodes whose final score is below this value are dropped.
    pub noise_floor: f64,

    /// Weight used for edges without an explicit weight (0..=100).
    pub default_weight: u8,

    /// Upper bound on propagation steps. Guards all-weight-100 cycles.
    pub max_hops: usize,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            cutoff: 0.2,
            noise_floor: 0.1,
            default_weight: 50,
            max_hops: 10,
        }
    }
}

impl ActivationConfig {
    pub fn validate(&self) -> EngramResult<()> {
        if !(0.0..=1.0).contains(&self.cutoff) {
            return Err(EngramError::Config(format!(
                "activation.cutoff must be within [0, 1], got {}",
                self.cutoff
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_floor) {
            return Err(EngramError::Config(format!(
                "activation.noise_floor must be within [0, 1], got {}",
                self.noise_floor
            )));
        }
        if self.default_weight > 100 {
            return Err(EngramError::Config(format!(
                "activation.default_weight must be at most 100, got {}",
                self.default_weight
            )));
        }
        if self.max_hops == 0 {
            return Err(EngramError::Config(
                "activation.max_hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
