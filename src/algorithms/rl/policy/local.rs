//! Local-only baseline.
//!
//! Keeps every computation on its device with fixed resource requests.
//! Useful as the "no offloading" reference point when comparing learned
//! policies.

use super::trait_::{validate_batch, BatchDecisions, OffloadPolicy};
use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::sanitize::scatter_rows;
use crate::algorithms::rl::types::{Destination, OffloadDecision};

/// Runs everything locally with constant parameters.
pub struct LocalOnlyPolicy {
    config: OffloadConfig,
    params: [f64; 2],
}

impl LocalOnlyPolicy {
    /// Creates the baseline with the given `[compute_share, bandwidth_share]`.
    ///
    /// Parameters are clamped into `[margin, 1 - margin]`.
    pub fn new(config: OffloadConfig, params: [f64; 2]) -> Result<Self, OffloadError> {
        config.validate()?;
        let lo = config.squash_margin;
        let hi = 1.0 - config.squash_margin;
        let params = [params[0].clamp(lo, hi), params[1].clamp(lo, hi)];
        Ok(Self { config, params })
    }
}

impl OffloadPolicy for LocalOnlyPolicy {
    fn decide(
        &mut self,
        states: &[Vec<f64>],
        preferences: &[Vec<f64>],
    ) -> Result<BatchDecisions, OffloadError> {
        let rows = validate_batch(&self.config, states, preferences)?;
        let outputs: Vec<Vec<OffloadDecision>> = rows
            .iter()
            .map(|_| {
                (0..self.config.devices)
                    .map(|device| OffloadDecision {
                        device,
                        destination: Destination::Local,
                        params: self.params,
                    })
                    .collect()
            })
            .collect();
        Ok(scatter_rows(&rows, outputs, states.len()))
    }

    fn name(&self) -> &str {
        "local_only"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_runs_locally() {
        let config = OffloadConfig {
            devices: 3,
            state_dim: 2,
            ..OffloadConfig::default()
        };
        let mut policy = LocalOnlyPolicy::new(config, [1.0, 0.5]).unwrap();
        let out = policy
            .decide(&[vec![0.0, 1.0]], &[vec![0.5, 0.5]])
            .unwrap();
        let row = out[0].as_ref().unwrap();
        assert_eq!(row.len(), 3);
        assert!(row.iter().all(|d| d.destination.is_local()));
        // clamped strictly below 1
        assert!(row[0].params[0] < 1.0);
        assert_eq!(row[0].params[1], 0.5);
    }

    #[test]
    fn batch_mismatch_is_rejected() {
        let config = OffloadConfig {
            state_dim: 2,
            ..OffloadConfig::default()
        };
        let mut policy = LocalOnlyPolicy::new(config, [0.5, 0.5]).unwrap();
        let err = policy
            .decide(&[vec![0.0, 1.0], vec![0.0, 1.0]], &[vec![0.5, 0.5]])
            .unwrap_err();
        assert!(matches!(err, OffloadError::BatchMismatch { .. }));
    }
}
