//! Random policy for testing and baselines.

use rand::Rng;

use super::trait_::{validate_batch, BatchDecisions, OffloadPolicy};
use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::sanitize::scatter_rows;
use crate::algorithms::rl::types::{Destination, OffloadDecision};

/// Uniformly random offloading.
///
/// Each device independently picks a destination from `[0, S]` and two
/// parameters uniformly inside `(0, 1)`. Used for sanity checks and as a
/// lower-bound baseline.
pub struct RandomOffloadPolicy {
    config: OffloadConfig,
}

impl RandomOffloadPolicy {
    /// Creates a new random policy.
    pub fn new(config: OffloadConfig) -> Result<Self, OffloadError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl OffloadPolicy for RandomOffloadPolicy {
    fn decide(
        &mut self,
        states: &[Vec<f64>],
        preferences: &[Vec<f64>],
    ) -> Result<BatchDecisions, OffloadError> {
        let rows = validate_batch(&self.config, states, preferences)?;
        let mut rng = rand::thread_rng();
        let lo = self.config.squash_margin;
        let hi = 1.0 - self.config.squash_margin;
        let servers = self.config.servers;

        let outputs: Vec<Vec<OffloadDecision>> = rows
            .iter()
            .map(|_| {
                (0..self.config.devices)
                    .map(|device| {
                        let index = rng.gen_range(0..=servers);
                        OffloadDecision {
                            device,
                            destination: Destination::from_index(index, servers)
                                .unwrap_or(Destination::Local),
                            params: [rng.gen_range(lo..hi), rng.gen_range(lo..hi)],
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(scatter_rows(&rows, outputs, states.len()))
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OffloadConfig {
        OffloadConfig {
            devices: 2,
            servers: 2,
            objectives: 2,
            state_dim: 4,
            ..OffloadConfig::default()
        }
    }

    #[test]
    fn random_policy_returns_one_row_per_input() {
        let mut policy = RandomOffloadPolicy::new(config()).unwrap();
        let states = vec![vec![0.0; 4]; 5];
        let prefs = vec![vec![0.5; 2]; 5];
        let out = policy.decide(&states, &prefs).unwrap();
        assert_eq!(out.len(), 5);
        for row in out {
            assert_eq!(row.unwrap().len(), 2);
        }
    }

    #[test]
    fn random_policy_actions_in_range() {
        let mut policy = RandomOffloadPolicy::new(config()).unwrap();
        let states = vec![vec![0.0; 4]; 100];
        let prefs = vec![vec![0.5; 2]; 100];
        for row in policy.decide(&states, &prefs).unwrap() {
            for d in row.unwrap() {
                assert!(d.destination.index(2) <= 2);
                assert!(d.params.iter().all(|&p| p > 0.0 && p < 1.0));
            }
        }
    }

    #[test]
    fn nan_rows_yield_none() {
        let mut policy = RandomOffloadPolicy::new(config()).unwrap();
        let states = vec![vec![0.0; 4], vec![f64::NAN; 4]];
        let prefs = vec![vec![0.5; 2]; 2];
        let out = policy.decide(&states, &prefs).unwrap();
        assert!(out[0].is_some());
        assert!(out[1].is_none());
    }

    #[test]
    fn rejects_wrong_state_width() {
        let mut policy = RandomOffloadPolicy::new(config()).unwrap();
        let err = policy
            .decide(&[vec![0.0; 3]], &[vec![0.5; 2]])
            .unwrap_err();
        assert_eq!(
            err,
            OffloadError::ShapeMismatch {
                input: "state",
                expected: 4,
                actual: 3
            }
        );
    }
}
