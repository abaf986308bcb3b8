//! [`OffloadPolicy`] adapter around a [`HybridPolicy`].

use tch::{Device, Tensor};

use super::actor::HybridPolicy;
use super::rows_to_tensor;
use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::policy::trait_::check_batch;
use crate::algorithms::rl::policy::{BatchDecisions, OffloadPolicy};
use crate::algorithms::rl::sanitize::scatter_rows;
use crate::algorithms::rl::types::OffloadDecision;

/// Neural offloading policy.
///
/// Can operate in greedy (argmax destination, squashed mean parameters) or
/// stochastic (sample) mode. Inference runs without gradient tracking.
pub struct NeuralOffloadPolicy {
    policy: HybridPolicy,
    greedy: bool,
}

impl NeuralOffloadPolicy {
    /// Creates a freshly initialized policy.
    pub fn new(config: OffloadConfig, device: Device) -> Result<Self, OffloadError> {
        Ok(Self::from_policy(HybridPolicy::new(config, device)?))
    }

    /// Wraps an existing (e.g. trained or loaded) policy.
    pub fn from_policy(policy: HybridPolicy) -> Self {
        Self {
            policy,
            greedy: false,
        }
    }

    /// Sets greedy mode (argmax vs sampling).
    pub fn set_greedy(&mut self, greedy: bool) {
        self.greedy = greedy;
    }

    /// Returns a reference to the underlying actor network.
    pub fn policy(&self) -> &HybridPolicy {
        &self.policy
    }

    /// Returns a mutable reference to the underlying actor network.
    pub fn policy_mut(&mut self) -> &mut HybridPolicy {
        &mut self.policy
    }

    fn act(
        &self,
        state: &Tensor,
        preference: &Tensor,
    ) -> Result<(Tensor, Tensor, Vec<usize>), OffloadError> {
        tch::no_grad(|| -> Result<(Tensor, Tensor, Vec<usize>), OffloadError> {
            if self.greedy {
                let a = self.policy.deterministic(state, preference)?;
                Ok((a.discrete, a.continuous, a.rows))
            } else {
                let s = self.policy.sample(state, preference)?;
                Ok((s.discrete, s.continuous, s.rows))
            }
        })
    }
}

impl OffloadPolicy for NeuralOffloadPolicy {
    fn decide(
        &mut self,
        states: &[Vec<f64>],
        preferences: &[Vec<f64>],
    ) -> Result<BatchDecisions, OffloadError> {
        let config = self.policy.config();
        // NaN rows are dropped and logged by the actor itself.
        check_batch(config, states, preferences)?;

        let state = rows_to_tensor("state", states, config.state_dim)?;
        let preference = rows_to_tensor("preference", preferences, config.objectives)?;
        let (discrete, continuous, rows) = self.act(&state, &preference)?;

        let layout = self.policy.layout();
        let discrete: Vec<i64> = Vec::try_from(&discrete.flatten(0, -1))?;
        let continuous: Vec<f64> = Vec::try_from(&continuous.flatten(0, -1))?;

        let outputs = discrete
            .chunks(layout.devices())
            .zip(continuous.chunks(layout.continuous_selected_dim()))
            .map(|(dis, con)| {
                let idx: Vec<usize> = dis.iter().map(|&i| i as usize).collect();
                layout.decode(&idx, con)
            })
            .collect::<Result<Vec<Vec<OffloadDecision>>, OffloadError>>()?;

        Ok(scatter_rows(&rows, outputs, states.len()))
    }

    fn name(&self) -> &str {
        if self.greedy {
            "neural_greedy"
        } else {
            "neural"
        }
    }
}
