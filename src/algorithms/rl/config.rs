//! Configuration for the offloading policy and critic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::OffloadError;

/// Deployment-time dimensions and numerical constants shared by the policy
/// and the critic.
///
/// Dimensions are fixed per deployment; nothing here is negotiated at
/// runtime.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OffloadConfig {
    // --- Action space ---
    /// Number of independently decided device slots `D`.
    pub devices: usize,
    /// Number of candidate servers `S`; each slot has `S + 1` destinations.
    pub servers: usize,

    // --- Conditioning ---
    /// Number of objectives `W` (width of preference and value vectors).
    pub objectives: usize,
    /// Width of one state row.
    pub state_dim: usize,

    // --- Function approximation ---
    /// Hidden width of the policy trunk and of each critic head.
    pub hidden_dim: usize,

    // --- Numerics ---
    /// Lower clamp bound for the Gaussian log-standard-deviation.
    pub log_std_min: f64,
    /// Upper clamp bound for the Gaussian log-standard-deviation.
    pub log_std_max: f64,
    /// Additive constant inside every log of a probability or squashed value.
    pub epsilon: f64,
    /// Squashed values are kept in `[margin, 1 - margin]`.
    pub squash_margin: f64,
}

impl OffloadConfig {
    /// Candidate destinations per slot: `S` servers plus local execution.
    pub fn destinations(&self) -> usize {
        self.servers + 1
    }

    /// Width of the flattened discrete logits, `D * (S + 1)`.
    pub fn discrete_logits_dim(&self) -> usize {
        self.devices * self.destinations()
    }

    /// Width of the per-candidate continuous action, `D * (S + 1) * 2`.
    pub fn continuous_raw_dim(&self) -> usize {
        self.discrete_logits_dim() * Self::PARAMS_PER_CANDIDATE
    }

    /// Width of the selected continuous action, `D * 2`.
    pub fn continuous_selected_dim(&self) -> usize {
        self.devices * Self::PARAMS_PER_CANDIDATE
    }

    /// Width of the policy input, `s_dim + W`.
    pub fn policy_input_dim(&self) -> usize {
        self.state_dim + self.objectives
    }

    /// Width of the critic input, `s_dim + D * 2 + D * (S + 1) + W`.
    pub fn critic_input_dim(&self) -> usize {
        self.state_dim
            + self.continuous_selected_dim()
            + self.discrete_logits_dim()
            + self.objectives
    }

    /// Continuous parameters per (slot, destination) pair.
    pub const PARAMS_PER_CANDIDATE: usize = 2; // compute share, bandwidth share

    /// Checks that the configuration describes a usable action space.
    pub fn validate(&self) -> Result<(), OffloadError> {
        if self.devices == 0 {
            return Err(OffloadError::InvalidConfig(
                "at least one device slot is required".into(),
            ));
        }
        if self.objectives == 0 {
            return Err(OffloadError::InvalidConfig(
                "at least one objective is required".into(),
            ));
        }
        if self.state_dim == 0 {
            return Err(OffloadError::InvalidConfig(
                "state width must be positive".into(),
            ));
        }
        if self.hidden_dim == 0 {
            return Err(OffloadError::InvalidConfig(
                "hidden width must be positive".into(),
            ));
        }
        if self.log_std_min.is_nan()
            || self.log_std_max.is_nan()
            || self.log_std_min >= self.log_std_max
        {
            return Err(OffloadError::InvalidConfig(format!(
                "log-std bounds are inverted: [{}, {}]",
                self.log_std_min, self.log_std_max
            )));
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(OffloadError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if self.squash_margin.is_nan()
            || self.squash_margin <= 0.0
            || self.squash_margin >= 0.5
        {
            return Err(OffloadError::InvalidConfig(format!(
                "squash margin must lie in (0, 0.5), got {}",
                self.squash_margin
            )));
        }
        Ok(())
    }
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            devices: 3,
            servers: 2,
            objectives: 2,
            state_dim: 16,
            hidden_dim: 128,
            log_std_min: -20.0,
            log_std_max: 2.0,
            epsilon: 1e-8,
            squash_margin: 1e-6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> OffloadConfig {
        OffloadConfig {
            devices: 2,
            servers: 2,
            objectives: 2,
            state_dim: 4,
            ..OffloadConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = OffloadConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.log_std_min, -20.0);
        assert_eq!(cfg.log_std_max, 2.0);
        assert_eq!(cfg.epsilon, 1e-8);
    }

    #[test]
    fn derived_widths() {
        let cfg = small();
        assert_eq!(cfg.destinations(), 3);
        assert_eq!(cfg.discrete_logits_dim(), 6);
        assert_eq!(cfg.continuous_raw_dim(), 12);
        assert_eq!(cfg.continuous_selected_dim(), 4);
        assert_eq!(cfg.policy_input_dim(), 6);
        // 4 + 2*2 + 2*3 + 2
        assert_eq!(cfg.critic_input_dim(), 16);
    }

    #[test]
    fn zero_servers_still_has_local_destination() {
        let cfg = OffloadConfig {
            servers: 0,
            ..small()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.destinations(), 1);
    }

    #[test]
    fn rejects_degenerate_configs() {
        assert!(OffloadConfig {
            devices: 0,
            ..small()
        }
        .validate()
        .is_err());
        assert!(OffloadConfig {
            objectives: 0,
            ..small()
        }
        .validate()
        .is_err());
        assert!(OffloadConfig {
            log_std_min: 2.0,
            log_std_max: -20.0,
            ..small()
        }
        .validate()
        .is_err());
        assert!(OffloadConfig {
            squash_margin: 0.5,
            ..small()
        }
        .validate()
        .is_err());
        assert!(OffloadConfig {
            epsilon: f64::NAN,
            ..small()
        }
        .validate()
        .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let cfg = small();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: OffloadConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
