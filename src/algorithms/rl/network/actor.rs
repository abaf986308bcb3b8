//! Hybrid discrete-continuous actor.
//!
//! For every device slot the actor emits categorical logits over the `S + 1`
//! destinations and a 2-D Gaussian for every destination. Sampling draws the
//! destination and the per-candidate parameters jointly, then gathers the
//! parameter pair of the chosen destination.

use std::path::Path;

use tch::{nn, nn::Module, Device, Kind, Tensor};

use super::{
    batch_of, bounded_std, ensure_finite, same_batch, squash, xavier_linear, LN_SQRT_2PI,
};
use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::layout::ActionLayout;
use crate::algorithms::rl::sanitize::validity_mask;

const PAIR: i64 = OffloadConfig::PARAMS_PER_CANDIDATE as i64;

/// Output of [`HybridPolicy::sample`].
///
/// Every tensor has one row per *retained* input row; `rows[i]` is the
/// input index of output row `i`. Shapes, with `n = rows.len()`:
///
/// | field | shape |
/// |---|---|
/// | `continuous_raw` | `[n, D * (S + 1) * 2]` |
/// | `continuous_raw_log_prob` | `[n, D * (S + 1)]` |
/// | `continuous` | `[n, D * 2]` |
/// | `discrete` | `[n, D]` (`Int64`) |
/// | `continuous_log_prob` | `[n, D * 2]` |
/// | `discrete_log_prob` | `[n, D, S + 1]` |
/// | `discrete_probs` | `[n, D, S + 1]` |
#[derive(Debug)]
pub struct PolicySample {
    /// Squashed parameters for every (slot, destination) candidate.
    pub continuous_raw: Tensor,
    /// Log-density of each candidate's parameter pair.
    pub continuous_raw_log_prob: Tensor,
    /// Parameter pair of the chosen destination, per slot.
    pub continuous: Tensor,
    /// Chosen destination per slot, in `[0, S]`.
    pub discrete: Tensor,
    /// Per-coordinate log-density of `continuous`.
    pub continuous_log_prob: Tensor,
    /// `log(p + ε)` for every destination of every slot.
    pub discrete_log_prob: Tensor,
    /// Categorical probabilities for every slot.
    pub discrete_probs: Tensor,
    /// Input row index of each output row.
    pub rows: Vec<usize>,
}

impl PolicySample {
    /// Number of retained rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-input-row flags telling which rows were evaluated.
    pub fn validity(&self, batch: usize) -> Vec<bool> {
        validity_mask(&self.rows, batch)
    }
}

/// Output of [`HybridPolicy::deterministic`]: argmax destinations and the
/// squashed Gaussian means of the chosen candidates.
#[derive(Debug)]
pub struct GreedyAction {
    pub continuous: Tensor,
    pub discrete: Tensor,
    pub rows: Vec<usize>,
}

/// Actor network over the hybrid action space.
///
/// Architecture: `(s_dim + W) → hidden → hidden` shared trunk with ReLU,
/// followed by three linear heads (discrete logits, Gaussian mean, Gaussian
/// log-std).
pub struct HybridPolicy {
    vs: nn::VarStore,
    l1: nn::Linear,
    l2: nn::Linear,
    discrete_head: nn::Linear,
    mean_head: nn::Linear,
    log_std_head: nn::Linear,
    config: OffloadConfig,
    layout: ActionLayout,
}

impl HybridPolicy {
    /// Creates a new policy on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`OffloadError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: OffloadConfig, device: Device) -> Result<Self, OffloadError> {
        config.validate()?;
        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let hidden = config.hidden_dim;
        let l1 = xavier_linear(p / "l1", config.policy_input_dim(), hidden);
        let l2 = xavier_linear(p / "l2", hidden, hidden);
        let discrete_head = xavier_linear(p / "pi_d", hidden, config.discrete_logits_dim());
        let mean_head = xavier_linear(p / "mean", hidden, config.continuous_raw_dim());
        let log_std_head = xavier_linear(p / "log_std", hidden, config.continuous_raw_dim());
        let layout = ActionLayout::from_config(&config);

        Ok(Self {
            vs,
            l1,
            l2,
            discrete_head,
            mean_head,
            log_std_head,
            config,
            layout,
        })
    }

    /// Forward pass on an already sanitized `[n, s_dim + W]` input.
    ///
    /// Returns `(discrete_logits, mean, log_std)` with the log-std clamped.
    pub fn forward(&self, input: &Tensor) -> (Tensor, Tensor, Tensor) {
        let x = self.l1.forward(input).relu();
        let x = self.l2.forward(&x).relu();
        let logits = self.discrete_head.forward(&x);
        let mean = self.mean_head.forward(&x);
        let (log_std, _) = bounded_std(
            &self.log_std_head.forward(&x),
            self.config.log_std_min,
            self.config.log_std_max,
        );
        (logits, mean, log_std)
    }

    /// Samples a joint hybrid action.
    ///
    /// Rows whose state or preference contains NaN are dropped before any
    /// distribution is built; see [`PolicySample::rows`]. A batch where every
    /// row is dropped produces zero-row tensors.
    ///
    /// # Arguments
    ///
    /// * `state` - `[batch, s_dim]`
    /// * `preference` - `[batch, W]`, paired with `state` by row
    ///
    /// # Errors
    ///
    /// Returns [`OffloadError::NonFinite`] when a retained row (for instance
    /// one holding an infinity) drives the network to inf or NaN outputs.
    pub fn sample(
        &self,
        state: &Tensor,
        preference: &Tensor,
    ) -> Result<PolicySample, OffloadError> {
        let (input, rows) = self.sanitized_input(state, preference)?;
        let n = rows.len() as i64;
        let d = self.layout.devices() as i64;
        let k = self.layout.destinations() as i64;
        let eps = self.config.epsilon;

        let (logits, mean, log_std) = self.checked_forward(&input, &rows)?;
        let std = log_std.exp();

        // Reparameterized draw: gradients reach mean and std through x_t.
        let noise = mean.randn_like();
        let x_t = &mean + &std * &noise;
        let continuous_raw = squash(&x_t, self.config.squash_margin);

        // N(mean, std) density of x_t, written in terms of the noise.
        let gaussian_log_prob = noise.square() * -0.5 - &log_std - LN_SQRT_2PI;
        let squash_correction = (continuous_raw.square().neg() + (1.0 + eps)).log();
        let coord_log_prob = gaussian_log_prob - squash_correction;

        let discrete_probs = logits.reshape([n, d, k]).softmax(-1, Kind::Float);
        let discrete = if n == 0 {
            Tensor::zeros([0, d], (Kind::Int64, input.device()))
        } else {
            discrete_probs
                .reshape([n * d, k])
                .f_multinomial(1, true)?
                .reshape([n, d])
        };
        let discrete_log_prob = (&discrete_probs + eps).log();

        let continuous = self.select(&continuous_raw, &discrete);
        let continuous_log_prob = self.select(&coord_log_prob, &discrete);
        let continuous_raw_log_prob = coord_log_prob
            .reshape([n, d * k, PAIR])
            .sum_dim_intlist([-1].as_slice(), false, Kind::Float);

        Ok(PolicySample {
            continuous_raw,
            continuous_raw_log_prob,
            continuous,
            discrete,
            continuous_log_prob,
            discrete_log_prob,
            discrete_probs,
            rows,
        })
    }

    /// Greedy action: most probable destination per slot and the squashed
    /// mean of its parameter pair. Applies the same NaN sanitation as
    /// [`sample`](Self::sample).
    pub fn deterministic(
        &self,
        state: &Tensor,
        preference: &Tensor,
    ) -> Result<GreedyAction, OffloadError> {
        let (input, rows) = self.sanitized_input(state, preference)?;
        let n = rows.len() as i64;
        let d = self.layout.devices() as i64;
        let k = self.layout.destinations() as i64;

        let (logits, mean, _) = self.checked_forward(&input, &rows)?;
        let discrete = logits.reshape([n, d, k]).argmax(-1, false);
        let means = squash(&mean, self.config.squash_margin);
        let continuous = self.select(&means, &discrete);

        Ok(GreedyAction {
            continuous,
            discrete,
            rows,
        })
    }

    fn checked_forward(
        &self,
        input: &Tensor,
        rows: &[usize],
    ) -> Result<(Tensor, Tensor, Tensor), OffloadError> {
        let (logits, mean, log_std) = self.forward(input);
        ensure_finite("discrete logits", &logits, rows)?;
        ensure_finite("mean", &mean, rows)?;
        ensure_finite("log-std", &log_std, rows)?;
        Ok((logits, mean, log_std))
    }

    /// Gathers, per slot, the pair at offset `slot * (S + 1) * 2 + index * 2`
    /// of a `[n, D * (S + 1) * 2]` tensor.
    fn select(&self, per_candidate: &Tensor, discrete: &Tensor) -> Tensor {
        let n = discrete.size()[0];
        let d = self.layout.devices() as i64;
        let k = self.layout.destinations() as i64;
        let index = discrete
            .reshape([n, d, 1, 1])
            .expand([n, d, 1, PAIR], false);
        per_candidate
            .reshape([n, d, k, PAIR])
            .gather(2, &index, false)
            .reshape([n, d * PAIR])
    }

    /// Validates shapes, joins state and preference, and drops rows holding
    /// NaN. Returns the surviving input and their original row indices.
    fn sanitized_input(
        &self,
        state: &Tensor,
        preference: &Tensor,
    ) -> Result<(Tensor, Vec<usize>), OffloadError> {
        let batch = batch_of("state", state, self.config.state_dim)?;
        let pref_batch = batch_of("preference", preference, self.config.objectives)?;
        same_batch("preference", batch, pref_batch)?;

        let device = self.vs.device();
        let joined = Tensor::cat(
            &[
                state.to_device(device).to_kind(Kind::Float),
                preference.to_device(device).to_kind(Kind::Float),
            ],
            1,
        );
        let keep = joined
            .isnan()
            .any_dim(1, false)
            .logical_not()
            .nonzero()
            .squeeze_dim(1);
        let rows: Vec<i64> = Vec::try_from(&keep)?;
        if rows.len() < batch {
            log::debug!(
                "policy input: excluded {} of {} rows containing NaN",
                batch - rows.len(),
                batch
            );
        }

        Ok((
            joined.index_select(0, &keep),
            rows.into_iter().map(|r| r as usize).collect(),
        ))
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    pub fn layout(&self) -> ActionLayout {
        self.layout
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    /// Returns a mutable reference to the variable store for optimization.
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Returns a reference to the variable store.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Writes the parameters to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OffloadError> {
        self.vs.save(path)?;
        Ok(())
    }

    /// Loads parameters previously written by [`save`](Self::save).
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), OffloadError> {
        self.vs.load(path)?;
        Ok(())
    }
}
