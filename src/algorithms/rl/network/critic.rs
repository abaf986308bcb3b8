//! Twin per-objective critic.
//!
//! Each head maps `(state, action encoding, preference)` to one value per
//! objective. The two heads share an architecture but never parameters.
//! Scalarization against the preference and any pessimistic combination of
//! the heads are left to the caller; helpers for both are provided here.

use std::path::Path;

use tch::{nn, nn::Module, Device, Kind, Tensor};

use super::{batch_of, same_batch, xavier_linear};
use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::layout::ActionLayout;

const PAIR: i64 = OffloadConfig::PARAMS_PER_CANDIDATE as i64;

/// One value head: `input → hidden → hidden → W` with ReLU activations.
#[derive(Debug)]
struct VectorHead {
    l1: nn::Linear,
    l2: nn::Linear,
    out: nn::Linear,
}

impl VectorHead {
    fn new(p: nn::Path<'_>, input_dim: usize, hidden: usize, objectives: usize) -> Self {
        Self {
            l1: xavier_linear(&p / "l1", input_dim, hidden),
            l2: xavier_linear(&p / "l2", hidden, hidden),
            out: xavier_linear(&p / "out", hidden, objectives),
        }
    }

    fn forward(&self, x: &Tensor) -> Tensor {
        let x = self.l1.forward(x).relu();
        let x = self.l2.forward(&x).relu();
        self.out.forward(&x)
    }
}

/// Twin critic producing two `[batch, W]` value estimates.
///
/// Input width is `s_dim + D * 2 + D * (S + 1) + W`.
pub struct TwinVectorCritic {
    vs: nn::VarStore,
    q1: VectorHead,
    q2: VectorHead,
    config: OffloadConfig,
    layout: ActionLayout,
}

impl TwinVectorCritic {
    /// Creates a new critic on `device`; both heads are initialized
    /// independently.
    pub fn new(config: OffloadConfig, device: Device) -> Result<Self, OffloadError> {
        config.validate()?;
        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let input_dim = config.critic_input_dim();
        let q1 = VectorHead::new(&root / "q1", input_dim, config.hidden_dim, config.objectives);
        let q2 = VectorHead::new(&root / "q2", input_dim, config.hidden_dim, config.objectives);
        let layout = ActionLayout::from_config(&config);

        Ok(Self {
            vs,
            q1,
            q2,
            config,
            layout,
        })
    }

    /// Estimates per-objective values with both heads.
    ///
    /// # Arguments
    ///
    /// * `state` - `[batch, s_dim]`
    /// * `continuous` - selected parameters, `[batch, D * 2]`
    /// * `discrete` - destinations, `[batch, D]`, integral values in `[0, S]`
    /// * `preference` - `[batch, W]`
    ///
    /// # Errors
    ///
    /// [`OffloadError::ShapeMismatch`] / [`OffloadError::BatchMismatch`] for
    /// misshaped inputs and [`OffloadError::InvalidDiscreteIndex`] for a
    /// destination outside `[0, S]`.
    pub fn estimate(
        &self,
        state: &Tensor,
        continuous: &Tensor,
        discrete: &Tensor,
        preference: &Tensor,
    ) -> Result<(Tensor, Tensor), OffloadError> {
        let x = self.encode(state, continuous, discrete, preference)?;
        Ok((self.q1.forward(&x), self.q2.forward(&x)))
    }

    /// Builds the critic input `[state, slot blocks, preference]`, where each
    /// slot block is `[one_hot(destination, S + 1), pair(2)]`.
    pub fn encode(
        &self,
        state: &Tensor,
        continuous: &Tensor,
        discrete: &Tensor,
        preference: &Tensor,
    ) -> Result<Tensor, OffloadError> {
        let layout = &self.layout;
        let batch = batch_of("state", state, self.config.state_dim)?;
        let c_batch = batch_of(
            "continuous_selected",
            continuous,
            layout.continuous_selected_dim(),
        )?;
        same_batch("continuous_selected", batch, c_batch)?;
        let d_batch = batch_of("discrete", discrete, layout.devices())?;
        same_batch("discrete", batch, d_batch)?;
        let p_batch = batch_of("preference", preference, self.config.objectives)?;
        same_batch("preference", batch, p_batch)?;

        let values: Vec<f64> = Vec::try_from(&discrete.flatten(0, -1))?;
        for (row, chunk) in values.chunks(layout.devices()).enumerate() {
            layout.discrete_indices(row, chunk)?;
        }

        let device = self.vs.device();
        let n = batch as i64;
        let d = layout.devices() as i64;
        let k = layout.destinations() as i64;
        let one_hot = discrete
            .to_device(device)
            .to_kind(Kind::Int64)
            .one_hot(k)
            .to_kind(Kind::Float);
        let pairs = continuous
            .to_device(device)
            .to_kind(Kind::Float)
            .reshape([n, d, PAIR]);
        let action = Tensor::cat(&[one_hot, pairs], 2).reshape([n, d * (k + PAIR)]);

        Ok(Tensor::cat(
            &[
                state.to_device(device).to_kind(Kind::Float),
                action,
                preference.to_device(device).to_kind(Kind::Float),
            ],
            1,
        ))
    }

    /// Overwrites all parameters with those of `source` (hard target sync).
    pub fn copy_from(&mut self, source: &TwinVectorCritic) -> Result<(), OffloadError> {
        self.check_compatible(source)?;
        self.vs.copy(&source.vs)?;
        Ok(())
    }

    /// Polyak update `θ ← (1 − τ)·θ + τ·θ_source` for a slowly tracking
    /// target copy.
    pub fn soft_update(&mut self, source: &TwinVectorCritic, tau: f64) -> Result<(), OffloadError> {
        if !(0.0..=1.0).contains(&tau) {
            return Err(OffloadError::InvalidConfig(format!(
                "soft update rate must lie in [0, 1], got {tau}"
            )));
        }
        self.check_compatible(source)?;
        let src = source.vs.variables();
        tch::no_grad(|| -> Result<(), OffloadError> {
            for (name, mut dst) in self.vs.variables() {
                let s = src
                    .get(&name)
                    .ok_or_else(|| OffloadError::Backend(format!("missing variable {name}")))?;
                let mixed = &dst * (1.0 - tau) + s * tau;
                dst.copy_(&mixed);
            }
            Ok(())
        })
    }

    fn check_compatible(&self, other: &TwinVectorCritic) -> Result<(), OffloadError> {
        if self.config == other.config {
            Ok(())
        } else {
            Err(OffloadError::InvalidConfig(
                "critics were built from different configurations".into(),
            ))
        }
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    pub fn layout(&self) -> ActionLayout {
        self.layout
    }

    /// Returns a mutable reference to the variable store for optimization.
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Returns a reference to the variable store.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OffloadError> {
        self.vs.save(path)?;
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), OffloadError> {
        self.vs.load(path)?;
        Ok(())
    }
}

/// Dot product of `[batch, W]` values with `[batch, W]` preferences.
pub fn scalarize_tensor(values: &Tensor, preference: &Tensor) -> Tensor {
    (values * preference).sum_dim_intlist([-1].as_slice(), false, Kind::Float)
}

/// Element-wise minimum of the two scalarized heads, `[batch]`.
pub fn pessimistic_scalarized(q1: &Tensor, q2: &Tensor, preference: &Tensor) -> Tensor {
    scalarize_tensor(q1, preference).min_other(&scalarize_tensor(q2, preference))
}
