//! Offloading decisions via a hybrid multi-objective actor-critic.
//!
//! Action layout, decision decoding, NaN sanitation, preference utilities
//! and the baseline policies need no extra dependencies. The neural actor
//! and critic require the `rl-nn` feature flag (libtorch through `tch`).
//!
//! The environment that turns decisions into rewards and the training loop
//! that fits the networks live outside this crate.

pub mod config;
pub mod error;
pub mod layout;
pub mod policy;
pub mod preference;
pub mod sanitize;
pub mod types;

#[cfg(feature = "rl-nn")]
pub mod network;

pub use config::OffloadConfig;
pub use error::OffloadError;
pub use layout::{argmax, ActionLayout};
pub use policy::{BatchDecisions, LocalOnlyPolicy, OffloadPolicy, RandomOffloadPolicy};
pub use preference::{is_on_simplex, sample_preference, scalarize, uniform_preference};
pub use sanitize::{retained_rows, scatter_rows, validity_mask};
pub use types::{Destination, OffloadDecision};

#[cfg(feature = "rl-nn")]
pub use network::{
    pessimistic_scalarized, rows_to_tensor, scalarize_tensor, GreedyAction, HybridPolicy,
    NeuralOffloadPolicy, PolicySample, TwinVectorCritic,
};
