//! edge_offload - hybrid actor-critic decisions for edge task offloading
//!
//! Per device slot, an agent decides whether a computation runs locally or on
//! one of several edge servers, together with two continuous resource
//! requests. The neural decision engine (a hybrid discrete-continuous policy
//! and a twin per-objective critic, both conditioned on a preference vector
//! over objectives) lives behind the `rl-nn` feature; action layout,
//! decoding, preference utilities and baseline policies are always available.

pub mod algorithms;
