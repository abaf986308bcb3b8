//! Policy trait and implementations.

pub mod local;
pub mod random;
pub mod trait_;

pub use local::LocalOnlyPolicy;
pub use random::RandomOffloadPolicy;
pub use trait_::{BatchDecisions, OffloadPolicy};
