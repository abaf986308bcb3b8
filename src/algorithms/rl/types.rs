//! Core types for offloading decisions.
//!
//! Defines where a device's computation runs and the decoded per-device
//! decision handed to the environment.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Execution target for one device slot.
///
/// In the flat discrete encoding, servers occupy indices `0..S` and local
/// execution is index `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Destination {
    /// Offload to the server with this index.
    Server(usize),
    /// Run on the device itself.
    Local,
}

impl Destination {
    /// Decodes a discrete action index given the number of servers.
    ///
    /// Returns `None` if `index > servers`.
    pub fn from_index(index: usize, servers: usize) -> Option<Self> {
        match index {
            i if i < servers => Some(Destination::Server(i)),
            i if i == servers => Some(Destination::Local),
            _ => None,
        }
    }

    /// Encodes this destination as a discrete action index.
    pub fn index(&self, servers: usize) -> usize {
        match self {
            Destination::Server(i) => *i,
            Destination::Local => servers,
        }
    }

    /// Returns true if the computation stays on the device.
    pub fn is_local(&self) -> bool {
        matches!(self, Destination::Local)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Server(i) => write!(f, "server-{}", i),
            Destination::Local => write!(f, "local"),
        }
    }
}

/// Decoded action for a single device slot.
///
/// `params` are the two continuous controls of the chosen destination, both
/// in `(0, 1)`. The environment decides how to interpret them and whether to
/// admit the implied offload.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OffloadDecision {
    /// Device slot this decision belongs to.
    pub device: usize,
    /// Where the computation runs.
    pub destination: Destination,
    /// `[compute_share, bandwidth_share]`.
    pub params: [f64; 2],
}

impl OffloadDecision {
    /// Requested fraction of the destination's CPU frequency.
    pub fn compute_share(&self) -> f64 {
        self.params[0]
    }

    /// Requested fraction of the uplink bandwidth.
    pub fn bandwidth_share(&self) -> f64 {
        self.params[1]
    }
}

impl fmt::Display for OffloadDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} -> {} (cpu {:.3}, bw {:.3})",
            self.device, self.destination, self.params[0], self.params[1]
        )
    }
}
