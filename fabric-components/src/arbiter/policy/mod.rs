// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Arbitration policies

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arbiter::Arbitrate;

pub mod fixed_priority;
pub mod round_robin;

pub use fixed_priority::FixedPriority;
pub use round_robin::RoundRobin;

#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArbitrationPolicy {
    /// Lowest index always wins
    FixedPriority,

    /// Rotate priority past each completed grant
    #[default]
    RoundRobin,
}

impl ArbitrationPolicy {
    #[must_use]
    pub fn build(self, num_inputs: usize) -> Box<dyn Arbitrate> {
        match self {
            ArbitrationPolicy::FixedPriority => Box::new(FixedPriority::new()),
            ArbitrationPolicy::RoundRobin => Box::new(RoundRobin::new(num_inputs)),
        }
    }
}

impl fmt::Display for ArbitrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitrationPolicy::FixedPriority => write!(f, "fixed-priority"),
            ArbitrationPolicy::RoundRobin => write!(f, "round-robin"),
        }
    }
}
