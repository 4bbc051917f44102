// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Perform arbitration between a number of interfaces.
//!
//! The decision is made by an [ArbiterFsm] which holds no ports, so a model
//! whose inputs carry different types can sample their valid signals and
//! drive it directly.
//!
//! Each cycle at most one requesting input is granted and the grant only
//! completes when the output can accept. Inputs that lose keep their value.

use std::fmt;
use std::rc::Rc;

use fabric_track::entity::Entity;
use fabric_track::trace;

pub mod policy;

/// An arbitration policy.
pub trait Arbitrate {
    /// Choose one of the inputs whose `requests` entry is set. Must not change
    /// the policy state as the grant may not complete.
    fn select(&self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize>;

    /// The grant to `index` has completed.
    fn granted(&mut self, index: usize);
}

/// The outcome of one arbitration cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrantState {
    /// No input requesting.
    #[default]
    Idle,

    /// The input was selected and transferred to the output.
    Granted(usize),

    /// The input was selected but the output could not accept.
    Blocked(usize),
}

impl fmt::Display for GrantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantState::Idle => write!(f, "idle"),
            GrantState::Granted(i) => write!(f, "granted {i}"),
            GrantState::Blocked(i) => write!(f, "blocked {i}"),
        }
    }
}

pub struct ArbiterFsm {
    policy: Box<dyn Arbitrate>,
    state: GrantState,
}

impl ArbiterFsm {
    #[must_use]
    pub fn new(policy: Box<dyn Arbitrate>) -> Self {
        Self {
            policy,
            state: GrantState::Idle,
        }
    }

    /// The state after the most recent [step](ArbiterFsm::step).
    #[must_use]
    pub fn state(&self) -> GrantState {
        self.state
    }

    /// Arbitrate for one cycle. The policy only moves on if the grant
    /// transfers.
    pub fn step(
        &mut self,
        entity: &Rc<Entity>,
        requests: &[bool],
        output_ready: bool,
    ) -> GrantState {
        let next = match self.policy.select(entity, requests) {
            None => GrantState::Idle,
            Some(index) if output_ready => {
                self.policy.granted(index);
                GrantState::Granted(index)
            }
            Some(index) => GrantState::Blocked(index),
        };
        if next != self.state {
            trace!(entity ; "{} -> {}", self.state, next);
        }
        self.state = next;
        next
    }
}
