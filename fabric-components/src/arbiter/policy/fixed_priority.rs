// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Fixed priority arbitration policy

use std::rc::Rc;

use fabric_track::entity::Entity;

use crate::arbiter::Arbitrate;

#[derive(Default)]
pub struct FixedPriority {}

impl FixedPriority {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }
}

impl Arbitrate for FixedPriority {
    fn select(&self, _entity: &Rc<Entity>, requests: &[bool]) -> Option<usize> {
        requests.iter().position(|&r| r)
    }

    fn granted(&mut self, _index: usize) {}
}
