// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Round Robin arbitration policy

use std::rc::Rc;

use fabric_track::entity::Entity;

use crate::arbiter::Arbitrate;

pub struct RoundRobin {
    num_inputs: usize,
    candidate: usize,
}

impl RoundRobin {
    #[must_use]
    pub fn new(num_inputs: usize) -> Self {
        Self {
            num_inputs,
            candidate: 0,
        }
    }
}

impl Arbitrate for RoundRobin {
    fn select(&self, _entity: &Rc<Entity>, requests: &[bool]) -> Option<usize> {
        let num_inputs = requests.len().min(self.num_inputs);
        (0..num_inputs)
            .map(|i| (i + self.candidate) % num_inputs)
            .find(|&index| requests[index])
    }

    fn granted(&mut self, index: usize) {
        self.candidate = (index + 1) % self.num_inputs;
    }
}
