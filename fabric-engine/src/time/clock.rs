// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! This module represents the time during a simulation.
//!
//! Time is a count of clock ticks. Each clock edge first resolves all the
//! state that was modified during the cycle and then advances the count.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::traits::Resolve;

#[derive(Clone)]
/// State representing a clock.
pub struct Clock {
    /// Frequency of the clock in MHz.
    freq_mhz: f64,

    pub shared_state: Rc<ClockState>,
}

/// Shared state between all users of a Clock.
pub struct ClockState {
    now: Cell<u64>,

    /// Registered [`Resolve`] functions for the current cycle.
    pub to_resolve: RefCell<Vec<Rc<dyn Resolve + 'static>>>,
}

impl ClockState {
    fn resolve(&self) {
        // Take the list first so that a resolve can register for the next cycle
        let to_resolve: Vec<_> = self.to_resolve.borrow_mut().drain(..).collect();
        for r in to_resolve {
            r.resolve();
        }
    }
}

impl Clock {
    /// Create a new [Clock] at the specified frequency.
    #[must_use]
    pub fn new(freq_mhz: f64) -> Self {
        let shared_state = Rc::new(ClockState {
            now: Cell::new(0),
            to_resolve: RefCell::new(Vec::new()),
        });

        Self {
            freq_mhz,
            shared_state,
        }
    }

    /// Returns the clocks frequency in MHz.
    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    /// Returns the current tick.
    #[must_use]
    pub fn tick_now(&self) -> u64 {
        self.shared_state.now.get()
    }

    /// Returns the current time in `ns`.
    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.to_ns(self.tick_now())
    }

    /// Convert the given tick to a time in `ns` for this clock.
    #[must_use]
    pub fn to_ns(&self, tick: u64) -> f64 {
        tick as f64 / self.freq_mhz * 1000.0
    }

    /// Request that `resolve` is called at the next clock edge.
    pub fn resolve_on_tick(&self, resolve: Rc<dyn Resolve + 'static>) {
        self.shared_state.to_resolve.borrow_mut().push(resolve);
    }

    /// Perform the clock edge: resolve all pending state and move to the next
    /// tick.
    pub fn advance(&self) {
        self.shared_state.resolve();
        self.shared_state.now.set(self.tick_now() + 1);
    }
}
