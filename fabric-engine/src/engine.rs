// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The simulation engine.
//!
//! The [`Engine`] owns the top-level [`Entity`], the default [`Clock`] and the
//! list of registered components. Each call to [`Engine::tick`] evaluates
//! every component in the order in which it was registered and then moves the
//! clock on, committing all ports written during the cycle.

use std::cell::RefCell;
use std::rc::Rc;

use fabric_track::entity::{Entity, toplevel};
use fabric_track::set_time;
use fabric_track::tracker::stdout_tracker;
use fabric_track::{Tracker, trace};

use crate::sim_error;
use crate::time::clock::Clock;
use crate::types::{Component, SimResult};

/// Use a default clock frequency of 1GHz.
const DEFAULT_CLOCK_MHZ: f64 = 1000.0;

pub struct Engine {
    toplevel: Rc<Entity>,
    tracker: Tracker,
    clock: Clock,
    registered: RefCell<Vec<Component>>,
}

impl Engine {
    /// Create a standalone engine.
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        Self {
            toplevel: toplevel(tracker, "top"),
            tracker: tracker.clone(),
            clock: Clock::new(DEFAULT_CLOCK_MHZ),
            registered: RefCell::new(Vec::new()),
        }
    }

    /// Add a component to be evaluated every cycle.
    pub fn register(&self, component: Component) {
        self.registered.borrow_mut().push(component);
    }

    #[must_use]
    pub fn default_clock(&self) -> Clock {
        self.clock.clone()
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    #[must_use]
    pub fn tick_now(&self) -> u64 {
        self.clock.tick_now()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.clock.time_now_ns()
    }

    /// Run one cycle: evaluate, then resolve and advance the clock.
    ///
    /// The first error returned by a component stops the cycle.
    pub fn tick(&self) -> SimResult {
        let components = self.registered.borrow().clone();
        for component in &components {
            component.evaluate()?;
        }

        self.clock.advance();
        set_time!(self.toplevel ; self.clock.time_now_ns());
        Ok(())
    }

    /// Run a fixed number of cycles.
    pub fn run_for(&self, ticks: u64) -> SimResult {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Run until `done` returns true. It is an error for this to take more
    /// than `max_ticks` cycles.
    pub fn run_until<F>(&self, mut done: F, max_ticks: u64) -> SimResult
    where
        F: FnMut() -> bool,
    {
        let start = self.tick_now();
        while !done() {
            if self.tick_now() - start >= max_ticks {
                return sim_error!(format!("did not finish within {max_ticks} ticks"));
            }
            self.tick()?;
        }
        trace!(self.toplevel ; "finished after {} ticks", self.tick_now() - start);
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.tracker.shutdown();
    }
}

/// Create a default engine that sends [`Track`](fabric_track::Track) events to
/// stdout.
///
/// This is provided to keep documentation examples simple with fewer
/// concepts to have to consider at once.
impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Info);
        Self::new(&tracker)
    }
}
