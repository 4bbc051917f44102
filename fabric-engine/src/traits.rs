// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the fabric engine.

use std::fmt::{Debug, Display};

use fabric_track::tag::Tagged;

use crate::types::SimResult;

/// A super-trait that objects that are passed around the simulation have to
/// implement
///
///  - Clone:   Allows the consumer of a port to peek at a value without
///    taking it and lets tests keep copies of what was sent.
///  - Debug:   In order to print "{:?}".
///  - Display: Used in log messages.
///  - Tagged:  Allows objects to be tracked as they move between entities.
///  - 'static: Values are stored in shared port state.
pub trait SimObject: Clone + Debug + Display + Tagged + 'static {}

// Implementations for basic types that can be sent around the simulation for
// testing
impl SimObject for i32 {}
impl SimObject for u32 {}
impl SimObject for u64 {}
impl SimObject for usize {}

/// The combinational phase of a component.
///
/// Called once per cycle for every registered component, in registration
/// order. A component must only read values committed at the previous clock
/// edge and must only write into ports that are ready.
pub trait Evaluate {
    fn evaluate(&self) -> SimResult;
}

/// The commit phase of shared state.
///
/// Anything registered with a [`Clock`](crate::time::clock::Clock) using
/// `resolve_on_tick` has `resolve` called once at the next clock edge.
pub trait Resolve {
    fn resolve(&self);
}
