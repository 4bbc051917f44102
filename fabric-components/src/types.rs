// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Shared types.
//!
//! This file defines a number of common types used to drive blocks.

/// The `DataGenerator` is what a [source](crate::source) uses
/// to generate data values to send.
pub type DataGenerator<T> = Box<dyn Iterator<Item = T> + 'static>;

/// The `ReadyPattern` is what a [sink](crate::sink) uses to decide whether it
/// accepts a value in a given cycle. Once exhausted the sink is always ready.
pub type ReadyPattern = Box<dyn Iterator<Item = bool> + 'static>;
