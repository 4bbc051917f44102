// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulation components.

pub mod arbiter;
pub mod connect;
pub mod sink;
pub mod source;
pub mod types;
