// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Cycle-based simulation engine.
//!
//! Models are built from components that are registered with an
//! [`Engine`](crate::engine::Engine). Every cycle is split in two phases:
//!
//!  - **evaluate**: each component, in registration order, reads the values
//!    committed at the previous clock edge and writes new values into its
//!    output ports.
//!  - **resolve**: every port that was written or drained commits its state
//!    so that the new values become visible in the next cycle.
//!
//! Components are connected through single-slot
//! [`ElasticBuffer`](crate::port::ElasticBuffer)s which implement a
//! valid/ready handshake: a value is only transferred when the producer has
//! one and the consumer can accept it.

pub mod engine;
pub mod port;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;
