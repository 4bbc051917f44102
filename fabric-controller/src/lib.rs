// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Model of the controller that connects one node of a multi-node compute
//! fabric to the inter-node network.
//!
//! The [controller](crate::controller::Controller) has two halves:
//!
//!  - **egress**: five local sources (tile load requests, tile store requests,
//!    tile load responses, the CPU and the configuration ring) are wrapped into
//!    [network packets](crate::packet::NocPacket) and merged by a crossbar
//!    into the single network output. Load and store requests have their
//!    destination resolved from the address map just before they leave.
//!  - **ingress**: packets arriving from the network are classified by their
//!    [command](crate::packet::Command) and forwarded to a tile, the CPU or the
//!    configuration ring.
//!
//! The address map and node coordinates are described by a
//! [ControllerConfig](crate::config::ControllerConfig).

pub mod address_map;
pub mod config;
pub mod controller;
pub mod node_coords;
pub mod packet;
pub mod routing;
