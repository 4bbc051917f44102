// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The read-only tables shared by every controller of a fabric.

use std::collections::BTreeMap;

use fabric_engine::sim_error;
use fabric_engine::types::SimError;

use crate::address_map::{AddressRange, AddressRoutingTable};
use crate::node_coords::NodeCoordTable;
use crate::packet::{Coord, NodeId};

#[derive(Debug)]
pub struct RoutingTables {
    pub addresses: AddressRoutingTable,
    pub coords: NodeCoordTable,
}

impl RoutingTables {
    /// Build both tables. Every node that owns addresses must have
    /// coordinates.
    pub fn build(
        ranges: &BTreeMap<NodeId, AddressRange>,
        coords: &BTreeMap<NodeId, Coord>,
    ) -> Result<Self, SimError> {
        let addresses = AddressRoutingTable::build(ranges)?;
        let coords = NodeCoordTable::build(coords)?;
        for node in ranges.keys() {
            if !coords.contains(*node) {
                return sim_error!(format!("no coordinates for node {node}"));
            }
        }
        Ok(Self { addresses, coords })
    }

    /// Find the node owning `address` and its coordinates.
    pub fn resolve_destination(&self, address: u64) -> Result<(NodeId, Coord), SimError> {
        match self.addresses.resolve(address) {
            Some(node) => Ok((node, self.coords.coord(node)?)),
            None => sim_error!(format!("address {address:#x} does not map to any node")),
        }
    }
}
