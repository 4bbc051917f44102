// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Position of every node in the fabric.

use std::collections::BTreeMap;

use fabric_engine::sim_error;
use fabric_engine::types::SimError;

use crate::packet::{Coord, NodeId};

#[derive(Debug)]
pub struct NodeCoordTable {
    coords: BTreeMap<NodeId, Coord>,
}

impl NodeCoordTable {
    pub fn build(coords: &BTreeMap<NodeId, Coord>) -> Result<Self, SimError> {
        if coords.is_empty() {
            return sim_error!("no node coordinates configured");
        }
        Ok(Self {
            coords: coords.clone(),
        })
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<Coord> {
        self.coords.get(&node).copied()
    }

    /// Like [get](NodeCoordTable::get) but it is an error for the node to be
    /// unknown.
    pub fn coord(&self, node: NodeId) -> Result<Coord, SimError> {
        match self.get(node) {
            Some(coord) => Ok(coord),
            None => sim_error!(format!("no coordinates for node {node}")),
        }
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.coords.contains_key(&node)
    }
}
