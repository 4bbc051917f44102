// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The local-traffic crossbar.
//!
//! Five local sources compete for the network output. Before arbitration each
//! value is wrapped into a [NocPacket] stamped with the identity of this
//! controller.

use std::fmt;
use std::rc::Rc;

use fabric_components::arbiter::{Arbitrate, ArbiterFsm, GrantState};
use fabric_engine::types::SimError;
use fabric_track::entity::Entity;

use crate::packet::{Command, Coord, IntraPacket, NocPacket, NodeId};
use crate::routing::RoutingTables;

pub const NUM_CROSSBAR_INPUTS: usize = 5;

/// The crossbar inputs in index (and fixed priority) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossbarInput {
    TileLoadRequest,
    TileStoreRequest,
    TileLoadResponse,
    Cpu,
    CtrlRing,
}

impl CrossbarInput {
    pub const ALL: [CrossbarInput; NUM_CROSSBAR_INPUTS] = [
        CrossbarInput::TileLoadRequest,
        CrossbarInput::TileStoreRequest,
        CrossbarInput::TileLoadResponse,
        CrossbarInput::Cpu,
        CrossbarInput::CtrlRing,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CrossbarInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrossbarInput::TileLoadRequest => "tile_load_request",
            CrossbarInput::TileStoreRequest => "tile_store_request",
            CrossbarInput::TileLoadResponse => "tile_load_response",
            CrossbarInput::Cpu => "cpu",
            CrossbarInput::CtrlRing => "ctrl_ring",
        };
        write!(f, "{name}")
    }
}

/// Wraps local values into network packets.
pub struct Wrapper<'a> {
    pub node_id: NodeId,
    pub node_coord: Coord,

    /// Tile id addressing the controller and CPU.
    pub sentinel: u32,
    pub tables: &'a RoutingTables,
}

impl Wrapper<'_> {
    /// Tile load and store requests. The destination is resolved at egress.
    #[must_use]
    pub fn tile_request(&self, packet: NocPacket) -> NocPacket {
        NocPacket {
            src_node: self.node_id,
            src_coord: self.node_coord,
            dst_node: NodeId(0),
            dst_coord: Coord::default(),
            dst_tile: 0,
            opaque: 0,
            vc: 0,
            ..packet
        }
    }

    /// Tile load responses go back to the requester named in the packet.
    pub fn tile_load_response(&self, packet: NocPacket) -> Result<NocPacket, SimError> {
        Ok(NocPacket {
            src_node: self.node_id,
            src_coord: self.node_coord,
            dst_coord: self.tables.coords.coord(packet.dst_node)?,
            opaque: 0,
            vc: 0,
            ..packet
        })
    }

    /// CPU packets are sent from this controller to the node chosen by the
    /// CPU. Loads and stores are routed by address at egress and must come
    /// back to the controller.
    pub fn cpu(&self, packet: IntraPacket) -> Result<NocPacket, SimError> {
        let (dst_node, dst_coord, dst_tile) = match packet.payload.command() {
            Some(Command::LoadRequest | Command::StoreRequest) => {
                (NodeId(0), Coord::default(), self.sentinel)
            }
            _ => (
                packet.dst_node,
                self.tables.coords.coord(packet.dst_node)?,
                packet.dst_tile,
            ),
        };
        Ok(NocPacket {
            tag: packet.tag,
            src_node: self.node_id,
            dst_node,
            src_coord: self.node_coord,
            dst_coord,
            src_tile: self.sentinel,
            dst_tile,
            opaque: 0,
            vc: 0,
            payload: packet.payload,
        })
    }

    /// Configuration ring packets are sent to the controller of node 0.
    pub fn ctrl_ring(&self, packet: IntraPacket) -> Result<NocPacket, SimError> {
        Ok(NocPacket {
            tag: packet.tag,
            src_node: self.node_id,
            dst_node: NodeId(0),
            src_coord: self.node_coord,
            dst_coord: self.tables.coords.coord(NodeId(0))?,
            src_tile: packet.src_tile,
            dst_tile: self.sentinel,
            opaque: 0,
            vc: 0,
            payload: packet.payload,
        })
    }
}

/// The arbitration state of the crossbar.
pub struct Crossbar {
    pub entity: Rc<Entity>,
    fsm: ArbiterFsm,
}

impl Crossbar {
    #[must_use]
    pub fn new(parent: &Rc<Entity>, policy: Box<dyn Arbitrate>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "crossbar")),
            fsm: ArbiterFsm::new(policy),
        }
    }

    pub fn step(
        &mut self,
        requests: &[bool; NUM_CROSSBAR_INPUTS],
        egress_ready: bool,
    ) -> GrantState {
        self.fsm.step(&self.entity, requests, egress_ready)
    }

    #[must_use]
    pub fn state(&self) -> GrantState {
        self.fsm.state()
    }
}
