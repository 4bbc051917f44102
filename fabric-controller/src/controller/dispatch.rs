// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Classification of packets arriving from the network.

use std::fmt;

use fabric_engine::sim_error;
use fabric_engine::types::SimError;

use crate::packet::{Command, IntraPacket, NocPacket};

pub const NUM_DESTINATIONS: usize = 5;

/// Where an inbound packet is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    TileLoadRequest,
    TileStoreRequest,
    TileLoadResponse,
    Cpu,
    CtrlRing,
}

impl Destination {
    pub const ALL: [Destination; NUM_DESTINATIONS] = [
        Destination::TileLoadRequest,
        Destination::TileStoreRequest,
        Destination::TileLoadResponse,
        Destination::Cpu,
        Destination::CtrlRing,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Destination::TileLoadRequest => "tile_load_request",
            Destination::TileStoreRequest => "tile_store_request",
            Destination::TileLoadResponse => "tile_load_response",
            Destination::Cpu => "cpu",
            Destination::CtrlRing => "ctrl_ring",
        };
        write!(f, "{name}")
    }
}

/// Decide where `packet` goes. `sentinel` is the tile id of the controller.
pub fn classify(packet: &NocPacket, sentinel: u32) -> Result<Destination, SimError> {
    let Some(command) = packet.payload.command() else {
        return sim_error!(format!("unsupported command {}", packet.payload.cmd));
    };
    let destination = match command {
        Command::LoadRequest => Destination::TileLoadRequest,
        Command::StoreRequest => Destination::TileStoreRequest,
        Command::LoadResponse if packet.dst_tile == sentinel => Destination::Cpu,
        Command::LoadResponse => Destination::TileLoadResponse,
        Command::Complete => Destination::Cpu,
        Command::Launch
        | Command::Config
        | Command::ConfigPrologueFu
        | Command::ConfigPrologueFuCrossbar
        | Command::ConfigPrologueRoutingCrossbar
        | Command::ConfigTotalCtrlCount
        | Command::ConfigCountPerIter
        | Command::Const => Destination::CtrlRing,
    };
    Ok(destination)
}

/// Packets for the CPU read as a reply, so the coordinates are swapped.
#[must_use]
pub fn to_cpu(packet: NocPacket) -> IntraPacket {
    IntraPacket {
        tag: packet.tag,
        src_tile: packet.src_tile,
        dst_tile: packet.dst_tile,
        src_node: packet.src_node,
        dst_node: packet.dst_node,
        src_coord: packet.dst_coord,
        dst_coord: packet.src_coord,
        opaque: 0,
        vc: 0,
        payload: packet.payload,
    }
}

#[must_use]
pub fn to_ctrl_ring(packet: NocPacket) -> IntraPacket {
    IntraPacket {
        tag: packet.tag,
        src_tile: packet.src_tile,
        dst_tile: packet.dst_tile,
        src_node: packet.src_node,
        dst_node: packet.dst_node,
        src_coord: packet.src_coord,
        dst_coord: packet.dst_coord,
        opaque: 0,
        vc: 0,
        payload: packet.payload,
    }
}
