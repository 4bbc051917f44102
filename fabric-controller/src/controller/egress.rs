// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Destination resolution for packets leaving the node.

use fabric_engine::types::SimError;

use crate::packet::{Command, NocPacket};
use crate::routing::RoutingTables;

/// Fill in the destination of memory requests from the address map. Every
/// other packet already carries its destination and passes through.
pub fn resolve_egress(tables: &RoutingTables, packet: NocPacket) -> Result<NocPacket, SimError> {
    match packet.payload.command() {
        Some(Command::LoadRequest | Command::StoreRequest) => {
            let (dst_node, dst_coord) = tables.resolve_destination(packet.payload.data_addr)?;
            Ok(NocPacket {
                dst_node,
                dst_coord,
                ..packet
            })
        }
        _ => Ok(packet),
    }
}
