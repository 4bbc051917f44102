// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Packets exchanged by the controller.
//!
//! There are two shapes of packet:
//!  - [NocPacket]: carried by the inter-node network and used by tiles for
//!    their memory traffic.
//!  - [IntraPacket]: carried by the CPU interface and the configuration ring
//!    within a node.
//!
//! Both carry the same [Payload]. The command is kept as a raw code on the
//! wire and decoded into a [Command] by whoever consumes it, as an
//! unsupported code is a legal thing to receive.

use std::fmt;

use fabric_engine::traits::SimObject;
use fabric_track::Tag;
use fabric_track::tag::Tagged;

/// Identifier of a node in the fabric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Tagged for NodeId {
    fn tag(&self) -> Tag {
        Tag(u64::from(self.0))
    }
}

impl SimObject for NodeId {}

/// Position of a node in the fabric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Launch,
    Config,
    ConfigPrologueFu,
    ConfigPrologueFuCrossbar,
    ConfigPrologueRoutingCrossbar,
    ConfigTotalCtrlCount,
    ConfigCountPerIter,
    Const,
    Complete,
    LoadRequest,
    LoadResponse,
    StoreRequest,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Launch,
        Command::Config,
        Command::ConfigPrologueFu,
        Command::ConfigPrologueFuCrossbar,
        Command::ConfigPrologueRoutingCrossbar,
        Command::ConfigTotalCtrlCount,
        Command::ConfigCountPerIter,
        Command::Const,
        Command::Complete,
        Command::LoadRequest,
        Command::LoadResponse,
        Command::StoreRequest,
    ];

    /// Decode a wire code. Returns `None` for codes that are not supported.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Command::Launch),
            3 => Some(Command::Config),
            4 => Some(Command::ConfigPrologueFu),
            5 => Some(Command::ConfigPrologueFuCrossbar),
            6 => Some(Command::ConfigPrologueRoutingCrossbar),
            7 => Some(Command::ConfigTotalCtrlCount),
            8 => Some(Command::ConfigCountPerIter),
            9 => Some(Command::Const),
            10 => Some(Command::Complete),
            11 => Some(Command::LoadRequest),
            12 => Some(Command::LoadResponse),
            13 => Some(Command::StoreRequest),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Command::Launch => 0,
            Command::Config => 3,
            Command::ConfigPrologueFu => 4,
            Command::ConfigPrologueFuCrossbar => 5,
            Command::ConfigPrologueRoutingCrossbar => 6,
            Command::ConfigTotalCtrlCount => 7,
            Command::ConfigCountPerIter => 8,
            Command::Const => 9,
            Command::Complete => 10,
            Command::LoadRequest => 11,
            Command::LoadResponse => 12,
            Command::StoreRequest => 13,
        }
    }

    /// Commands that are delivered to local tiles over the configuration ring.
    #[must_use]
    pub fn is_config_class(self) -> bool {
        match self {
            Command::Launch
            | Command::Config
            | Command::ConfigPrologueFu
            | Command::ConfigPrologueFuCrossbar
            | Command::ConfigPrologueRoutingCrossbar
            | Command::ConfigTotalCtrlCount
            | Command::ConfigCountPerIter
            | Command::Const => true,
            Command::Complete
            | Command::LoadRequest
            | Command::LoadResponse
            | Command::StoreRequest => false,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Launch => "LAUNCH",
            Command::Config => "CONFIG",
            Command::ConfigPrologueFu => "CONFIG_PROLOGUE_FU",
            Command::ConfigPrologueFuCrossbar => "CONFIG_PROLOGUE_FU_CROSSBAR",
            Command::ConfigPrologueRoutingCrossbar => "CONFIG_PROLOGUE_ROUTING_CROSSBAR",
            Command::ConfigTotalCtrlCount => "CONFIG_TOTAL_CTRL_COUNT",
            Command::ConfigCountPerIter => "CONFIG_COUNT_PER_ITER",
            Command::Const => "CONST",
            Command::Complete => "COMPLETE",
            Command::LoadRequest => "LOAD_REQUEST",
            Command::LoadResponse => "LOAD_RESPONSE",
            Command::StoreRequest => "STORE_REQUEST",
        };
        write!(f, "{name}")
    }
}

/// A data value with its predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataWord {
    pub payload: u32,
    pub predicate: bool,
}

impl DataWord {
    #[must_use]
    pub fn new(payload: u32, predicate: bool) -> Self {
        Self { payload, predicate }
    }
}

impl fmt::Display for DataWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.payload, u8::from(self.predicate))
    }
}

impl Tagged for DataWord {
    fn tag(&self) -> Tag {
        Tag(u64::from(self.payload))
    }
}

impl SimObject for DataWord {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    /// Raw command code.
    pub cmd: u8,
    pub data_addr: u64,
    pub data: DataWord,
}

impl Payload {
    #[must_use]
    pub fn new(command: Command, data_addr: u64, data: DataWord) -> Self {
        Self {
            cmd: command.code(),
            data_addr,
            data,
        }
    }

    #[must_use]
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.cmd)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command() {
            Some(command) => write!(f, "{command}")?,
            None => write!(f, "cmd {}", self.cmd)?,
        }
        write!(f, " addr={:#x} data={}", self.data_addr, self.data)
    }
}

/// Packet carried by the inter-node network.
#[derive(Clone, Debug, Default)]
pub struct NocPacket {
    pub tag: Tag,
    pub src_node: NodeId,
    pub dst_node: NodeId,
    pub src_coord: Coord,
    pub dst_coord: Coord,
    pub src_tile: u32,
    pub dst_tile: u32,
    pub opaque: u8,
    pub vc: u8,
    pub payload: Payload,
}

// The tag identifies the packet for tracking only
impl PartialEq for NocPacket {
    fn eq(&self, other: &Self) -> bool {
        self.src_node == other.src_node
            && self.dst_node == other.dst_node
            && self.src_coord == other.src_coord
            && self.dst_coord == other.dst_coord
            && self.src_tile == other.src_tile
            && self.dst_tile == other.dst_tile
            && self.opaque == other.opaque
            && self.vc == other.vc
            && self.payload == other.payload
    }
}

impl fmt::Display for NocPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{} -> {}.{}{} {}",
            self.src_node,
            self.src_tile,
            self.src_coord,
            self.dst_node,
            self.dst_tile,
            self.dst_coord,
            self.payload
        )
    }
}

impl Tagged for NocPacket {
    fn tag(&self) -> Tag {
        self.tag
    }
}

impl SimObject for NocPacket {}

/// Packet used by the CPU interface and the configuration ring.
#[derive(Clone, Debug, Default)]
pub struct IntraPacket {
    pub tag: Tag,
    pub src_tile: u32,
    pub dst_tile: u32,
    pub src_node: NodeId,
    pub dst_node: NodeId,
    pub src_coord: Coord,
    pub dst_coord: Coord,
    pub opaque: u8,
    pub vc: u8,
    pub payload: Payload,
}

impl PartialEq for IntraPacket {
    fn eq(&self, other: &Self) -> bool {
        self.src_tile == other.src_tile
            && self.dst_tile == other.dst_tile
            && self.src_node == other.src_node
            && self.dst_node == other.dst_node
            && self.src_coord == other.src_coord
            && self.dst_coord == other.dst_coord
            && self.opaque == other.opaque
            && self.vc == other.vc
            && self.payload == other.payload
    }
}

impl fmt::Display for IntraPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} {}",
            self.src_node, self.src_tile, self.dst_node, self.dst_tile, self.payload
        )
    }
}

impl Tagged for IntraPacket {
    fn tag(&self) -> Tag {
        self.tag
    }
}

impl SimObject for IntraPacket {}
