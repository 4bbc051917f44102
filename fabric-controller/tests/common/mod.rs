// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use std::rc::Rc;

use fabric_components::arbiter::policy::ArbitrationPolicy;
use fabric_components::connect_port;
use fabric_components::sink::Sink;
use fabric_components::source::Source;
use fabric_components::types::{DataGenerator, ReadyPattern};
use fabric_controller::config::{ControllerConfig, LoadRequestGate};
use fabric_controller::controller::Controller;
use fabric_controller::packet::{
    Command, Coord, DataWord, IntraPacket, NocPacket, NodeId, Payload,
};
use fabric_engine::engine::Engine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const FOUR_NODES: &str = r#"
    num_tiles = 4

    [node_address_ranges]
    0 = [0, 3]
    1 = [4, 7]
    2 = [8, 11]
    3 = [12, 15]

    [node_coords]
    0 = [0, 0]
    1 = [1, 0]
    2 = [2, 0]
    3 = [3, 0]
"#;

pub const SENTINEL: u32 = 4;

pub fn four_node_config(arbitration: ArbitrationPolicy, gate: LoadRequestGate) -> ControllerConfig {
    let mut config = ControllerConfig::from_toml_str(FOUR_NODES).unwrap();
    config.arbitration = arbitration;
    config.load_request_gate = gate;
    config
}

pub fn generator<T: 'static>(values: Vec<T>) -> Option<DataGenerator<T>> {
    Some(Box::new(values.into_iter()))
}

/// Not ready for the first `cycles` cycles.
pub fn stall_for(cycles: usize) -> Option<ReadyPattern> {
    Some(Box::new(std::iter::repeat_n(false, cycles)))
}

pub fn random_ready(seed: u64) -> Option<ReadyPattern> {
    let mut rng = StdRng::seed_from_u64(seed);
    Some(Box::new(std::iter::repeat_with(move || rng.gen_bool(0.5))))
}

pub fn tile_load_request(src_tile: u32, address: u64) -> NocPacket {
    NocPacket {
        src_tile,
        payload: Payload::new(Command::LoadRequest, address, DataWord::default()),
        ..Default::default()
    }
}

pub fn tile_store_request(src_tile: u32, address: u64, data: u32) -> NocPacket {
    NocPacket {
        src_tile,
        payload: Payload::new(Command::StoreRequest, address, DataWord::new(data, true)),
        ..Default::default()
    }
}

/// A packet arriving at node 1 from tile `src_tile` of node 2.
pub fn from_node2(command: Command, dst_tile: u32, address: u64, data: u32) -> NocPacket {
    NocPacket {
        src_node: NodeId(2),
        dst_node: NodeId(1),
        src_coord: Coord::new(2, 0),
        dst_coord: Coord::new(1, 0),
        src_tile: 3,
        dst_tile,
        payload: Payload::new(command, address, DataWord::new(data, true)),
        ..Default::default()
    }
}

pub fn from_node2_code(cmd: u8) -> NocPacket {
    NocPacket {
        payload: Payload {
            cmd,
            ..Default::default()
        },
        ..from_node2(Command::Launch, 0, 0, 0)
    }
}

pub fn cpu_packet(command: Command, dst_node: u32, dst_tile: u32, address: u64) -> IntraPacket {
    IntraPacket {
        dst_node: NodeId(dst_node),
        dst_tile,
        payload: Payload::new(command, address, DataWord::default()),
        ..Default::default()
    }
}

/// One controller with a source on every input and a sink on every output.
///
/// Sinks are registered before the controller and sources after it so that
/// every channel can carry one value per cycle.
pub struct Harness {
    pub controller: Rc<Controller>,

    pub noc_in: Rc<Source<NocPacket>>,
    pub cpu_in: Rc<Source<IntraPacket>>,
    pub ring_in: Rc<Source<IntraPacket>>,
    pub tile_load_request_in: Rc<Source<NocPacket>>,
    pub tile_store_request_in: Rc<Source<NocPacket>>,
    pub tile_load_response_in: Rc<Source<NocPacket>>,

    pub noc_out: Rc<Sink<NocPacket>>,
    pub cpu_out: Rc<Sink<IntraPacket>>,
    pub ring_out: Rc<Sink<IntraPacket>>,
    pub load_addr_out: Rc<Sink<u64>>,
    pub load_src_node_out: Rc<Sink<NodeId>>,
    pub load_src_tile_out: Rc<Sink<u32>>,
    pub load_response_out: Rc<Sink<DataWord>>,
    pub store_addr_out: Rc<Sink<u64>>,
    pub store_data_out: Rc<Sink<DataWord>>,
}

impl Harness {
    pub fn new(engine: &Engine, node_id: u32, config: &ControllerConfig) -> Self {
        let top = engine.top();

        let noc_out = Sink::new_and_register(engine, top, "noc_out").unwrap();
        let cpu_out = Sink::new_and_register(engine, top, "cpu_out").unwrap();
        let ring_out = Sink::new_and_register(engine, top, "ring_out").unwrap();
        let load_addr_out = Sink::new_and_register(engine, top, "load_addr_out").unwrap();
        let load_src_node_out = Sink::new_and_register(engine, top, "load_src_node_out").unwrap();
        let load_src_tile_out = Sink::new_and_register(engine, top, "load_src_tile_out").unwrap();
        let load_response_out = Sink::new_and_register(engine, top, "load_response_out").unwrap();
        let store_addr_out = Sink::new_and_register(engine, top, "store_addr_out").unwrap();
        let store_data_out = Sink::new_and_register(engine, top, "store_data_out").unwrap();

        let tables = config.build_tables().unwrap();
        let controller = Controller::new_and_register(
            engine,
            top,
            "controller",
            NodeId(node_id),
            config,
            tables,
        )
        .unwrap();

        let noc_in = Source::new_and_register(engine, top, "noc_in", None).unwrap();
        let cpu_in = Source::new_and_register(engine, top, "cpu_in", None).unwrap();
        let ring_in = Source::new_and_register(engine, top, "ring_in", None).unwrap();
        let tile_load_request_in =
            Source::new_and_register(engine, top, "tile_load_request_in", None).unwrap();
        let tile_store_request_in =
            Source::new_and_register(engine, top, "tile_store_request_in", None).unwrap();
        let tile_load_response_in =
            Source::new_and_register(engine, top, "tile_load_response_in", None).unwrap();

        connect_port!(noc_in, tx => controller, rx_noc).unwrap();
        connect_port!(cpu_in, tx => controller, rx_cpu).unwrap();
        connect_port!(ring_in, tx => controller, rx_ctrl_ring).unwrap();
        connect_port!(tile_load_request_in, tx => controller, rx_tile_load_request).unwrap();
        connect_port!(tile_store_request_in, tx => controller, rx_tile_store_request).unwrap();
        connect_port!(tile_load_response_in, tx => controller, rx_tile_load_response).unwrap();

        connect_port!(controller, tx_noc => noc_out, rx).unwrap();
        connect_port!(controller, tx_cpu => cpu_out, rx).unwrap();
        connect_port!(controller, tx_ctrl_ring => ring_out, rx).unwrap();
        connect_port!(controller, tx_tile_load_request_addr => load_addr_out, rx).unwrap();
        connect_port!(controller, tx_tile_load_request_src_node => load_src_node_out, rx).unwrap();
        connect_port!(controller, tx_tile_load_request_src_tile => load_src_tile_out, rx).unwrap();
        connect_port!(controller, tx_tile_load_response_data => load_response_out, rx).unwrap();
        connect_port!(controller, tx_tile_store_request_addr => store_addr_out, rx).unwrap();
        connect_port!(controller, tx_tile_store_request_data => store_data_out, rx).unwrap();

        Self {
            controller,
            noc_in,
            cpu_in,
            ring_in,
            tile_load_request_in,
            tile_store_request_in,
            tile_load_response_in,
            noc_out,
            cpu_out,
            ring_out,
            load_addr_out,
            load_src_node_out,
            load_src_tile_out,
            load_response_out,
            store_addr_out,
            store_data_out,
        }
    }

    pub fn all_sources_done(&self) -> bool {
        self.noc_in.is_done()
            && self.cpu_in.is_done()
            && self.ring_in.is_done()
            && self.tile_load_request_in.is_done()
            && self.tile_store_request_in.is_done()
            && self.tile_load_response_in.is_done()
    }
}
