// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{
    Harness, SENTINEL, cpu_packet, four_node_config, from_node2, generator, random_ready,
    tile_load_request, tile_store_request,
};
use fabric_components::arbiter::policy::ArbitrationPolicy;
use fabric_components::connect_port;
use fabric_components::sink::Sink;
use fabric_components::source::Source;
use fabric_controller::config::LoadRequestGate;
use fabric_controller::controller::Controller;
use fabric_controller::packet::{Command, Coord, DataWord, NocPacket, NodeId, Payload};
use fabric_engine::engine::Engine;
use fabric_engine::port::{InPort, OutPort, PortStateResult};
use fabric_engine::test_helpers::start_test;
use fabric_engine::traits::Evaluate;
use fabric_engine::types::{SimError, SimResult};
use fabric_model_builder::{EntityDisplay, EntityGet};
use fabric_track::entity::Entity;
use fabric_track::trace;

/// A tile that answers every load request with ten times the address.
#[derive(EntityDisplay, EntityGet)]
struct EchoTile {
    entity: Rc<Entity>,
    rx_addr: InPort<u64>,
    rx_src_node: InPort<NodeId>,
    rx_src_tile: InPort<u32>,
    tx: RefCell<OutPort<NocPacket>>,
}

impl EchoTile {
    fn new_and_register(engine: &Engine, name: &str) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(engine.top(), name));
        let clock = engine.default_clock();
        let rc_self = Rc::new(Self {
            rx_addr: InPort::new(&clock, &entity, "rx_addr"),
            rx_src_node: InPort::new(&clock, &entity, "rx_src_node"),
            rx_src_tile: InPort::new(&clock, &entity, "rx_src_tile"),
            tx: RefCell::new(OutPort::new(&entity, "tx")),
            entity,
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    fn port_rx_addr(&self) -> PortStateResult<u64> {
        self.rx_addr.state()
    }

    fn port_rx_src_node(&self) -> PortStateResult<NodeId> {
        self.rx_src_node.state()
    }

    fn port_rx_src_tile(&self) -> PortStateResult<u32> {
        self.rx_src_tile.state()
    }

    fn connect_port_tx(&self, port_state: PortStateResult<NocPacket>) -> SimResult {
        self.tx.borrow_mut().connect(port_state)
    }
}

impl Evaluate for EchoTile {
    fn evaluate(&self) -> SimResult {
        let all_valid =
            self.rx_addr.is_valid() && self.rx_src_node.is_valid() && self.rx_src_tile.is_valid();
        let tx = self.tx.borrow();
        if all_valid && tx.ready()? {
            let address = self.rx_addr.take()?;
            let response = NocPacket {
                dst_node: self.rx_src_node.take()?,
                dst_tile: self.rx_src_tile.take()?,
                payload: Payload::new(
                    Command::LoadResponse,
                    address,
                    DataWord::new(address as u32 * 10, true),
                ),
                ..Default::default()
            };
            trace!(self.entity ; "respond {}", response);
            tx.put(response)?;
        }
        Ok(())
    }
}

#[test]
fn cpu_load_round_trip() {
    let engine = start_test(file!());
    let config = four_node_config(ArbitrationPolicy::RoundRobin, LoadRequestGate::Joint);
    let tables = config.build_tables().unwrap();
    let top = engine.top();

    let cpu1_out = Sink::new_and_register(&engine, top, "cpu1_out").unwrap();
    let tile = EchoTile::new_and_register(&engine, "tile2").unwrap();

    let node1 =
        Controller::new_and_register(&engine, top, "node1", NodeId(1), &config, tables.clone())
            .unwrap();
    let node2 =
        Controller::new_and_register(&engine, top, "node2", NodeId(2), &config, tables).unwrap();
    let cpu1_in = Source::new_and_register(
        &engine,
        top,
        "cpu1_in",
        generator(vec![
            cpu_packet(Command::LoadRequest, 2, 0, 9),
            cpu_packet(Command::LoadRequest, 2, 0, 10),
        ]),
    )
    .unwrap();

    connect_port!(cpu1_in, tx => node1, rx_cpu).unwrap();
    connect_port!(node1, tx_cpu => cpu1_out, rx).unwrap();
    connect_port!(node1, tx_noc => node2, rx_noc).unwrap();
    connect_port!(node2, tx_noc => node1, rx_noc).unwrap();
    connect_port!(node2, tx_tile_load_request_addr => tile, rx_addr).unwrap();
    connect_port!(node2, tx_tile_load_request_src_node => tile, rx_src_node).unwrap();
    connect_port!(node2, tx_tile_load_request_src_tile => tile, rx_src_tile).unwrap();
    connect_port!(tile, tx => node2, rx_tile_load_response).unwrap();

    engine.run_until(|| cpu1_out.num_sunk() == 2, 50).unwrap();

    let responses = cpu1_out.received();
    let data: Vec<_> = responses.iter().map(|p| p.payload.data.payload).collect();
    assert_eq!(data, vec![90, 100]);
    for response in &responses {
        assert_eq!(response.payload.command(), Some(Command::LoadResponse));
        assert_eq!(response.src_node, NodeId(2));
        assert_eq!(response.dst_node, NodeId(1));
        assert_eq!(response.dst_tile, SENTINEL);
        assert_eq!(response.src_coord, Coord::new(1, 0));
        assert_eq!(response.dst_coord, Coord::new(2, 0));
    }
    assert_eq!(node2.stats().dispatched[0], 2);
    assert_eq!(node1.stats().crossbar_grants[3], 2);
    assert_eq!(node2.stats().crossbar_grants[2], 2);
}

#[test]
fn no_loss_under_random_backpressure() {
    let engine = start_test(file!());
    let config = four_node_config(ArbitrationPolicy::RoundRobin, LoadRequestGate::Joint);
    let harness = Harness::new(&engine, 1, &config);

    let loads: Vec<_> = (0..50).map(|i| tile_load_request(i % 4, i as u64 % 16)).collect();
    let stores: Vec<_> = (0..50)
        .map(|i| tile_store_request(i % 4, (i as u64 * 3) % 16, i))
        .collect();
    let inbound: Vec<_> = (0..120)
        .map(|i| match i % 4 {
            0 => from_node2(Command::StoreRequest, 0, u64::from(i), i),
            1 => from_node2(Command::LoadRequest, 1, u64::from(i), 0),
            2 => from_node2(Command::LoadResponse, i % 5, 0, i),
            _ => from_node2(Command::Config, 1, 0, i),
        })
        .collect();

    harness.tile_load_request_in.set_generator(generator(loads));
    harness.tile_store_request_in.set_generator(generator(stores));
    harness.noc_in.set_generator(generator(inbound));

    harness.noc_out.set_ready_pattern(random_ready(1));
    harness.store_addr_out.set_ready_pattern(random_ready(2));
    harness.store_data_out.set_ready_pattern(random_ready(3));
    harness.load_addr_out.set_ready_pattern(random_ready(4));
    harness.load_src_node_out.set_ready_pattern(random_ready(5));
    harness.load_src_tile_out.set_ready_pattern(random_ready(6));
    harness.load_response_out.set_ready_pattern(random_ready(7));
    harness.cpu_out.set_ready_pattern(random_ready(8));
    harness.ring_out.set_ready_pattern(random_ready(9));

    engine
        .run_until(
            || {
                harness.noc_out.num_sunk() == 100
                    && harness.store_data_out.num_sunk() == 30
                    && harness.load_src_tile_out.num_sunk() == 30
                    && harness.load_response_out.num_sunk() + harness.cpu_out.num_sunk() == 30
                    && harness.ring_out.num_sunk() == 30
            },
            5000,
        )
        .unwrap();
    assert!(harness.all_sources_done());

    // Every channel keeps its order
    let store_addrs: Vec<u64> = (0..120).filter(|i| i % 4 == 0).collect();
    assert_eq!(harness.store_addr_out.received(), store_addrs);
    let store_data: Vec<_> = store_addrs
        .iter()
        .map(|a| DataWord::new(*a as u32, true))
        .collect();
    assert_eq!(harness.store_data_out.received(), store_data);
    let load_addrs: Vec<u64> = (0..120).filter(|i| i % 4 == 1).collect();
    assert_eq!(harness.load_addr_out.received(), load_addrs);
    assert!(
        harness
            .load_src_node_out
            .received()
            .iter()
            .all(|n| *n == NodeId(2))
    );

    let (to_cpu, to_tile): (Vec<u32>, Vec<u32>) =
        (0..120).filter(|i| i % 4 == 2).partition(|i| i % 5 == SENTINEL);
    let cpu_data: Vec<_> = harness
        .cpu_out
        .received()
        .iter()
        .map(|p| p.payload.data.payload)
        .collect();
    assert_eq!(cpu_data, to_cpu);
    let tile_data: Vec<_> = harness
        .load_response_out
        .received()
        .iter()
        .map(|d| d.payload)
        .collect();
    assert_eq!(tile_data, to_tile);

    let out = harness.noc_out.received();
    let egress_loads: Vec<_> = out
        .iter()
        .filter(|p| p.payload.command() == Some(Command::LoadRequest))
        .map(|p| p.payload.data_addr)
        .collect();
    assert_eq!(egress_loads, (0..50).map(|i| i % 16).collect::<Vec<u64>>());
    let egress_stores: Vec<_> = out
        .iter()
        .filter(|p| p.payload.command() == Some(Command::StoreRequest))
        .map(|p| p.payload.data.payload)
        .collect();
    assert_eq!(egress_stores, (0..50).collect::<Vec<u32>>());

    let stats = harness.controller.stats();
    assert_eq!(stats.crossbar_grants, [50, 50, 0, 0, 0]);
    assert_eq!(stats.dispatched.iter().sum::<u64>(), 120);
}

#[test]
fn tracks_dropped_fields() {
    let (test_tracker, tracker) = fabric_track::test_init!(1);
    let engine = Engine::new(&tracker);
    let config = four_node_config(ArbitrationPolicy::RoundRobin, LoadRequestGate::AddressOnly);
    let harness = Harness::new(&engine, 1, &config);
    harness
        .load_src_tile_out
        .set_ready_pattern(common::stall_for(10));
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::LoadRequest, 0, 4, 0),
        from_node2(Command::LoadRequest, 0, 5, 0),
    ]));

    engine.run_for(12).unwrap();
    let events = test_tracker.events();
    let dropped: Vec<_> = events
        .iter()
        .filter(|e| e.contains(":WARN: dropped"))
        .collect();
    assert_eq!(dropped.len(), 1);
    assert!(dropped[0].contains("dropped src_tile of 2.3(2,0) -> 1.0(1,0) LOAD_REQUEST addr=0x5"));
    assert!(
        events
            .iter()
            .any(|e| e.contains(":TRACE: ingress tile_load_request: 2.3(2,0)"))
    );
    assert_eq!(harness.controller.stats().dropped_load_request_fields, 1);
}
