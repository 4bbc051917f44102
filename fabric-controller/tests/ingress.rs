// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

mod common;

use common::{Harness, SENTINEL, four_node_config, from_node2, from_node2_code, generator, stall_for};
use fabric_components::arbiter::policy::ArbitrationPolicy;
use fabric_controller::config::LoadRequestGate;
use fabric_controller::controller::dispatch::Destination;
use fabric_controller::packet::{Command, Coord, DataWord, NodeId};
use fabric_engine::test_helpers::start_test;

fn harness_with(engine: &fabric_engine::engine::Engine, gate: LoadRequestGate) -> Harness {
    let config = four_node_config(ArbitrationPolicy::RoundRobin, gate);
    Harness::new(engine, 1, &config)
}

#[test]
fn load_request_to_tile() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness
        .noc_in
        .set_generator(generator(vec![from_node2(Command::LoadRequest, 0, 5, 0)]));

    engine
        .run_until(|| harness.load_addr_out.num_sunk() == 1, 20)
        .unwrap();
    assert_eq!(harness.load_addr_out.received(), vec![5]);
    assert_eq!(harness.load_src_node_out.received(), vec![NodeId(2)]);
    assert_eq!(harness.load_src_tile_out.received(), vec![3]);
    assert_eq!(
        harness
            .controller
            .stats()
            .dispatched_to(Destination::TileLoadRequest),
        1
    );
}

#[test]
fn store_request_joined() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness.store_data_out.set_ready_pattern(stall_for(10));
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::StoreRequest, 0, 4, 40),
        from_node2(Command::StoreRequest, 0, 5, 50),
    ]));

    // The first store fills both channels, the data of the first is then
    // stuck, so no part of the second may be delivered
    engine.run_for(8).unwrap();
    assert_eq!(harness.store_addr_out.received(), vec![4]);
    assert_eq!(harness.store_data_out.num_sunk(), 0);
    assert!(harness.controller.stats().ingress_held_cycles > 0);

    engine
        .run_until(|| harness.store_data_out.num_sunk() == 2, 20)
        .unwrap();
    assert_eq!(harness.store_addr_out.received(), vec![4, 5]);
    assert_eq!(
        harness.store_data_out.received(),
        vec![DataWord::new(40, true), DataWord::new(50, true)]
    );
}

#[test]
fn joint_gate_holds_load_request() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness.load_src_node_out.set_ready_pattern(stall_for(10));
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::LoadRequest, 0, 4, 0),
        from_node2(Command::LoadRequest, 0, 6, 0),
    ]));

    engine.run_for(8).unwrap();
    assert_eq!(harness.load_addr_out.received(), vec![4]);
    assert_eq!(harness.load_src_tile_out.num_sunk(), 1);

    engine
        .run_until(|| harness.load_src_node_out.num_sunk() == 2, 20)
        .unwrap();
    assert_eq!(harness.load_addr_out.received(), vec![4, 6]);
    assert_eq!(harness.load_src_tile_out.num_sunk(), 2);
    assert_eq!(harness.controller.stats().dropped_load_request_fields, 0);
}

#[test]
fn address_only_gate_drops_fields() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::AddressOnly);
    harness.load_src_node_out.set_ready_pattern(stall_for(10));
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::LoadRequest, 0, 4, 0),
        from_node2(Command::LoadRequest, 0, 6, 0),
    ]));

    engine.run_for(20).unwrap();
    assert_eq!(harness.load_addr_out.received(), vec![4, 6]);
    assert_eq!(harness.load_src_tile_out.num_sunk(), 2);
    assert_eq!(harness.load_src_node_out.num_sunk(), 1);
    assert_eq!(harness.controller.stats().dropped_load_request_fields, 1);
}

#[test]
fn load_response_by_destination_tile() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::LoadResponse, 2, 8, 80),
        from_node2(Command::LoadResponse, SENTINEL, 9, 90),
    ]));

    engine
        .run_until(|| harness.cpu_out.num_sunk() == 1, 20)
        .unwrap();
    assert_eq!(
        harness.load_response_out.received(),
        vec![DataWord::new(80, true)]
    );

    let cpu = &harness.cpu_out.received()[0];
    assert_eq!(cpu.payload.data, DataWord::new(90, true));
    assert_eq!(cpu.src_node, NodeId(2));
    assert_eq!(cpu.dst_node, NodeId(1));
    assert_eq!(cpu.dst_tile, SENTINEL);
    // Coordinates are swapped on the way to the CPU
    assert_eq!(cpu.src_coord, Coord::new(1, 0));
    assert_eq!(cpu.dst_coord, Coord::new(2, 0));
}

#[test]
fn complete_to_cpu() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    let mut complete = from_node2(Command::Complete, 1, 0, 0);
    complete.opaque = 3;
    complete.vc = 1;
    harness.noc_in.set_generator(generator(vec![complete]));

    engine
        .run_until(|| harness.cpu_out.num_sunk() == 1, 20)
        .unwrap();
    let cpu = &harness.cpu_out.received()[0];
    assert_eq!(cpu.payload.command(), Some(Command::Complete));
    assert_eq!(cpu.src_tile, 3);
    assert_eq!(cpu.dst_tile, 1);
    assert_eq!((cpu.opaque, cpu.vc), (0, 0));
}

#[test]
fn config_class_to_ring() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    let commands: Vec<_> = Command::ALL
        .into_iter()
        .filter(|c| c.is_config_class())
        .collect();
    harness.noc_in.set_generator(generator(
        commands
            .iter()
            .map(|c| from_node2(*c, 2, 0, 0))
            .collect(),
    ));

    engine
        .run_until(|| harness.ring_out.num_sunk() == commands.len(), 40)
        .unwrap();
    let received = harness.ring_out.received();
    let ring_commands: Vec<_> = received
        .iter()
        .map(|p| p.payload.command().unwrap())
        .collect();
    assert_eq!(ring_commands, commands);
    for packet in &received {
        assert_eq!(packet.src_coord, Coord::new(2, 0));
        assert_eq!(packet.dst_coord, Coord::new(1, 0));
        assert_eq!(packet.dst_tile, 2);
    }
    assert_eq!(
        harness.controller.stats().dispatched_to(Destination::CtrlRing),
        commands.len() as u64
    );
}

#[test]
fn unsupported_command_stops_simulation() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness.noc_in.set_generator(generator(vec![from_node2_code(2)]));

    let err = engine.run_for(5).unwrap_err();
    assert_eq!(err.to_string(), "Error: unsupported command 2");
    assert_eq!(harness.controller.stats().dispatched, [0; 5]);
    assert!(harness.controller.line_trace().starts_with("noc:"));
    assert!(!harness.controller.line_trace().starts_with("noc:."));
}

#[test]
fn held_while_cpu_busy() {
    let engine = start_test(file!());
    let harness = harness_with(&engine, LoadRequestGate::Joint);
    harness.cpu_out.set_ready_pattern(stall_for(10));
    harness.noc_in.set_generator(generator(vec![
        from_node2(Command::Complete, 1, 0, 1),
        from_node2(Command::Complete, 1, 0, 2),
        from_node2(Command::Const, 0, 0, 3),
    ]));

    // The head of line packet blocks the ring packet behind it
    engine.run_for(8).unwrap();
    assert_eq!(harness.ring_out.num_sunk(), 0);

    engine
        .run_until(|| harness.ring_out.num_sunk() == 1, 20)
        .unwrap();
    let data: Vec<_> = harness
        .cpu_out
        .received()
        .iter()
        .map(|p| p.payload.data.payload)
        .collect();
    assert_eq!(data, vec![1, 2]);
}
