// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Drive random traffic through the controller of one node.
//!
//! The local tiles issue loads and stores to random addresses, the CPU sends a
//! `COMPLETE` to every other node and a peer node sends a mix of memory and
//! configuration traffic to this node. Every output accepts on a random
//! subset of cycles.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use fabric_components::arbiter::policy::ArbitrationPolicy;
use fabric_components::connect_port;
use fabric_components::sink::Sink;
use fabric_components::source::Source;
use fabric_components::types::ReadyPattern;
use fabric_controller::address_map::AddressRange;
use fabric_controller::config::ControllerConfig;
use fabric_controller::controller::Controller;
use fabric_controller::controller::crossbar::CrossbarInput;
use fabric_controller::controller::dispatch::Destination;
use fabric_controller::packet::{
    Command, DataWord, IntraPacket, NocPacket, NodeId, Payload,
};
use fabric_engine::engine::Engine;
use fabric_engine::sim_error;
use fabric_engine::types::SimError;
use fabric_track::builder::{TrackerConfig, setup_tracker};
use fabric_track::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Fabric node controller simulation")]
struct Cli {
    /// TOML file describing the address map and node coordinates.
    #[arg(long, default_value = "demos/sim-controller/conf/four_nodes.toml")]
    conf_file: PathBuf,

    /// The node whose controller is simulated.
    #[arg(long, default_value = "1")]
    node_id: u32,

    /// Override the crossbar arbitration policy of the configuration file.
    #[clap(long, value_enum)]
    arbitration: Option<ArbitrationPolicy>,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Set a regular expression for which entities should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long, default_value = "")]
    stdout_filter_regex: String,

    /// Number of load and store requests issued by the local tiles.
    #[arg(long, default_value = "100")]
    num_requests: usize,

    /// Number of packets sent to this node by its peer.
    #[arg(long, default_value = "100")]
    num_inbound: usize,

    /// Seed for random number generator.
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Fail if the traffic has not drained after this many clock ticks.
    #[arg(long, default_value = "100000")]
    max_ticks: u64,
}

fn random_address(rng: &mut StdRng, ranges: &[AddressRange]) -> u64 {
    let range = ranges[rng.gen_range(0..ranges.len())];
    rng.gen_range(range.begin..=range.end)
}

fn random_ready(rng: &mut StdRng) -> Option<ReadyPattern> {
    let mut rng = StdRng::seed_from_u64(rng.r#gen());
    Some(Box::new(std::iter::repeat_with(move || rng.gen_bool(0.7))))
}

fn tile_requests(
    rng: &mut StdRng,
    command: Command,
    count: usize,
    num_tiles: u32,
    ranges: &[AddressRange],
) -> Vec<NocPacket> {
    (0..count)
        .map(|i| NocPacket {
            src_tile: rng.gen_range(0..num_tiles),
            payload: Payload::new(
                command,
                random_address(rng, ranges),
                DataWord::new(i as u32, true),
            ),
            ..Default::default()
        })
        .collect()
}

fn inbound_traffic(
    rng: &mut StdRng,
    count: usize,
    peer: NodeId,
    node_id: NodeId,
    config: &ControllerConfig,
) -> Vec<NocPacket> {
    let commands = [
        Command::LoadRequest,
        Command::StoreRequest,
        Command::LoadResponse,
        Command::Config,
        Command::Launch,
    ];
    (0..count)
        .map(|i| NocPacket {
            src_node: peer,
            dst_node: node_id,
            src_tile: rng.gen_range(0..config.num_tiles),
            // Includes the sentinel so that some responses go to the CPU
            dst_tile: rng.gen_range(0..=config.num_tiles),
            payload: Payload::new(
                commands[rng.gen_range(0..commands.len())],
                rng.gen_range(0..1024),
                DataWord::new(i as u32, rng.gen_bool(0.5)),
            ),
            ..Default::default()
        })
        .collect()
}

fn main() -> Result<(), SimError> {
    let args = Cli::parse();
    let tracker = match setup_tracker(&TrackerConfig {
        enable: true,
        level: args.stdout_level,
        filter_regex: &args.stdout_filter_regex,
        file: None,
    }) {
        Ok(tracker) => tracker,
        Err(e) => return sim_error!(e),
    };
    let engine = Engine::new(&tracker);
    let top = engine.top().clone();

    let mut config = ControllerConfig::load(Some(&args.conf_file))?;
    if let Some(arbitration) = args.arbitration {
        config.arbitration = arbitration;
    }
    let tables = config.build_tables()?;
    let address_ranges: BTreeMap<NodeId, AddressRange> = config.address_ranges()?;
    let ranges: Vec<AddressRange> = address_ranges.values().copied().collect();
    let node_id = NodeId(args.node_id);
    let Some(peer) = address_ranges.keys().copied().find(|n| *n != node_id) else {
        return sim_error!("the configuration must contain at least two nodes");
    };
    info!(top ; "Node {} of {} nodes, arbitration {}, seed {}",
        node_id, address_ranges.len(), config.arbitration, args.seed);

    let mut rng = StdRng::seed_from_u64(args.seed);

    // Sinks first so that every channel can move one value per cycle
    let noc_out = Sink::<NocPacket>::new_and_register(&engine, &top, "noc_out")?;
    let cpu_out = Sink::<IntraPacket>::new_and_register(&engine, &top, "cpu_out")?;
    let ring_out = Sink::<IntraPacket>::new_and_register(&engine, &top, "ring_out")?;
    let load_addr_out = Sink::<u64>::new_and_register(&engine, &top, "load_addr_out")?;
    let load_src_node_out = Sink::<NodeId>::new_and_register(&engine, &top, "load_src_node_out")?;
    let load_src_tile_out = Sink::<u32>::new_and_register(&engine, &top, "load_src_tile_out")?;
    let load_response_out = Sink::<DataWord>::new_and_register(&engine, &top, "load_response_out")?;
    let store_addr_out = Sink::<u64>::new_and_register(&engine, &top, "store_addr_out")?;
    let store_data_out = Sink::<DataWord>::new_and_register(&engine, &top, "store_data_out")?;
    noc_out.set_ready_pattern(random_ready(&mut rng));
    cpu_out.set_ready_pattern(random_ready(&mut rng));
    ring_out.set_ready_pattern(random_ready(&mut rng));
    load_addr_out.set_ready_pattern(random_ready(&mut rng));
    store_data_out.set_ready_pattern(random_ready(&mut rng));

    let controller =
        Controller::new_and_register(&engine, &top, "controller", node_id, &config, tables)?;

    let loads = tile_requests(
        &mut rng,
        Command::LoadRequest,
        args.num_requests,
        config.num_tiles,
        &ranges,
    );
    let stores = tile_requests(
        &mut rng,
        Command::StoreRequest,
        args.num_requests,
        config.num_tiles,
        &ranges,
    );
    let completes: Vec<IntraPacket> = address_ranges
        .keys()
        .filter(|n| **n != node_id)
        .map(|n| IntraPacket {
            dst_node: *n,
            payload: Payload::new(Command::Complete, 0, DataWord::default()),
            ..Default::default()
        })
        .collect();
    let inbound = inbound_traffic(&mut rng, args.num_inbound, peer, node_id, &config);
    let num_egress = loads.len() + stores.len() + completes.len();

    let load_in = Source::new_and_register(&engine, &top, "load_in", Some(Box::new(loads.into_iter())))?;
    let store_in =
        Source::new_and_register(&engine, &top, "store_in", Some(Box::new(stores.into_iter())))?;
    let cpu_in = Source::new_and_register(&engine, &top, "cpu_in", Some(Box::new(completes.into_iter())))?;
    let noc_in =
        Source::new_and_register(&engine, &top, "noc_in", Some(Box::new(inbound.into_iter())))?;

    connect_port!(load_in, tx => controller, rx_tile_load_request)?;
    connect_port!(store_in, tx => controller, rx_tile_store_request)?;
    connect_port!(cpu_in, tx => controller, rx_cpu)?;
    connect_port!(noc_in, tx => controller, rx_noc)?;
    connect_port!(controller, tx_noc => noc_out, rx)?;
    connect_port!(controller, tx_cpu => cpu_out, rx)?;
    connect_port!(controller, tx_ctrl_ring => ring_out, rx)?;
    connect_port!(controller, tx_tile_load_request_addr => load_addr_out, rx)?;
    connect_port!(controller, tx_tile_load_request_src_node => load_src_node_out, rx)?;
    connect_port!(controller, tx_tile_load_request_src_tile => load_src_tile_out, rx)?;
    connect_port!(controller, tx_tile_load_response_data => load_response_out, rx)?;
    connect_port!(controller, tx_tile_store_request_addr => store_addr_out, rx)?;
    connect_port!(controller, tx_tile_store_request_data => store_data_out, rx)?;

    info!(top ; "Platform built and connected");

    let num_inbound = args.num_inbound as u64;
    let result = engine.run_until(
        || {
            let stats = controller.stats();
            noc_out.num_sunk() == num_egress
                && stats.dispatched.iter().sum::<u64>() == num_inbound
        },
        args.max_ticks,
    );
    if let Err(e) = result {
        error!(top ; "{}", e);
        error!(top ; "{}", controller.line_trace());
        return Err(e);
    }

    let stats = controller.stats();
    info!(top ; "Pass: {} packets sent and {} received in {:.2}ns",
        num_egress, num_inbound, engine.time_now_ns());
    for input in CrossbarInput::ALL {
        info!(top ; "  egress from {}: {}", input, stats.grants(input));
    }
    for destination in Destination::ALL {
        info!(top ; "  ingress to {}: {}", destination, stats.dispatched_to(destination));
    }
    info!(top ; "  crossbar blocked for {} cycles, ingress held for {} cycles",
        stats.crossbar_blocked_cycles, stats.ingress_held_cycles);
    Ok(())
}
