// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The node controller.
//!
//! Each cycle the controller:
//!  - arbitrates between its five local sources and, if the network output can
//!    accept, sends the winner after resolving its destination;
//!  - looks at the packet at the head of the network input and forwards it to
//!    its local destination if that destination can accept. Otherwise the
//!    packet is held.
//!
//! The tile id equal to the number of tiles in a node (the *sentinel*)
//! addresses the controller itself and the hosting CPU.
//!
//! # Ports
//!
//! Network:
//!  - `rx_noc`, `tx_noc`: [NocPacket]
//!
//! Tiles:
//!  - `rx_tile_load_request`, `rx_tile_store_request`,
//!    `rx_tile_load_response`: [NocPacket]
//!  - `tx_tile_load_request_addr` (`u64`), `tx_tile_load_request_src_node`
//!    ([NodeId]), `tx_tile_load_request_src_tile` (`u32`)
//!  - `tx_tile_store_request_addr` (`u64`), `tx_tile_store_request_data`
//!    ([DataWord])
//!  - `tx_tile_load_response_data` ([DataWord])
//!
//! CPU and configuration ring:
//!  - `rx_cpu`, `tx_cpu`, `rx_ctrl_ring`, `tx_ctrl_ring`: [IntraPacket]

use std::cell::RefCell;
use std::rc::Rc;

use fabric_components::arbiter::GrantState;
use fabric_engine::engine::Engine;
use fabric_engine::port::{InPort, OutPort, PortStateResult};
use fabric_engine::sim_error;
use fabric_engine::traits::{Evaluate, SimObject};
use fabric_engine::types::{SimError, SimResult};
use fabric_model_builder::{EntityDisplay, EntityGet};
use fabric_track::entity::Entity;
use fabric_track::{error, trace, warn};
use itertools::Itertools;

use crate::config::{ControllerConfig, LoadRequestGate};
use crate::packet::{Coord, DataWord, IntraPacket, NocPacket, NodeId};
use crate::routing::RoutingTables;

pub mod crossbar;
pub mod dispatch;
pub mod egress;

use crossbar::{Crossbar, CrossbarInput, NUM_CROSSBAR_INPUTS, Wrapper};
use dispatch::{Destination, NUM_DESTINATIONS, classify, to_cpu, to_ctrl_ring};
use egress::resolve_egress;

/// Counters describing what the controller has done so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Packets sent to the network, indexed by [CrossbarInput].
    pub crossbar_grants: [u64; NUM_CROSSBAR_INPUTS],

    /// Packets delivered from the network, indexed by [Destination].
    pub dispatched: [u64; NUM_DESTINATIONS],

    /// Cycles in which the crossbar had a winner but the network output was
    /// full.
    pub crossbar_blocked_cycles: u64,

    /// Cycles in which the inbound packet was held by its destination.
    pub ingress_held_cycles: u64,

    /// Load request source fields that could not be written with the
    /// address-only gate.
    pub dropped_load_request_fields: u64,
}

impl ControllerStats {
    #[must_use]
    pub fn grants(&self, input: CrossbarInput) -> u64 {
        self.crossbar_grants[input.index()]
    }

    #[must_use]
    pub fn dispatched_to(&self, destination: Destination) -> u64 {
        self.dispatched[destination.index()]
    }
}

#[derive(EntityDisplay, EntityGet)]
pub struct Controller {
    pub entity: Rc<Entity>,
    node_id: NodeId,
    node_coord: Coord,
    num_tiles: u32,
    tables: Rc<RoutingTables>,
    load_request_gate: LoadRequestGate,
    crossbar: RefCell<Crossbar>,
    stats: RefCell<ControllerStats>,

    rx_noc: InPort<NocPacket>,
    rx_cpu: InPort<IntraPacket>,
    rx_ctrl_ring: InPort<IntraPacket>,
    rx_tile_load_request: InPort<NocPacket>,
    rx_tile_store_request: InPort<NocPacket>,
    rx_tile_load_response: InPort<NocPacket>,

    tx_noc: RefCell<OutPort<NocPacket>>,
    tx_cpu: RefCell<OutPort<IntraPacket>>,
    tx_ctrl_ring: RefCell<OutPort<IntraPacket>>,
    tx_tile_load_request_addr: RefCell<OutPort<u64>>,
    tx_tile_load_request_src_node: RefCell<OutPort<NodeId>>,
    tx_tile_load_request_src_tile: RefCell<OutPort<u32>>,
    tx_tile_load_response_data: RefCell<OutPort<DataWord>>,
    tx_tile_store_request_addr: RefCell<OutPort<u64>>,
    tx_tile_store_request_data: RefCell<OutPort<DataWord>>,
}

fn peek_valid<T: SimObject>(port: &InPort<T>) -> Result<T, SimError> {
    match port.peek() {
        Some(value) => Ok(value),
        None => sim_error!(format!("{port} granted while empty")),
    }
}

fn port_summary<T: SimObject>(name: &str, port: &InPort<T>) -> String {
    match port.peek() {
        Some(value) => format!("{name}:{value}"),
        None => format!("{name}:."),
    }
}

impl Controller {
    /// Create the controller of node `node_id`.
    ///
    /// The routing tables are shared by all the controllers of a fabric. They
    /// must contain coordinates for this node and for node 0, which receives
    /// configuration ring traffic.
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        node_id: NodeId,
        config: &ControllerConfig,
        tables: Rc<RoutingTables>,
    ) -> Result<Rc<Self>, SimError> {
        if config.num_tiles == 0 {
            return sim_error!(format!("{name}: num_tiles must be at least 1"));
        }
        let node_coord = tables.coords.coord(node_id)?;
        tables.coords.coord(NodeId(0))?;

        let entity = Rc::new(Entity::new(parent, name));
        let clock = engine.default_clock();
        let crossbar = Crossbar::new(&entity, config.arbitration.build(NUM_CROSSBAR_INPUTS));

        let rc_self = Rc::new(Self {
            node_id,
            node_coord,
            num_tiles: config.num_tiles,
            tables,
            load_request_gate: config.load_request_gate,
            crossbar: RefCell::new(crossbar),
            stats: RefCell::new(ControllerStats::default()),
            rx_noc: InPort::new(&clock, &entity, "rx_noc"),
            rx_cpu: InPort::new(&clock, &entity, "rx_cpu"),
            rx_ctrl_ring: InPort::new(&clock, &entity, "rx_ctrl_ring"),
            rx_tile_load_request: InPort::new(&clock, &entity, "rx_tile_load_request"),
            rx_tile_store_request: InPort::new(&clock, &entity, "rx_tile_store_request"),
            rx_tile_load_response: InPort::new(&clock, &entity, "rx_tile_load_response"),
            tx_noc: RefCell::new(OutPort::new(&entity, "tx_noc")),
            tx_cpu: RefCell::new(OutPort::new(&entity, "tx_cpu")),
            tx_ctrl_ring: RefCell::new(OutPort::new(&entity, "tx_ctrl_ring")),
            tx_tile_load_request_addr: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_load_request_addr",
            )),
            tx_tile_load_request_src_node: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_load_request_src_node",
            )),
            tx_tile_load_request_src_tile: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_load_request_src_tile",
            )),
            tx_tile_load_response_data: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_load_response_data",
            )),
            tx_tile_store_request_addr: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_store_request_addr",
            )),
            tx_tile_store_request_data: RefCell::new(OutPort::new(
                &entity,
                "tx_tile_store_request_data",
            )),
            entity,
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    #[must_use]
    pub fn node_coord(&self) -> Coord {
        self.node_coord
    }

    /// The tile id that addresses this controller.
    #[must_use]
    pub fn sentinel(&self) -> u32 {
        self.num_tiles
    }

    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        self.stats.borrow().clone()
    }

    #[must_use]
    pub fn crossbar_state(&self) -> GrantState {
        self.crossbar.borrow().state()
    }

    pub fn port_rx_noc(&self) -> PortStateResult<NocPacket> {
        self.rx_noc.state()
    }

    pub fn port_rx_cpu(&self) -> PortStateResult<IntraPacket> {
        self.rx_cpu.state()
    }

    pub fn port_rx_ctrl_ring(&self) -> PortStateResult<IntraPacket> {
        self.rx_ctrl_ring.state()
    }

    pub fn port_rx_tile_load_request(&self) -> PortStateResult<NocPacket> {
        self.rx_tile_load_request.state()
    }

    pub fn port_rx_tile_store_request(&self) -> PortStateResult<NocPacket> {
        self.rx_tile_store_request.state()
    }

    pub fn port_rx_tile_load_response(&self) -> PortStateResult<NocPacket> {
        self.rx_tile_load_response.state()
    }

    pub fn connect_port_tx_noc(&self, port_state: PortStateResult<NocPacket>) -> SimResult {
        self.tx_noc.borrow_mut().connect(port_state)
    }

    pub fn connect_port_tx_cpu(&self, port_state: PortStateResult<IntraPacket>) -> SimResult {
        self.tx_cpu.borrow_mut().connect(port_state)
    }

    pub fn connect_port_tx_ctrl_ring(&self, port_state: PortStateResult<IntraPacket>) -> SimResult {
        self.tx_ctrl_ring.borrow_mut().connect(port_state)
    }

    pub fn connect_port_tx_tile_load_request_addr(
        &self,
        port_state: PortStateResult<u64>,
    ) -> SimResult {
        self.tx_tile_load_request_addr
            .borrow_mut()
            .connect(port_state)
    }

    pub fn connect_port_tx_tile_load_request_src_node(
        &self,
        port_state: PortStateResult<NodeId>,
    ) -> SimResult {
        self.tx_tile_load_request_src_node
            .borrow_mut()
            .connect(port_state)
    }

    pub fn connect_port_tx_tile_load_request_src_tile(
        &self,
        port_state: PortStateResult<u32>,
    ) -> SimResult {
        self.tx_tile_load_request_src_tile
            .borrow_mut()
            .connect(port_state)
    }

    pub fn connect_port_tx_tile_load_response_data(
        &self,
        port_state: PortStateResult<DataWord>,
    ) -> SimResult {
        self.tx_tile_load_response_data
            .borrow_mut()
            .connect(port_state)
    }

    pub fn connect_port_tx_tile_store_request_addr(
        &self,
        port_state: PortStateResult<u64>,
    ) -> SimResult {
        self.tx_tile_store_request_addr
            .borrow_mut()
            .connect(port_state)
    }

    pub fn connect_port_tx_tile_store_request_data(
        &self,
        port_state: PortStateResult<DataWord>,
    ) -> SimResult {
        self.tx_tile_store_request_data
            .borrow_mut()
            .connect(port_state)
    }

    /// One line describing the values waiting at each input and the crossbar
    /// state.
    #[must_use]
    pub fn line_trace(&self) -> String {
        let inputs = [
            port_summary("noc", &self.rx_noc),
            port_summary("ld", &self.rx_tile_load_request),
            port_summary("st", &self.rx_tile_store_request),
            port_summary("resp", &self.rx_tile_load_response),
            port_summary("cpu", &self.rx_cpu),
            port_summary("ring", &self.rx_ctrl_ring),
        ];
        format!(
            "{} | xbar:{}",
            inputs.iter().join(" | "),
            self.crossbar_state()
        )
    }

    fn wrapper(&self) -> Wrapper<'_> {
        Wrapper {
            node_id: self.node_id,
            node_coord: self.node_coord,
            sentinel: self.num_tiles,
            tables: &self.tables,
        }
    }

    /// The wrapped value at the head of `input`. The value is not consumed.
    fn peek_wrapped(&self, input: CrossbarInput) -> Result<NocPacket, SimError> {
        let wrapper = self.wrapper();
        match input {
            CrossbarInput::TileLoadRequest => {
                Ok(wrapper.tile_request(peek_valid(&self.rx_tile_load_request)?))
            }
            CrossbarInput::TileStoreRequest => {
                Ok(wrapper.tile_request(peek_valid(&self.rx_tile_store_request)?))
            }
            CrossbarInput::TileLoadResponse => {
                wrapper.tile_load_response(peek_valid(&self.rx_tile_load_response)?)
            }
            CrossbarInput::Cpu => wrapper.cpu(peek_valid(&self.rx_cpu)?),
            CrossbarInput::CtrlRing => wrapper.ctrl_ring(peek_valid(&self.rx_ctrl_ring)?),
        }
    }

    fn consume(&self, input: CrossbarInput) -> SimResult {
        match input {
            CrossbarInput::TileLoadRequest => self.rx_tile_load_request.take().map(|_| ()),
            CrossbarInput::TileStoreRequest => self.rx_tile_store_request.take().map(|_| ()),
            CrossbarInput::TileLoadResponse => self.rx_tile_load_response.take().map(|_| ()),
            CrossbarInput::Cpu => self.rx_cpu.take().map(|_| ()),
            CrossbarInput::CtrlRing => self.rx_ctrl_ring.take().map(|_| ()),
        }
    }

    fn drive_egress(&self) -> SimResult {
        let requests = [
            self.rx_tile_load_request.is_valid(),
            self.rx_tile_store_request.is_valid(),
            self.rx_tile_load_response.is_valid(),
            self.rx_cpu.is_valid(),
            self.rx_ctrl_ring.is_valid(),
        ];
        let tx = self.tx_noc.borrow();
        let egress_ready = tx.ready()?;

        let state = self.crossbar.borrow_mut().step(&requests, egress_ready);
        match state {
            GrantState::Idle => {}
            GrantState::Blocked(_) => self.stats.borrow_mut().crossbar_blocked_cycles += 1,
            GrantState::Granted(index) => {
                let input = CrossbarInput::ALL[index];
                let packet = resolve_egress(&self.tables, self.peek_wrapped(input)?)?;
                self.consume(input)?;
                trace!(self.entity ; "egress {}: {}", input, packet);
                tx.put(packet)?;
                self.stats.borrow_mut().crossbar_grants[index] += 1;
            }
        }
        Ok(())
    }

    fn dispatch_ingress(&self) -> SimResult {
        let Some(packet) = self.rx_noc.peek() else {
            return Ok(());
        };
        let destination = match classify(&packet, self.num_tiles) {
            Ok(destination) => destination,
            Err(e) => {
                error!(self.entity ; "{}: {}", e.0, packet);
                return Err(e);
            }
        };

        let delivered = match destination {
            Destination::TileLoadRequest => self.deliver_load_request()?,
            Destination::TileStoreRequest => self.deliver_store_request()?,
            Destination::TileLoadResponse => self.deliver_load_response()?,
            Destination::Cpu => {
                let tx = self.tx_cpu.borrow();
                if tx.ready()? {
                    tx.put(to_cpu(self.rx_noc.take()?))?;
                    true
                } else {
                    false
                }
            }
            Destination::CtrlRing => {
                let tx = self.tx_ctrl_ring.borrow();
                if tx.ready()? {
                    tx.put(to_ctrl_ring(self.rx_noc.take()?))?;
                    true
                } else {
                    false
                }
            }
        };

        let mut stats = self.stats.borrow_mut();
        if delivered {
            trace!(self.entity ; "ingress {}: {}", destination, packet);
            stats.dispatched[destination.index()] += 1;
        } else {
            stats.ingress_held_cycles += 1;
        }
        Ok(())
    }

    fn deliver_load_request(&self) -> Result<bool, SimError> {
        let addr = self.tx_tile_load_request_addr.borrow();
        let src_node = self.tx_tile_load_request_src_node.borrow();
        let src_tile = self.tx_tile_load_request_src_tile.borrow();
        let addr_ready = addr.ready()?;
        let src_node_ready = src_node.ready()?;
        let src_tile_ready = src_tile.ready()?;

        let admit = match self.load_request_gate {
            LoadRequestGate::Joint => addr_ready && src_node_ready && src_tile_ready,
            LoadRequestGate::AddressOnly => addr_ready,
        };
        if !admit {
            return Ok(false);
        }

        let packet = self.rx_noc.take()?;
        addr.put(packet.payload.data_addr)?;
        if src_node_ready {
            src_node.put(packet.src_node)?;
        } else {
            self.drop_load_request_field("src_node", &packet);
        }
        if src_tile_ready {
            src_tile.put(packet.src_tile)?;
        } else {
            self.drop_load_request_field("src_tile", &packet);
        }
        Ok(true)
    }

    fn drop_load_request_field(&self, field: &str, packet: &NocPacket) {
        warn!(self.entity ; "dropped {} of {}", field, packet);
        self.stats.borrow_mut().dropped_load_request_fields += 1;
    }

    fn deliver_store_request(&self) -> Result<bool, SimError> {
        let addr = self.tx_tile_store_request_addr.borrow();
        let data = self.tx_tile_store_request_data.borrow();
        if !(addr.ready()? && data.ready()?) {
            return Ok(false);
        }

        let packet = self.rx_noc.take()?;
        addr.put(packet.payload.data_addr)?;
        data.put(packet.payload.data)?;
        Ok(true)
    }

    fn deliver_load_response(&self) -> Result<bool, SimError> {
        let data = self.tx_tile_load_response_data.borrow();
        if !data.ready()? {
            return Ok(false);
        }

        let packet = self.rx_noc.take()?;
        data.put(packet.payload.data)?;
        Ok(true)
    }
}

impl Evaluate for Controller {
    fn evaluate(&self) -> SimResult {
        self.drive_egress()?;
        self.dispatch_ingress()
    }
}
