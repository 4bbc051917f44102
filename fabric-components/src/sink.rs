// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A data sink.
//!
//! A [Sink] is an object that will accept and keep all the data that
//! is received on its input port. An optional [ReadyPattern] controls in which
//! cycles it accepts, which allows tests to apply backpressure.
//!
//! # Ports
//!
//! This component has:
//!  - One [input port](fabric_engine::port::InPort): `rx`

use std::cell::RefCell;
use std::rc::Rc;

use fabric_engine::engine::Engine;
use fabric_engine::port::{InPort, PortStateResult};
use fabric_engine::traits::{Evaluate, SimObject};
use fabric_engine::types::{SimError, SimResult};
use fabric_model_builder::{EntityDisplay, EntityGet};
use fabric_track::entity::Entity;
use fabric_track::trace;

use crate::types::ReadyPattern;

#[derive(EntityDisplay, EntityGet)]
pub struct Sink<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    received: RefCell<Vec<T>>,
    ready_pattern: RefCell<Option<ReadyPattern>>,
    rx: InPort<T>,
}

impl<T> Sink<T>
where
    T: SimObject,
{
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        let rx = InPort::new(&engine.default_clock(), &entity, "rx");
        let rc_self = Rc::new(Self {
            entity,
            received: RefCell::new(Vec::new()),
            ready_pattern: RefCell::new(None),
            rx,
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn set_ready_pattern(&self, ready_pattern: Option<ReadyPattern>) {
        *self.ready_pattern.borrow_mut() = ready_pattern;
    }

    pub fn port_rx(&self) -> PortStateResult<T> {
        self.rx.state()
    }

    #[must_use]
    pub fn num_sunk(&self) -> usize {
        self.received.borrow().len()
    }

    /// A copy of all values received so far, in arrival order.
    #[must_use]
    pub fn received(&self) -> Vec<T> {
        self.received.borrow().clone()
    }

    fn is_ready(&self) -> bool {
        match self.ready_pattern.borrow_mut().as_mut() {
            Some(pattern) => pattern.next().unwrap_or(true),
            None => true,
        }
    }
}

impl<T> Evaluate for Sink<T>
where
    T: SimObject,
{
    fn evaluate(&self) -> SimResult {
        if self.is_ready() && self.rx.is_valid() {
            let value = self.rx.take()?;
            trace!(self.entity ; "sunk {}", value);
            self.received.borrow_mut().push(value);
        }
        Ok(())
    }
}
