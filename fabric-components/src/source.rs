// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A data source.
//!
//! The data source produces data as defined by the [DataGenerator] that is
//! provided. A value is pulled from the generator as soon as the previous one
//! has been accepted.
//!
//! # Ports
//!
//! This component has:
//!  - One [output port](fabric_engine::port::OutPort): `tx`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fabric_engine::engine::Engine;
use fabric_engine::port::{OutPort, PortStateResult};
use fabric_engine::traits::{Evaluate, SimObject};
use fabric_engine::types::{SimError, SimResult};
use fabric_model_builder::{EntityDisplay, EntityGet};
use fabric_track::entity::Entity;
use fabric_track::trace;

use crate::types::DataGenerator;

#[derive(EntityDisplay, EntityGet)]
pub struct Source<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    data_generator: RefCell<Option<DataGenerator<T>>>,
    pending: RefCell<Option<T>>,
    num_sent: Cell<usize>,
    tx: RefCell<OutPort<T>>,
}

impl<T> Source<T>
where
    T: SimObject,
{
    pub fn new_and_register(
        engine: &Engine,
        parent: &Rc<Entity>,
        name: &str,
        data_generator: Option<DataGenerator<T>>,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        let tx = OutPort::new(&entity, "tx");
        let rc_self = Rc::new(Self {
            entity,
            data_generator: RefCell::new(data_generator),
            pending: RefCell::new(None),
            num_sent: Cell::new(0),
            tx: RefCell::new(tx),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn set_generator(&self, data_generator: Option<DataGenerator<T>>) {
        *self.data_generator.borrow_mut() = data_generator;
    }

    pub fn connect_port_tx(&self, port_state: PortStateResult<T>) -> SimResult {
        self.tx.borrow_mut().connect(port_state)
    }

    #[must_use]
    pub fn num_sent(&self) -> usize {
        self.num_sent.get()
    }

    /// Nothing left to send.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pending.borrow().is_none() && self.data_generator.borrow().is_none()
    }

    fn next_value(&self) -> Option<T> {
        let mut pending = self.pending.borrow_mut();
        if pending.is_none() {
            let mut generator = self.data_generator.borrow_mut();
            *pending = generator.as_mut().and_then(|g| g.next());
            if pending.is_none() {
                // Exhausted
                *generator = None;
            }
        }
        pending.clone()
    }
}

impl<T> Evaluate for Source<T>
where
    T: SimObject,
{
    fn evaluate(&self) -> SimResult {
        let Some(value) = self.next_value() else {
            return Ok(());
        };

        let tx = self.tx.borrow();
        if tx.ready()? {
            trace!(self.entity ; "send {}", value);
            tx.put(value)?;
            *self.pending.borrow_mut() = None;
            self.num_sent.set(self.num_sent.get() + 1);
        }
        Ok(())
    }
}
