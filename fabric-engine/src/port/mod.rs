// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Ports and the elastic buffers that connect them.
//!
//! An [`OutPort`] is connected to exactly one [`InPort`]. The [`InPort`] owns
//! an [`ElasticBuffer`], a single slot holding at most one value. A value
//! written by the producer during a cycle only becomes visible to the consumer
//! after the next clock edge. The producer may write while the slot is empty,
//! including when the consumer has drained it earlier in the same cycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use fabric_track::entity::Entity;
use fabric_track::{connect, enter, exit};

use crate::sim_error;
use crate::time::clock::Clock;
use crate::traits::{Resolve, SimObject};
use crate::types::{SimError, SimResult};

pub type PortStateResult<T> = Result<Rc<ElasticBuffer<T>>, SimError>;

/// The single-slot buffer shared by one producer and one consumer.
pub struct ElasticBuffer<T>
where
    T: SimObject,
{
    /// Value committed at the last clock edge.
    value: RefCell<Option<T>>,

    /// Value written this cycle, committed at the next clock edge.
    incoming: RefCell<Option<T>>,

    clock: Clock,
    pub in_port_entity: Rc<Entity>,
}

impl<T> ElasticBuffer<T>
where
    T: SimObject,
{
    fn new(clock: &Clock, in_port_entity: Rc<Entity>) -> Self {
        Self {
            value: RefCell::new(None),
            incoming: RefCell::new(None),
            clock: clock.clone(),
            in_port_entity,
        }
    }

    fn can_accept(&self) -> bool {
        self.incoming.borrow().is_none() && self.value.borrow().is_none()
    }
}

impl<T> Resolve for ElasticBuffer<T>
where
    T: SimObject,
{
    fn resolve(&self) {
        if let Some(value) = self.incoming.borrow_mut().take() {
            *self.value.borrow_mut() = Some(value);
        }
    }
}

pub struct InPort<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    state: Rc<ElasticBuffer<T>>,
    connected: Cell<bool>,
}

impl<T> fmt::Display for InPort<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

impl<T> InPort<T>
where
    T: SimObject,
{
    #[must_use]
    pub fn new(clock: &Clock, parent: &Rc<Entity>, name: &str) -> Self {
        let entity = Rc::new(Entity::new(parent, name));
        Self {
            entity: entity.clone(),
            state: Rc::new(ElasticBuffer::new(clock, entity)),
            connected: Cell::new(false),
        }
    }

    /// Return the shared state so that an [`OutPort`] can be connected.
    ///
    /// Can only be called once.
    pub fn state(&self) -> PortStateResult<T> {
        if self.connected.get() {
            return sim_error!(format!("{self} already connected"));
        }

        self.connected.set(true);
        Ok(self.state.clone())
    }

    /// The consumer side sees a valid value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.value.borrow().is_some()
    }

    /// Look at the current value without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.state.value.borrow().clone()
    }

    /// Consume the current value. This is the handshake completing, so the
    /// producer is able to write again in this cycle.
    pub fn take(&self) -> Result<T, SimError> {
        match self.state.value.borrow_mut().take() {
            Some(value) => {
                enter!(self.entity ; value.tag());
                Ok(value)
            }
            None => sim_error!(format!("{self} take while empty")),
        }
    }
}

pub struct OutPort<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    state: Option<Rc<ElasticBuffer<T>>>,
}

impl<T> fmt::Display for OutPort<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

impl<T> OutPort<T>
where
    T: SimObject,
{
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let entity = Rc::new(Entity::new(parent, name));
        Self {
            entity,
            state: None,
        }
    }

    pub fn connect(&mut self, port_state: PortStateResult<T>) -> SimResult {
        let port_state = port_state?;

        connect!(self.entity ; port_state.in_port_entity);
        match self.state {
            Some(_) => {
                return sim_error!(format!("{self} already connected"));
            }
            None => {
                self.state = Some(port_state);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    fn connected_state(&self) -> Result<&Rc<ElasticBuffer<T>>, SimError> {
        match self.state.as_ref() {
            Some(state) => Ok(state),
            None => sim_error!(format!("{self} not connected")),
        }
    }

    /// The consumer is able to accept a value written this cycle.
    pub fn ready(&self) -> Result<bool, SimError> {
        Ok(self.connected_state()?.can_accept())
    }

    /// Write a value. It is an error to write when the port is not ready.
    pub fn put(&self, value: T) -> SimResult {
        let state = self.connected_state()?;
        if !state.can_accept() {
            return sim_error!(format!("{self} put while not ready"));
        }

        exit!(self.entity ; value.tag());
        *state.incoming.borrow_mut() = Some(value);
        let resolve: Rc<dyn Resolve> = state.clone();
        state.clock.resolve_on_tick(resolve);
        Ok(())
    }
}
