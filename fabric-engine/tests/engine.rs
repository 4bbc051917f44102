// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fabric_engine::engine::Engine;
use fabric_engine::port::{InPort, OutPort};
use fabric_engine::test_helpers::start_test;
use fabric_engine::traits::Evaluate;
use fabric_engine::types::SimResult;
use fabric_track::entity::Entity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Writes an incrementing count whenever the port is ready.
struct Counter {
    next: Cell<u32>,
    limit: u32,
    tx: RefCell<OutPort<u32>>,
}

impl Evaluate for Counter {
    fn evaluate(&self) -> SimResult {
        let tx = self.tx.borrow();
        if self.next.get() < self.limit && tx.ready()? {
            tx.put(self.next.get())?;
            self.next.set(self.next.get() + 1);
        }
        Ok(())
    }
}

/// Accepts values on a random subset of cycles.
struct Collector {
    rx: InPort<u32>,
    rng: RefCell<StdRng>,
    received: RefCell<Vec<u32>>,
}

impl Evaluate for Collector {
    fn evaluate(&self) -> SimResult {
        let accept = self.rng.borrow_mut().gen_bool(0.4);
        if accept && self.rx.is_valid() {
            let value = self.rx.take()?;
            self.received.borrow_mut().push(value);
        }
        Ok(())
    }
}

fn build(engine: &Engine, limit: u32, counter_first: bool) -> Rc<Collector> {
    let clock = engine.default_clock();
    let entity = Rc::new(Entity::new(engine.top(), "pair"));
    let collector = Rc::new(Collector {
        rx: InPort::new(&clock, &entity, "rx"),
        rng: RefCell::new(StdRng::seed_from_u64(0x5eed)),
        received: RefCell::new(Vec::new()),
    });
    let counter = Rc::new(Counter {
        next: Cell::new(0),
        limit,
        tx: RefCell::new(OutPort::new(&entity, "tx")),
    });
    counter.tx.borrow_mut().connect(collector.rx.state()).unwrap();

    if counter_first {
        engine.register(counter);
        engine.register(collector.clone());
    } else {
        engine.register(collector.clone());
        engine.register(counter);
    }
    collector
}

#[test]
fn no_loss_either_order() {
    for counter_first in [true, false] {
        let engine = start_test(file!());
        let collector = build(&engine, 50, counter_first);
        engine
            .run_until(|| collector.received.borrow().len() == 50, 1000)
            .unwrap();

        let expected: Vec<u32> = (0..50).collect();
        assert_eq!(*collector.received.borrow(), expected);
    }
}

#[test]
fn run_until_timeout() {
    let engine = start_test(file!());
    let err = engine.run_until(|| false, 10).unwrap_err();
    assert_eq!(err.to_string(), "Error: did not finish within 10 ticks");
    assert_eq!(engine.tick_now(), 10);
}

#[test]
fn run_for_advances_time() {
    let engine = start_test(file!());
    engine.run_for(4).unwrap();
    assert_eq!(engine.tick_now(), 4);
    assert_eq!(engine.time_now_ns(), 4.0);
}
