// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::tracker::{EntityManager, Track};
use crate::{SharedWriter, Tag, Writer};

/// A simple text logger to output messages to a Writer.
pub struct TextTracker {
    entity_manager: EntityManager,

    /// Writer to which all _log_ events will be written.
    writer: SharedWriter,
}

impl TextTracker {
    /// Create a new [`TextTracker`] with an [`EntityManager`].
    pub fn new(entity_manager: EntityManager, writer: Writer) -> Self {
        Self {
            entity_manager,
            writer: Rc::new(RefCell::new(writer)),
        }
    }

    fn write_line(&self, line: String) {
        self.writer
            .borrow_mut()
            .write_all(line.as_bytes())
            .unwrap();
    }
}

/// Implementation for each [`Track`] event
impl Track for TextTracker {
    fn unique_tag(&self) -> Tag {
        self.entity_manager.unique_tag()
    }

    fn is_entity_enabled(&self, tag: Tag, level: log::Level) -> bool {
        self.entity_manager.is_log_enabled_at_level(tag, level)
    }

    fn add_entity(&self, tag: Tag, entity_name: &str) {
        self.entity_manager.add_entity(tag, entity_name);
    }

    fn enter(&self, tag: Tag, object: Tag) {
        self.write_line(format!("{tag}: enter {object}\n"));
    }

    fn exit(&self, tag: Tag, object: Tag) {
        self.write_line(format!("{tag}: exit {object}\n"));
    }

    fn create(&self, created_by: Tag, tag: Tag, name: &str) {
        self.write_line(format!("{created_by}: created {tag}, {name}\n"));
    }

    fn destroy(&self, destroyed_by: Tag, tag: Tag) {
        self.write_line(format!("{destroyed_by}: destroyed {tag}\n"));
    }

    fn connect(&self, connect_from: Tag, connect_to: Tag) {
        self.write_line(format!("{connect_from}: connect to {connect_to}\n"));
    }

    fn log(&self, tag: Tag, level: log::Level, msg: std::fmt::Arguments) {
        self.write_line(format!("{tag}:{level}: {msg}\n"));
    }

    fn time(&self, set_by: Tag, time_ns: f64) {
        self.write_line(format!("{set_by}: set time to {time_ns:.1}ns\n"));
    }

    fn shutdown(&self) {
        self.writer.borrow_mut().flush().unwrap();
    }
}
