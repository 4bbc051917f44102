// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use crate::Tag;
use crate::tracker::Track;

/// A tracker that does nothing.
///
/// This can be useful for benchmarks that want to have minimum overheads.
pub struct DevNullTracker;

impl Track for DevNullTracker {
    fn unique_tag(&self) -> Tag {
        Tag(0)
    }

    fn is_entity_enabled(&self, _tag: Tag, _level: log::Level) -> bool {
        false
    }
    fn add_entity(&self, _tag: Tag, _entity_name: &str) {}
    fn enter(&self, _tag: Tag, _obj: Tag) {}
    fn exit(&self, _tag: Tag, _obj: Tag) {}
    fn create(&self, _tag: Tag, _obj: Tag, _name: &str) {}
    fn destroy(&self, _tag: Tag, _obj: Tag) {}
    fn connect(&self, _from: Tag, _to: Tag) {}
    fn log(&self, _tag: Tag, _level: log::Level, _msg: std::fmt::Arguments) {}
    fn time(&self, _set_by: Tag, _time_ns: f64) {}
    fn shutdown(&self) {}
}
