//! Hooks for observing a decode as it runs.

use trellis_core::{node::Node, value::Value};

/// Receives intermediate results during a decode.
///
/// Every method has an empty default, so implementors only override what
/// they care about.
pub trait TraceSink {
    /// Called once with the document before it is resolved.
    fn document(&self, _node: &Node) {}

    /// Called after a block instance's body is decoded.
    fn block(&self, _kind: &str, _labels: &[String]) {}

    /// Called for every attribute after its value is coerced.
    fn attribute(&self, _name: &str, _value: &Value) {}
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records every event as a line of text.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTrace {
        pub(crate) events: RefCell<Vec<String>>,
    }

    impl TraceSink for RecordingTrace {
        fn document(&self, node: &Node) {
            self.events.borrow_mut().push(format!("document {}", node.kind()));
        }

        fn block(&self, kind: &str, labels: &[String]) {
            self.events
                .borrow_mut()
                .push(format!("block {kind} [{}]", labels.join(", ")));
        }

        fn attribute(&self, name: &str, value: &Value) {
            self.events.borrow_mut().push(format!("attribute {name} = {value}"));
        }
    }
}
