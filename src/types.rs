// src/types.rs

//! Small shared identifiers and enums.

use std::fmt;

use serde::Deserialize;

/// Vertex id of a stream (or sink sentinel) inside a [`StreamGraph`].
///
/// [`StreamGraph`]: crate::graph::StreamGraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) usize);

impl StreamId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Edge id inside a [`StreamGraph`](crate::graph::StreamGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a buffer accessor in the graph's accessor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessorId(pub(crate) usize);

/// Result of a single `execute` call on a stream.
///
/// This is a closed set; the scheduler dispatches on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecResult {
    /// No more output, ever. Output buffers are already marked EOS.
    EndOfStream,
    /// Produced as much as the output could take this call; more remains.
    BufferOverflow,
    /// Cannot proceed until an input (now in `Underflow`) gets more data.
    BufferUnderflow,
    /// Hit the quantum; call again to resume.
    QuantumExpired,
}

/// Work budget handed to every `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantum {
    /// Maximum number of tuples a stream may produce in one invocation.
    pub n_tuples_max: u32,
}

impl Quantum {
    pub fn new(n_tuples_max: u32) -> Self {
        Self {
            n_tuples_max: n_tuples_max.max(1),
        }
    }
}

impl Default for Quantum {
    fn default() -> Self {
        Quantum {
            n_tuples_max: u32::MAX,
        }
    }
}

/// Which side of an edge supplies the buffer memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufProvision {
    /// Not yet decided (before `prepare`).
    #[default]
    None,
    Producer,
    Consumer,
}

/// Sort direction of one key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

