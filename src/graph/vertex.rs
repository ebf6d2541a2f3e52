// src/graph/vertex.rs

//! Vertex and edge records stored in the graph arenas.

use crate::stream::ExecStream;
use crate::types::{AccessorId, EdgeId, StreamId};

/// Lifecycle state of a stream inside a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unprepared,
    Prepared,
    Open,
    Closed,
}

pub(crate) struct Vertex {
    pub(crate) name: String,
    /// `None` marks a sink sentinel standing for an external reader.
    pub(crate) stream: Option<Box<dyn ExecStream>>,
    pub(crate) state: StreamState,
    pub(crate) in_edges: Vec<EdgeId>,
    pub(crate) out_edges: Vec<EdgeId>,
    /// Accessors of `in_edges` / `out_edges`, same order.
    pub(crate) inputs: Vec<AccessorId>,
    pub(crate) outputs: Vec<AccessorId>,
}

impl Vertex {
    pub(crate) fn new(name: String, stream: Option<Box<dyn ExecStream>>) -> Self {
        Self {
            name,
            stream,
            state: StreamState::Unprepared,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub(crate) fn is_sink(&self) -> bool {
        self.stream.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub(crate) source: StreamId,
    pub(crate) target: StreamId,
    pub(crate) accessor: AccessorId,
}
