// src/graph/mod.rs

//! Stream graph: an arena DAG of streams connected by buffer accessors.
//!
//! - [`vertex`] holds the vertex/edge records and [`StreamState`].
//! - [`params`] provides the dynamic-parameter namespace.
//!
//! Vertices are either streams or sink sentinels. A sink sentinel stands for
//! the external reader of a graph output; it has no stream and exactly one
//! incoming edge. Edge lists keep insertion order, which is the order every
//! traversal enumerates them in.

pub mod params;
pub mod vertex;

pub use params::{DynamicParamId, DynamicParams};
pub use vertex::StreamState;

use std::collections::HashSet;

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, trace};

use crate::buffer::BufferAccessor;
use crate::errors::{ExecStreamError, Result};
use crate::stream::{ExecStream, StreamIo};
use crate::types::{AccessorId, EdgeId, ExecResult, Quantum, StreamId};
use vertex::{Edge, Vertex};

#[derive(Default)]
pub struct StreamGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    accessors: Vec<BufferAccessor>,
    params: DynamicParams,
    prepared: bool,
}

impl std::fmt::Debug for StreamGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGraph")
            .field("streams", &self.stream_count())
            .field("edges", &self.edges.len())
            .field("prepared", &self.prepared)
            .finish()
    }
}

impl StreamGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- building ----

    /// Register a stream under a unique name.
    pub fn add_stream(&mut self, name: impl Into<String>, stream: Box<dyn ExecStream>) -> StreamId {
        let name = name.into();
        self.assert_mutable();
        assert!(
            self.find_stream(&name).is_none(),
            "stream name '{name}' is already registered"
        );
        let id = StreamId(self.vertices.len());
        debug!(stream = %name, %id, "added stream");
        self.vertices.push(Vertex::new(name, Some(stream)));
        id
    }

    /// Connect `producer`'s next output to `consumer`'s next input.
    pub fn add_dataflow(&mut self, producer: StreamId, consumer: StreamId, capacity: usize) -> EdgeId {
        self.assert_mutable();
        assert!(
            !self.vertex(producer).is_sink() && !self.vertex(consumer).is_sink(),
            "dataflow endpoints must be streams"
        );
        assert_ne!(producer, consumer, "stream {producer} cannot feed itself");
        self.connect(producer, consumer, capacity)
    }

    /// Make `producer` a graph output read by an external caller.
    pub fn add_output_dataflow(&mut self, producer: StreamId, capacity: usize) -> EdgeId {
        self.assert_mutable();
        assert!(!self.vertex(producer).is_sink(), "sink sentinels have no outputs");
        let sink = StreamId(self.vertices.len());
        let name = format!("{}.sink", self.vertex(producer).name);
        self.vertices.push(Vertex::new(name, None));
        self.connect(producer, sink, capacity)
    }

    fn connect(&mut self, source: StreamId, target: StreamId, capacity: usize) -> EdgeId {
        let edge = EdgeId(self.edges.len());
        let accessor = AccessorId(self.accessors.len());
        self.accessors.push(BufferAccessor::new(capacity));
        self.edges.push(Edge {
            source,
            target,
            accessor,
        });
        let src = &mut self.vertices[source.0];
        src.out_edges.push(edge);
        src.outputs.push(accessor);
        let dst = &mut self.vertices[target.0];
        dst.in_edges.push(edge);
        dst.inputs.push(accessor);
        trace!(%source, %target, capacity, "added dataflow");
        edge
    }

    fn assert_mutable(&self) {
        assert!(!self.prepared, "graph topology cannot change after prepare");
    }

    // ---- queries ----

    fn vertex(&self, id: StreamId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn in_edges(&self, id: StreamId) -> &[EdgeId] {
        &self.vertex(id).in_edges
    }

    pub fn out_edges(&self, id: StreamId) -> &[EdgeId] {
        &self.vertex(id).out_edges
    }

    pub fn edge_source(&self, edge: EdgeId) -> StreamId {
        self.edges[edge.0].source
    }

    pub fn edge_target(&self, edge: EdgeId) -> StreamId {
        self.edges[edge.0].target
    }

    pub fn is_sink(&self, id: StreamId) -> bool {
        self.vertex(id).is_sink()
    }

    pub fn stream_name(&self, id: StreamId) -> &str {
        &self.vertex(id).name
    }

    pub fn find_stream(&self, name: &str) -> Option<StreamId> {
        self.vertices
            .iter()
            .position(|v| !v.is_sink() && v.name == name)
            .map(StreamId)
    }

    pub fn accessor_for_edge(&self, edge: EdgeId) -> &BufferAccessor {
        &self.accessors[self.edges[edge.0].accessor.0]
    }

    pub fn accessor_for_edge_mut(&mut self, edge: EdgeId) -> &mut BufferAccessor {
        &mut self.accessors[self.edges[edge.0].accessor.0]
    }

    /// Stream vertices (sinks excluded), in registration order.
    pub fn streams(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_sink())
            .map(|(i, _)| StreamId(i))
    }

    pub fn stream_count(&self) -> usize {
        self.vertices.iter().filter(|v| !v.is_sink()).count()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    /// Streams feeding a sink sentinel.
    pub fn output_streams(&self) -> Vec<StreamId> {
        self.edges
            .iter()
            .filter(|e| self.is_sink(e.target))
            .map(|e| e.source)
            .collect()
    }

    pub fn stream_state(&self, id: StreamId) -> StreamState {
        self.vertex(id).state
    }

    pub fn stream_row_count(&self, id: StreamId) -> u64 {
        self.vertex(id)
            .stream
            .as_ref()
            .map(|s| s.row_count())
            .unwrap_or(0)
    }

    pub fn dynamic_params(&self) -> &DynamicParams {
        &self.params
    }

    pub fn dynamic_params_mut(&mut self) -> &mut DynamicParams {
        &mut self.params
    }

    fn petgraph(&self) -> DiGraphMap<usize, ()> {
        let mut graph = DiGraphMap::new();
        for i in 0..self.vertices.len() {
            graph.add_node(i);
        }
        for edge in &self.edges {
            graph.add_edge(edge.source.0, edge.target.0, ());
        }
        graph
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.petgraph())
    }

    /// Streams ordered so that every producer precedes its consumers.
    pub fn topological_order(&self) -> Result<Vec<StreamId>> {
        match toposort(&self.petgraph(), None) {
            Ok(order) => Ok(order
                .into_iter()
                .map(StreamId)
                .filter(|&id| !self.is_sink(id))
                .collect()),
            Err(cycle) => Err(ExecStreamError::GraphCycle(format!(
                "cycle detected in stream graph involving stream '{}'",
                self.stream_name(StreamId(cycle.node_id()))
            ))),
        }
    }

    // ---- lifecycle ----

    /// Split borrow of one stream, its state and its I/O view.
    fn stream_parts(
        &mut self,
        id: StreamId,
    ) -> (&mut Box<dyn ExecStream>, &mut StreamState, StreamIo<'_>) {
        let Self {
            vertices,
            accessors,
            params,
            ..
        } = self;
        let Vertex {
            name,
            stream,
            state,
            inputs,
            outputs,
            ..
        } = &mut vertices[id.0];
        let Some(stream) = stream.as_mut() else {
            panic!("vertex {id} is a sink sentinel, not a stream");
        };
        let io = StreamIo::new(name, id, inputs, outputs, accessors, params);
        (stream, state, io)
    }

    /// Prepare every stream, producers before consumers.
    ///
    /// The topology is frozen only once every stream has prepared. On failure
    /// the streams prepared so far go back to `Unprepared`, so the graph can
    /// be corrected and prepared again.
    pub fn prepare(&mut self) -> Result<()> {
        let order = self.topological_order()?;
        for (done, &id) in order.iter().enumerate() {
            if let Err(err) = self.prepare_stream(id) {
                for &prepared in &order[..done] {
                    self.vertices[prepared.0].state = StreamState::Unprepared;
                }
                return Err(err);
            }
        }
        self.prepared = true;
        info!(streams = self.stream_count(), edges = self.edges.len(), "graph prepared");
        Ok(())
    }

    fn prepare_stream(&mut self, id: StreamId) -> Result<()> {
        let (stream, state, mut io) = self.stream_parts(id);
        assert_eq!(
            *state,
            StreamState::Unprepared,
            "stream '{}' prepared twice",
            io.name()
        );
        let provision = stream.output_provision();
        for o in 0..io.output_count() {
            io.output_mut(o).set_provision(provision);
        }
        stream.prepare(&mut io)?;
        *state = StreamState::Prepared;
        debug!(stream = %io.name(), "prepared");
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Open every stream with all buffers cleared.
    pub fn open(&mut self) -> Result<()> {
        for accessor in &mut self.accessors {
            accessor.clear();
        }
        for id in self.topological_order()? {
            self.open_stream(id, false)?;
        }
        info!("graph opened");
        Ok(())
    }

    /// Open a single stream.
    ///
    /// With `restart`, the stream must already be open: its outputs are
    /// cleared, it is reopened in restart mode, and the restart propagates
    /// upstream through every input, clearing each input buffer on the way.
    pub fn open_stream(&mut self, id: StreamId, restart: bool) -> Result<()> {
        if !restart {
            let (stream, state, mut io) = self.stream_parts(id);
            assert!(
                matches!(*state, StreamState::Prepared | StreamState::Closed),
                "stream '{}' cannot be opened from {:?}",
                io.name(),
                *state
            );
            for o in 0..io.output_count() {
                io.output_mut(o).clear();
            }
            stream.open(&mut io, false)?;
            *state = StreamState::Open;
            trace!(stream = %io.name(), "opened");
            return Ok(());
        }

        let mut pending = vec![id];
        let mut restarted = HashSet::new();
        while let Some(current) = pending.pop() {
            if !restarted.insert(current) {
                continue;
            }
            let (stream, state, mut io) = self.stream_parts(current);
            assert_eq!(
                *state,
                StreamState::Open,
                "stream '{}' must be open to restart",
                io.name()
            );
            for o in 0..io.output_count() {
                io.output_mut(o).clear();
            }
            stream.open(&mut io, true)?;
            for i in 0..io.input_count() {
                io.input_mut(i).clear();
            }
            debug!(stream = %io.name(), "restarted");
            pending.extend(self.in_edges(current).iter().map(|&e| self.edges[e.0].source));
        }
        Ok(())
    }

    /// Close every stream. Always succeeds, whatever state streams are in.
    pub fn close(&mut self) {
        for vertex in &mut self.vertices {
            if let Some(stream) = vertex.stream.as_mut() {
                stream.close();
                if vertex.state != StreamState::Unprepared {
                    vertex.state = StreamState::Closed;
                }
            }
        }
        info!("graph closed");
    }

    /// Run one bounded invocation of an open stream.
    pub fn execute_stream(&mut self, id: StreamId, quantum: &Quantum) -> Result<ExecResult> {
        let (stream, state, mut io) = self.stream_parts(id);
        assert_eq!(
            *state,
            StreamState::Open,
            "stream '{}' executed while not open",
            io.name()
        );
        let rc = stream.execute(&mut io, quantum)?;
        trace!(stream = %io.name(), result = ?rc, "executed");
        Ok(rc)
    }
}
