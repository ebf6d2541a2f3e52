// src/scheduler/mod.rs

//! Scheduling of stream graphs.
//!
//! - [`ExecStreamScheduler`] is the interface a caller drives.
//! - [`dfs`] implements it with a demand-pull depth-first traversal.
//! - [`abort`] provides the cooperative abort flag.

pub mod abort;
pub mod dfs;

pub use abort::AbortHandle;
pub use dfs::DfsScheduler;

use crate::buffer::BufferAccessor;
use crate::errors::Result;
use crate::graph::StreamGraph;
use crate::types::StreamId;

pub trait ExecStreamScheduler {
    /// Attach a graph. Only one graph may be attached at a time.
    fn add_graph(&mut self, graph: StreamGraph);

    /// Detach and return the attached graph.
    fn remove_graph(&mut self) -> StreamGraph;

    fn graph(&self) -> &StreamGraph;

    fn graph_mut(&mut self) -> &mut StreamGraph;

    fn start(&mut self);

    fn stop(&mut self);

    /// Request a cooperative abort of the current `read_stream`.
    fn abort(&self);

    fn abort_handle(&self) -> AbortHandle;

    /// Not supported by demand-pull policies; every run decision flows
    /// through `read_stream`.
    fn set_runnable(&mut self, stream: StreamId, runnable: bool);

    /// Reopen `stream` in restart mode, together with everything upstream.
    fn restart_stream(&mut self, stream: StreamId) -> Result<()>;

    /// Drive the graph until the output buffer of `stream` is ready to be
    /// read, and return it.
    fn read_stream(&mut self, stream: StreamId) -> Result<&mut BufferAccessor>;

    /// The graph output whose buffer the last successful `read_stream`
    /// returned. In graphs with several outputs this can differ from the
    /// requested one: the traversal hands back the first sink edge it reaches.
    fn last_delivered(&self) -> Option<StreamId>;
}
