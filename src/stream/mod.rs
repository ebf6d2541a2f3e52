// src/stream/mod.rs

//! The operator contract.
//!
//! - [`ExecStream`] is the one trait every operator implements.
//! - [`StreamIo`] is the borrowed view of a stream's input/output accessors
//!   and the graph's dynamic parameters, handed to every lifecycle call.
//! - [`single_output`], [`conduit`] and [`confluence`] hold the shared
//!   behaviour of the common operator shapes.

pub mod conduit;
pub mod confluence;
pub mod single_output;

pub use conduit::precheck_conduit;
pub use confluence::Confluence;
pub use single_output::SingleOutput;

use crate::buffer::BufferAccessor;
use crate::errors::Result;
use crate::graph::DynamicParams;
use crate::types::{AccessorId, BufProvision, ExecResult, Quantum, StreamId};

/// A unit of streaming computation driven by the scheduler.
///
/// Lifecycle: `prepare` once, then `open`/`execute*`/`close`, where a closed
/// stream may be opened again. Static parameters are supplied when the
/// operator is constructed and validated in `prepare`.
pub trait ExecStream: Send {
    /// Validate the static configuration against the bound accessors and
    /// publish output tuple descriptors.
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()>;

    /// Enter the open state. With `restart`, per-run state is reset.
    ///
    /// Buffers are cleared and upstream producers restarted by the graph, not
    /// by the operator.
    fn open(&mut self, io: &mut StreamIo<'_>, restart: bool) -> Result<()>;

    /// Do a bounded amount of work. Must not block.
    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult>;

    fn close(&mut self) {}

    /// Rows emitted since the last open.
    fn row_count(&self) -> u64 {
        0
    }

    fn output_provision(&self) -> BufProvision {
        BufProvision::Producer
    }

    /// Provision this stream expects on all of its inputs.
    fn input_provision(&self) -> BufProvision {
        BufProvision::Producer
    }
}

/// Borrowed per-call view of one stream's accessors.
pub struct StreamIo<'a> {
    name: &'a str,
    id: StreamId,
    inputs: &'a [AccessorId],
    outputs: &'a [AccessorId],
    accessors: &'a mut [BufferAccessor],
    params: &'a mut DynamicParams,
}

impl<'a> StreamIo<'a> {
    pub(crate) fn new(
        name: &'a str,
        id: StreamId,
        inputs: &'a [AccessorId],
        outputs: &'a [AccessorId],
        accessors: &'a mut [BufferAccessor],
        params: &'a mut DynamicParams,
    ) -> Self {
        Self {
            name,
            id,
            inputs,
            outputs,
            accessors,
            params,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, i: usize) -> &BufferAccessor {
        &self.accessors[self.inputs[i].0]
    }

    pub fn input_mut(&mut self, i: usize) -> &mut BufferAccessor {
        &mut self.accessors[self.inputs[i].0]
    }

    pub fn output(&self, i: usize) -> &BufferAccessor {
        &self.accessors[self.outputs[i].0]
    }

    pub fn output_mut(&mut self, i: usize) -> &mut BufferAccessor {
        &mut self.accessors[self.outputs[i].0]
    }

    /// Mutable access to input `i` and output `o` at the same time.
    pub fn conduit_mut(
        &mut self,
        i: usize,
        o: usize,
    ) -> (&mut BufferAccessor, &mut BufferAccessor) {
        let a = self.inputs[i].0;
        let b = self.outputs[o].0;
        assert_ne!(a, b, "input and output share accessor {a}");
        if a < b {
            let (lo, hi) = self.accessors.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.accessors.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    pub fn params(&self) -> &DynamicParams {
        &*self.params
    }

    pub fn params_mut(&mut self) -> &mut DynamicParams {
        &mut *self.params
    }
}
