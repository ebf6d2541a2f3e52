// src/stream/single_output.rs

//! Shared bookkeeping for streams with exactly one output.

use crate::errors::{ExecStreamError, Result};
use crate::stream::StreamIo;
use crate::tuple::{Tuple, TupleDescriptor};
use crate::types::ExecResult;

/// Output-side state embedded in every single-output operator.
#[derive(Debug, Default, Clone)]
pub struct SingleOutput {
    desc: Option<TupleDescriptor>,
    rows: u64,
}

impl SingleOutput {
    /// Check there is exactly one output and publish its tuple shape.
    pub fn prepare(&mut self, io: &mut StreamIo<'_>, desc: TupleDescriptor) -> Result<()> {
        if io.output_count() != 1 {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!("expected exactly one output, found {}", io.output_count()),
            ));
        }
        io.output_mut(0).set_tuple_desc(desc.clone());
        self.desc = Some(desc);
        Ok(())
    }

    pub fn open(&mut self) {
        self.rows = 0;
    }

    pub fn desc(&self) -> Option<&TupleDescriptor> {
        self.desc.as_ref()
    }

    pub fn row_count(&self) -> u64 {
        self.rows
    }

    /// Try to append one tuple to the output. Returns `false` when full.
    pub fn produce(&mut self, io: &mut StreamIo<'_>, tuple: Tuple) -> bool {
        let ok = io.output_mut(0).produce_tuple(tuple);
        if ok {
            self.rows += 1;
        }
        ok
    }

    /// Count rows written through a bulk path.
    pub fn add_rows(&mut self, n: u64) {
        self.rows += n;
    }

    /// Hand the filled output to the consumer.
    ///
    /// Fails when nothing is queued: the next tuple is larger than the whole
    /// buffer and no amount of draining will make room for it.
    pub fn overflow(&self, io: &mut StreamIo<'_>) -> Result<ExecResult> {
        if !io.output(0).is_consumption_possible() {
            return Err(ExecStreamError::operator(
                io.name(),
                format!(
                    "next tuple does not fit in an empty {}-byte output buffer",
                    io.output(0).capacity()
                ),
            ));
        }
        io.output_mut(0).request_consumption();
        Ok(ExecResult::BufferOverflow)
    }

    /// Mark the output EOS and report it.
    pub fn finish(&self, io: &mut StreamIo<'_>) -> ExecResult {
        io.output_mut(0).mark_eos();
        ExecResult::EndOfStream
    }

    pub fn is_output_eos(&self, io: &StreamIo<'_>) -> bool {
        io.output(0).is_eos()
    }
}
