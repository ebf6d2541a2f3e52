// src/operators/bitmap_splicer.rs

//! Writes sorted bitmap entries into a shared [`BitmapIndex`].
//!
//! [`BitmapIndex`]: crate::operators::bitmap::BitmapIndex

use tracing::debug;

use crate::errors::{ExecStreamError, Result};
use crate::operators::bitmap::{BitmapEntry, SharedBitmapIndex};
use crate::operators::storage::lock;
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::{Datum, TupleDescriptor};
use crate::types::{ExecResult, Quantum};

/// Adjacent entries for the same `(keys, segment)` are combined before they
/// reach the index. Emits `(entries_spliced)` at EOS.
#[derive(Debug)]
pub struct BitmapSplicerStream {
    index: SharedBitmapIndex,
    output: SingleOutput,
    pending: Option<BitmapEntry>,
    spliced: u64,
}

impl BitmapSplicerStream {
    pub fn new(index: SharedBitmapIndex) -> Self {
        Self {
            index,
            output: SingleOutput::default(),
            pending: None,
            spliced: 0,
        }
    }
}

impl ExecStream for BitmapSplicerStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        let expected = lock(&self.index, io.name())?.entry_desc().len();
        match io.input(0).tuple_desc() {
            Some(desc) if desc.len() == expected => {}
            Some(desc) => {
                return Err(ExecStreamError::prepare(
                    io.name(),
                    format!("input has {} columns, index entries have {expected}", desc.len()),
                ));
            }
            None => {
                return Err(ExecStreamError::prepare(io.name(), "input has no tuple descriptor"));
            }
        }
        self.output.prepare(io, TupleDescriptor::int64s(1))
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.pending = None;
        self.spliced = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        if self.output.is_output_eos(io) {
            return Ok(ExecResult::EndOfStream);
        }

        let name = io.name().to_string();
        let mut consumed = 0u32;
        {
            let mut index = lock(&self.index, &name)?;
            let input = io.input_mut(0);
            while consumed < quantum.n_tuples_max {
                let Some(tuple) = input.consume_tuple() else {
                    break;
                };
                let entry = BitmapEntry::from_tuple(tuple).ok_or_else(|| {
                    ExecStreamError::operator(&name, "malformed bitmap entry")
                })?;
                consumed += 1;
                match self.pending.as_mut() {
                    Some(p) if p.keys == entry.keys && p.start_rid == entry.start_rid => {
                        p.merge_bits(&entry.bits);
                    }
                    Some(p) => {
                        index.splice(std::mem::replace(p, entry));
                        self.spliced += 1;
                    }
                    None => self.pending = Some(entry),
                }
            }
            if input.is_eos() && !input.is_consumption_possible() {
                if let Some(done) = self.pending.take() {
                    index.splice(done);
                    self.spliced += 1;
                }
            }
        }

        if io.input(0).is_consumption_possible() {
            return Ok(ExecResult::QuantumExpired);
        }
        if !io.input(0).is_eos() {
            io.input_mut(0).request_production();
            return Ok(ExecResult::BufferUnderflow);
        }

        if !self.output.produce(io, vec![Datum::Int(self.spliced as i64)]) {
            return self.output.overflow(io);
        }
        debug!(stream = %name, entries = self.spliced, "splice finished");
        Ok(self.output.finish(io))
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
