// src/operators/bitmap_generator.rs

//! Turns freshly loaded rows into single-rid bitmap entries.

use crate::errors::{ExecStreamError, Result};
use crate::operators::bitmap::BitmapEntry;
use crate::operators::storage::{SharedColumnStore, lock};
use crate::stream::conduit::{input_drained, precheck_conduit};
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::{AttributeDescriptor, DataType, TupleDescriptor};
use crate::types::{ExecResult, Quantum};

#[derive(Debug, Clone)]
pub struct BitmapGeneratorParams {
    pub store: SharedColumnStore,
    /// `(cluster, column)` of every index key, most significant first.
    pub keys: Vec<(usize, usize)>,
}

/// Reads `(row_count, start_rid)` tuples and emits one
/// `(keys..., segment_start, bitmap)` entry per loaded rid.
#[derive(Debug)]
pub struct BitmapGeneratorStream {
    params: BitmapGeneratorParams,
    output: SingleOutput,
    next_rid: u64,
    end_rid: u64,
}

impl BitmapGeneratorStream {
    pub fn new(params: BitmapGeneratorParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            next_rid: 0,
            end_rid: 0,
        }
    }
}

impl ExecStream for BitmapGeneratorStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        let input_cols = io
            .input(0)
            .tuple_desc()
            .map(|d| d.len())
            .ok_or_else(|| ExecStreamError::prepare(io.name(), "input has no tuple descriptor"))?;
        if input_cols < 2 {
            return Err(ExecStreamError::prepare(
                io.name(),
                "input must carry (row_count, start_rid)",
            ));
        }
        let mut desc = TupleDescriptor::default();
        {
            let store = lock(&self.params.store, io.name())?;
            for &(cluster, column) in &self.params.keys {
                let attr = store
                    .cluster_desc(cluster)
                    .and_then(|d| d.attr(column))
                    .copied()
                    .ok_or_else(|| {
                        ExecStreamError::prepare(
                            io.name(),
                            format!("key column {column} of cluster {cluster} does not exist"),
                        )
                    })?;
                desc.push(attr);
            }
        }
        desc.push(AttributeDescriptor::int64());
        desc.push(AttributeDescriptor::new(DataType::Varbinary, false));
        self.output.prepare(io, desc)
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.next_rid = 0;
        self.end_rid = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        let name = io.name().to_string();
        let mut produced_now = 0u32;
        loop {
            if self.next_rid == self.end_rid {
                let (input, output) = io.conduit_mut(0, 0);
                if produced_now == 0 {
                    if let Some(rc) = precheck_conduit(input, output) {
                        return Ok(rc);
                    }
                }
                let Some(range) = input.consume_tuple() else {
                    return Ok(input_drained(input, output));
                };
                let (Some(count), Some(start)) = (
                    range.first().and_then(|d| d.as_int()),
                    range.get(1).and_then(|d| d.as_int()),
                ) else {
                    return Err(ExecStreamError::operator(
                        &name,
                        format!("malformed load summary {range:?}"),
                    ));
                };
                self.next_rid = start as u64;
                self.end_rid = (start + count) as u64;
                continue;
            }

            if produced_now == quantum.n_tuples_max {
                io.output_mut(0).request_consumption();
                return Ok(ExecResult::QuantumExpired);
            }

            let rid = self.next_rid;
            let keys = {
                let store = lock(&self.params.store, &name)?;
                self.params
                    .keys
                    .iter()
                    .map(|&(cluster, column)| store.value(cluster, rid, column).cloned())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        ExecStreamError::operator(&name, format!("rid {rid} is not loaded"))
                    })?
            };
            let entry = BitmapEntry::singleton(keys, rid);
            if !self.output.produce(io, entry.to_tuple()) {
                return self.output.overflow(io);
            }
            self.next_rid += 1;
            produced_now += 1;
        }
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
