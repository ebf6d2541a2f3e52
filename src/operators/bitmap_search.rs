// src/operators/bitmap_search.rs

//! Equality search over a [`BitmapIndex`].
//!
//! [`BitmapIndex`]: crate::operators::bitmap::BitmapIndex

use std::collections::VecDeque;

use tracing::trace;

use crate::errors::{ExecStreamError, Result};
use crate::graph::DynamicParamId;
use crate::operators::bitmap::SharedBitmapIndex;
use crate::operators::storage::lock;
use crate::stream::conduit::{input_drained, precheck_conduit};
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::Tuple;
use crate::types::{ExecResult, Quantum};

#[derive(Debug, Clone)]
pub struct BitmapSearchParams {
    pub index: SharedBitmapIndex,
    /// Dynamic parameter supplying key field `i` when the input carries NULL
    /// there.
    pub key_params: Vec<Option<DynamicParamId>>,
}

/// For every input key tuple (a prefix of the index keys), emits the
/// matching entries in key order.
#[derive(Debug)]
pub struct BitmapSearchStream {
    params: BitmapSearchParams,
    output: SingleOutput,
    pending: VecDeque<Tuple>,
}

impl BitmapSearchStream {
    pub fn new(params: BitmapSearchParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            pending: VecDeque::new(),
        }
    }

    fn resolve_keys(&self, io: &StreamIo<'_>, mut keys: Tuple) -> Result<Tuple> {
        for (i, key) in keys.iter_mut().enumerate() {
            if !key.is_null() {
                continue;
            }
            if let Some(Some(id)) = self.params.key_params.get(i) {
                *key = io.params().get(*id)?.clone();
            }
        }
        Ok(keys)
    }

    fn lookup(&mut self, io: &StreamIo<'_>, keys: Tuple) -> Result<()> {
        let keys = self.resolve_keys(io, keys)?;
        let index = lock(&self.params.index, io.name())?;
        let found = index.search(&keys);
        trace!(stream = %io.name(), ?keys, matches = found.len(), "bitmap search");
        self.pending.extend(found.iter().map(|e| e.to_tuple()));
        Ok(())
    }
}

impl ExecStream for BitmapSearchStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        let (key_count, entry_desc) = {
            let index = lock(&self.params.index, io.name())?;
            (index.key_count(), index.entry_desc())
        };
        let input_cols = io
            .input(0)
            .tuple_desc()
            .map(|d| d.len())
            .ok_or_else(|| ExecStreamError::prepare(io.name(), "input has no tuple descriptor"))?;
        if input_cols > key_count {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!("search keys have {input_cols} columns, index has {key_count}"),
            ));
        }
        self.output.prepare(io, entry_desc)
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.pending.clear();
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        let mut produced_now = 0u32;
        loop {
            if let Some(entry) = self.pending.front() {
                if produced_now == quantum.n_tuples_max {
                    io.output_mut(0).request_consumption();
                    return Ok(ExecResult::QuantumExpired);
                }
                if !self.output.produce(io, entry.clone()) {
                    return self.output.overflow(io);
                }
                self.pending.pop_front();
                produced_now += 1;
                continue;
            }

            let (input, output) = io.conduit_mut(0, 0);
            if produced_now == 0 {
                if let Some(rc) = precheck_conduit(input, output) {
                    return Ok(rc);
                }
            }
            let Some(keys) = input.consume_tuple() else {
                return Ok(input_drained(input, output));
            };
            self.lookup(io, keys)?;
        }
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
