// src/operators/sort.rs

//! In-memory sort: accumulate the whole input, then emit in key order.

use std::cmp::Ordering;

use tracing::debug;

use crate::errors::{ExecStreamError, Result};
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::Tuple;
use crate::types::{ExecResult, Quantum, SortOrder};

#[derive(Debug, Clone, Default)]
pub struct SortParams {
    /// Input columns forming the sort key, most significant first.
    pub keys: Vec<usize>,
    /// One direction per key column. Missing entries sort ascending.
    pub orders: Vec<SortOrder>,
    /// Keep only the first tuple of every run of equal keys.
    pub discard_duplicates: bool,
}

impl SortParams {
    pub fn ascending(keys: Vec<usize>) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct SortStream {
    params: SortParams,
    output: SingleOutput,
    rows: Vec<Tuple>,
    sorted: bool,
    emitted: usize,
}

impl SortStream {
    pub fn new(params: SortParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            rows: Vec::new(),
            sorted: false,
            emitted: 0,
        }
    }

    fn compare(&self, a: &Tuple, b: &Tuple) -> Ordering {
        for (k, &col) in self.params.keys.iter().enumerate() {
            let ord = a[col].cmp(&b[col]);
            let ord = match self.params.orders.get(k).copied().unwrap_or_default() {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn sort_rows(&mut self) {
        let mut rows = std::mem::take(&mut self.rows);
        rows.sort_by(|a, b| self.compare(a, b));
        if self.params.discard_duplicates {
            rows.dedup_by(|a, b| self.compare(a, b) == Ordering::Equal);
        }
        self.rows = rows;
        self.sorted = true;
    }
}

impl ExecStream for SortStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        if io.input_count() != 1 {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!("sort needs exactly one input, found {}", io.input_count()),
            ));
        }
        let desc = io
            .input(0)
            .tuple_desc()
            .cloned()
            .ok_or_else(|| ExecStreamError::prepare(io.name(), "input has no tuple descriptor"))?;
        if self.params.keys.is_empty() || desc.project(&self.params.keys).is_none() {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!(
                    "sort keys {:?} do not fit a {}-column input",
                    self.params.keys,
                    desc.len()
                ),
            ));
        }
        if self.params.orders.len() > self.params.keys.len() {
            return Err(ExecStreamError::prepare(
                io.name(),
                "more sort directions than key columns",
            ));
        }
        self.output.prepare(io, desc)
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.rows.clear();
        self.sorted = false;
        self.emitted = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        if !self.sorted {
            let input = io.input_mut(0);
            self.rows.extend(input.consume_all());
            if !input.is_eos() {
                input.request_production();
                return Ok(ExecResult::BufferUnderflow);
            }
            self.sort_rows();
            debug!(stream = %io.name(), rows = self.rows.len(), "sorted input");
        }

        let mut produced_now = 0u32;
        while self.emitted < self.rows.len() {
            if produced_now == quantum.n_tuples_max {
                io.output_mut(0).request_consumption();
                return Ok(ExecResult::QuantumExpired);
            }
            if !self.output.produce(io, self.rows[self.emitted].clone()) {
                return self.output.overflow(io);
            }
            self.emitted += 1;
            produced_now += 1;
        }
        Ok(self.output.finish(io))
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
