// src/operators/cluster_append.rs

//! Loads projected input columns into one cluster of a [`ColumnStore`].
//!
//! [`ColumnStore`]: crate::operators::storage::ColumnStore

use tracing::debug;

use crate::errors::{ExecStreamError, Result};
use crate::operators::storage::{SharedColumnStore, lock};
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::{Datum, TupleDescriptor};
use crate::types::{ExecResult, Quantum};

#[derive(Debug, Clone)]
pub struct ClusterAppendParams {
    pub store: SharedColumnStore,
    pub cluster: usize,
    /// Input columns stored in the cluster, in cluster column order.
    pub columns: Vec<usize>,
}

/// Emits a single `(rows_inserted, start_rid)` tuple once its input is
/// exhausted.
#[derive(Debug)]
pub struct ClusterAppendStream {
    params: ClusterAppendParams,
    output: SingleOutput,
    inserted: u64,
    start_rid: Option<u64>,
}

impl ClusterAppendStream {
    pub fn new(params: ClusterAppendParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            inserted: 0,
            start_rid: None,
        }
    }
}

impl ExecStream for ClusterAppendStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        if io.input_count() != 1 {
            return Err(ExecStreamError::prepare(io.name(), "cluster append needs one input"));
        }
        let input_desc = io
            .input(0)
            .tuple_desc()
            .cloned()
            .ok_or_else(|| ExecStreamError::prepare(io.name(), "input has no tuple descriptor"))?;
        let projected = input_desc.project(&self.params.columns).ok_or_else(|| {
            ExecStreamError::prepare(
                io.name(),
                format!("columns {:?} are out of range", self.params.columns),
            )
        })?;
        {
            let store = lock(&self.params.store, io.name())?;
            match store.cluster_desc(self.params.cluster) {
                None => {
                    return Err(ExecStreamError::prepare(
                        io.name(),
                        format!("cluster {} does not exist", self.params.cluster),
                    ));
                }
                Some(desc) if desc.len() != projected.len() => {
                    return Err(ExecStreamError::prepare(
                        io.name(),
                        format!(
                            "cluster {} has {} columns, {} projected",
                            self.params.cluster,
                            desc.len(),
                            projected.len()
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        self.output.prepare(io, TupleDescriptor::int64s(2))
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.inserted = 0;
        self.start_rid = None;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        if self.output.is_output_eos(io) {
            return Ok(ExecResult::EndOfStream);
        }

        let name = io.name().to_string();
        let mut loaded = 0u32;
        {
            let mut store = lock(&self.params.store, &name)?;
            let input = io.input_mut(0);
            while loaded < quantum.n_tuples_max {
                let Some(tuple) = input.consume_tuple() else {
                    break;
                };
                let row = self.params.columns.iter().map(|&c| tuple[c].clone()).collect();
                let rid = store.append(self.params.cluster, row);
                self.start_rid.get_or_insert(rid);
                self.inserted += 1;
                loaded += 1;
            }
            if self.start_rid.is_none() {
                self.start_rid = Some(store.cluster_len(self.params.cluster) as u64);
            }
        }

        if io.input(0).is_consumption_possible() {
            return Ok(ExecResult::QuantumExpired);
        }
        if !io.input(0).is_eos() {
            io.input_mut(0).request_production();
            return Ok(ExecResult::BufferUnderflow);
        }

        let summary = vec![
            Datum::Int(self.inserted as i64),
            Datum::Int(self.start_rid.unwrap_or(0) as i64),
        ];
        if !self.output.produce(io, summary) {
            return self.output.overflow(io);
        }
        debug!(
            stream = %name,
            cluster = self.params.cluster,
            rows = self.inserted,
            "cluster append finished"
        );
        Ok(self.output.finish(io))
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
