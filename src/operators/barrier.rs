// src/operators/barrier.rs

//! Fan-in synchronisation point.

use serde::Deserialize;
use tracing::debug;

use crate::errors::{ExecStreamError, Result};
use crate::stream::{Confluence, ExecStream, SingleOutput, StreamIo};
use crate::tuple::Tuple;
use crate::types::{ExecResult, Quantum};

/// Which input tuples a barrier passes on once all inputs are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierMode {
    #[default]
    FirstInput,
    AllInputs,
}

#[derive(Debug, Clone, Default)]
pub struct BarrierParams {
    pub mode: BarrierMode,
    /// Require the leading integer of every input's first tuple to agree.
    pub check_row_counts: bool,
}

/// Drains its inputs in order until all reach EOS, then emits.
#[derive(Debug)]
pub struct BarrierStream {
    params: BarrierParams,
    output: SingleOutput,
    current_input: usize,
    collected: Vec<Tuple>,
    leading_counts: Vec<Option<i64>>,
    emitted: usize,
}

impl BarrierStream {
    pub fn new(params: BarrierParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            current_input: 0,
            collected: Vec::new(),
            leading_counts: Vec::new(),
            emitted: 0,
        }
    }

    fn check_counts(&self, io: &StreamIo<'_>) -> Result<()> {
        let mut counts = self.leading_counts.iter().enumerate();
        let Some((_, first)) = counts.next() else {
            return Ok(());
        };
        for (i, count) in counts {
            if count != first {
                return Err(ExecStreamError::operator(
                    io.name(),
                    format!("input {i} reported row count {count:?}, input 0 reported {first:?}"),
                ));
            }
        }
        Ok(())
    }
}

impl ExecStream for BarrierStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        let descs = Confluence::prepare_inputs(io, self.input_provision())?;
        let desc = match self.params.mode {
            BarrierMode::FirstInput => descs[0].clone(),
            BarrierMode::AllInputs => Confluence::common_desc(io, &descs)?,
        };
        self.output.prepare(io, desc)
    }

    fn open(&mut self, io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.current_input = 0;
        self.collected.clear();
        self.leading_counts = vec![None; io.input_count()];
        self.emitted = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        while self.current_input < io.input_count() {
            let i = self.current_input;
            let keep = i == 0 || self.params.mode == BarrierMode::AllInputs;
            let input = io.input_mut(i);
            while let Some(tuple) = input.consume_tuple() {
                if self.leading_counts[i].is_none() {
                    self.leading_counts[i] = Some(tuple.first().and_then(|d| d.as_int()).unwrap_or(0));
                }
                if keep {
                    self.collected.push(tuple);
                }
            }
            if !input.is_eos() {
                input.request_production();
                return Ok(ExecResult::BufferUnderflow);
            }
            debug!(stream = %io.name(), input = i, "barrier input finished");
            self.current_input += 1;
            if self.current_input == io.input_count() && self.params.check_row_counts {
                self.check_counts(io)?;
            }
        }

        let mut produced_now = 0u32;
        while self.emitted < self.collected.len() {
            if produced_now == quantum.n_tuples_max {
                io.output_mut(0).request_consumption();
                return Ok(ExecResult::QuantumExpired);
            }
            if !self.output.produce(io, self.collected[self.emitted].clone()) {
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
