// src/operators/values.rs

use crate::errors::{ExecStreamError, Result};
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::{Tuple, TupleDescriptor};
use crate::types::{ExecResult, Quantum};

/// Emits a fixed list of tuples, then EOS.
#[derive(Debug)]
pub struct ValuesStream {
    desc: TupleDescriptor,
    rows: Vec<Tuple>,
    output: SingleOutput,
    next: usize,
}

impl ValuesStream {
    pub fn new(desc: TupleDescriptor, rows: Vec<Tuple>) -> Self {
        Self {
            desc,
            rows,
            output: SingleOutput::default(),
            next: 0,
        }
    }
}

impl ExecStream for ValuesStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        if let Some(i) = self.rows.iter().position(|r| r.len() != self.desc.len()) {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!(
                    "row {i} has {} values, expected {}",
                    self.rows[i].len(),
                    self.desc.len()
                ),
            ));
        }
        self.output.prepare(io, self.desc.clone())
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.next = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        let mut produced_now = 0u32;
        while self.next < self.rows.len() {
            if produced_now == quantum.n_tuples_max {
                io.output_mut(0).request_consumption();
                return Ok(ExecResult::QuantumExpired);
            }
            if !self.output.produce(io, self.rows[self.next].clone()) {
                return self.output.overflow(io);
            }
            self.next += 1;
            produced_now += 1;
        }
        Ok(self.output.finish(io))
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
