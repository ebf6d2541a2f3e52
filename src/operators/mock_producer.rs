// src/operators/mock_producer.rs

//! Producer of synthetic rows.
//!
//! With a [`RowGenerator`] every value is computed tuple by tuple and the
//! quantum is honoured. Without one the stream runs in lean mode: rows are
//! all zero and the output is bulk-filled up to its free space.

use tracing::{debug, trace};

use crate::errors::{ExecStreamError, Result};
use crate::operators::generators::RowGenerator;
use crate::stream::{ExecStream, SingleOutput, StreamIo};
use crate::tuple::{DataType, Datum, Tuple, TupleDescriptor};
use crate::types::{ExecResult, Quantum};

#[derive(Debug)]
pub struct MockProducerParams {
    pub desc: TupleDescriptor,
    pub rows: u64,
    pub generator: Option<Box<dyn RowGenerator>>,
    /// Log every generated row at debug level.
    pub echo: bool,
}

impl MockProducerParams {
    /// Lean producer of `rows` zero rows with shape `desc`.
    pub fn lean(desc: TupleDescriptor, rows: u64) -> Self {
        Self {
            desc,
            rows,
            generator: None,
            echo: false,
        }
    }

    pub fn generated(desc: TupleDescriptor, rows: u64, generator: Box<dyn RowGenerator>) -> Self {
        Self {
            desc,
            rows,
            generator: Some(generator),
            echo: false,
        }
    }
}

#[derive(Debug)]
pub struct MockProducerStream {
    params: MockProducerParams,
    output: SingleOutput,
    width: usize,
    produced: u64,
}

impl MockProducerStream {
    pub fn new(params: MockProducerParams) -> Self {
        Self {
            params,
            output: SingleOutput::default(),
            width: 0,
            produced: 0,
        }
    }

    fn zero_row(&self) -> Tuple {
        self.params
            .desc
            .iter()
            .map(|a| Datum::zero(a.data_type))
            .collect()
    }

    fn execute_generated(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        let ncols = self.params.desc.len();
        let mut produced_now = 0u32;
        while self.produced < self.params.rows {
            if io.output(0).production_available() < self.width {
                return self.output.overflow(io);
            }
            if produced_now == quantum.n_tuples_max {
                io.output_mut(0).request_consumption();
                return Ok(ExecResult::QuantumExpired);
            }
            let Some(generator) = self.params.generator.as_mut() else {
                break;
            };
            let row = self.produced;
            let tuple: Tuple = (0..ncols)
                .map(|c| Datum::Int(generator.generate_value(row, c)))
                .collect();
            if self.params.echo {
                debug!(stream = %io.name(), row, ?tuple, "mock row");
            }
            // room was checked above
            self.output.produce(io, tuple);
            self.produced += 1;
            produced_now += 1;
        }
        Ok(self.output.finish(io))
    }

    fn execute_lean(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        let room = (io.output(0).production_available() / self.width) as u64;
        let remaining = self.params.rows - self.produced;
        let n = room
            .min(remaining)
            .min(u64::from(quantum.n_tuples_max));
        if n == 0 {
            return self.output.overflow(io);
        }
        let batch = vec![self.zero_row(); n as usize];
        io.output_mut(0).produce_data(batch)?;
        self.output.add_rows(n);
        self.produced += n;
        trace!(stream = %io.name(), rows = n, total = self.produced, "lean fill");

        if self.produced == self.params.rows {
            return Ok(self.output.finish(io));
        }
        if n == u64::from(quantum.n_tuples_max) && n < room {
            io.output_mut(0).request_consumption();
            return Ok(ExecResult::QuantumExpired);
        }
        self.output.overflow(io)
    }
}

impl ExecStream for MockProducerStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        for (i, attr) in self.params.desc.iter().enumerate() {
            if attr.nullable {
                return Err(ExecStreamError::prepare(
                    io.name(),
                    format!("column {i} is nullable"),
                ));
            }
            if !attr.data_type.is_integral() {
                return Err(ExecStreamError::prepare(
                    io.name(),
                    format!("column {i} has non-integral type {:?}", attr.data_type),
                ));
            }
            if self.params.generator.is_some() && attr.data_type != DataType::Int64 {
                return Err(ExecStreamError::prepare(
                    io.name(),
                    format!("generated column {i} must be int64"),
                ));
            }
        }
        self.width = self.params.desc.fixed_byte_count().unwrap_or(0).max(1);
        self.output.prepare(io, self.params.desc.clone())?;
        if io.output(0).capacity() < self.width {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!(
                    "output buffer of {} bytes cannot hold one {}-byte row",
                    io.output(0).capacity(),
                    self.width
                ),
            ));
        }
        Ok(())
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        self.produced = 0;
        if let Some(generator) = self.params.generator.as_mut() {
            generator.reset();
        }
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        if self.produced == self.params.rows {
            return Ok(self.output.finish(io));
        }
        if self.params.generator.is_some() {
            self.execute_generated(io, quantum)
        } else {
            self.execute_lean(io, quantum)
        }
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
