// src/operators/merge.rs

//! UNION ALL over any number of inputs.

use crate::buffer::BufState;
use crate::errors::Result;
use crate::stream::{Confluence, ExecStream, SingleOutput, StreamIo};
use crate::types::{ExecResult, Quantum};

/// Passes through tuples from whichever input has data, lowest input first.
///
/// Production is only requested (from the first unfinished input) when no
/// input holds data. Such a request can go stale when the data then arrives
/// on another input; the splitter keeps serving the requested branch so the
/// stale edge is eventually filled and this stream runs again.
#[derive(Debug, Default)]
pub struct MergeStream {
    output: SingleOutput,
}

impl MergeStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecStream for MergeStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        let descs = Confluence::prepare_inputs(io, self.input_provision())?;
        let desc = Confluence::common_desc(io, &descs)?;
        self.output.prepare(io, desc)
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.output.open();
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        match io.output(0).state() {
            BufState::Eos => return Ok(ExecResult::EndOfStream),
            BufState::Overflow => return Ok(ExecResult::BufferOverflow),
            _ => {}
        }

        let mut moved = 0u32;
        loop {
            let Some(i) = (0..io.input_count()).find(|&i| io.input(i).is_consumption_possible())
            else {
                break;
            };
            while let Some(tuple) = io.input(i).peek_tuple().cloned() {
                if moved == quantum.n_tuples_max {
                    io.output_mut(0).request_consumption();
                    return Ok(ExecResult::QuantumExpired);
                }
                if !self.output.produce(io, tuple) {
                    return self.output.overflow(io);
                }
                io.input_mut(i).consume_tuple();
                moved += 1;
            }
        }

        if io.output(0).is_consumption_possible() {
            return self.output.overflow(io);
        }
        match (0..io.input_count()).find(|&i| !io.input(i).is_eos()) {
            None => Ok(self.output.finish(io)),
            Some(i) => {
                io.input_mut(i).request_production();
                Ok(ExecResult::BufferUnderflow)
            }
        }
    }

    fn row_count(&self) -> u64 {
        self.output.row_count()
    }
}
