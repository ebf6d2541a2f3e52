// src/operators/splitter.rs

//! Fan-out: one input copied to every output.

use std::collections::VecDeque;

use tracing::trace;

use crate::buffer::BufState;
use crate::errors::{ExecStreamError, Result};
use crate::stream::{ExecStream, StreamIo};
use crate::tuple::{Tuple, tuple_byte_count};
use crate::types::{ExecResult, Quantum};

/// Copies each input tuple to all outputs.
///
/// Input is pulled when every output has been drained, or when a consumer
/// has explicitly asked for more (its edge is in `Underflow`). In the second
/// case, copies meant for outputs that are still full wait in a per-output
/// backlog and are handed over, in order, as those outputs drain. A consumer
/// that blocks on its own input (a sort feeding a merge that also reads from
/// this splitter) therefore never stalls its siblings.
#[derive(Debug, Default)]
pub struct SplitterStream {
    rows: u64,
    backlog: Vec<VecDeque<Tuple>>,
}

impl SplitterStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn holds_data(io: &StreamIo<'_>, o: usize) -> bool {
        io.output(o).is_consumption_possible()
    }

    /// Output `o` has nothing queued or held back and can take new input.
    fn is_idle(&self, io: &StreamIo<'_>, o: usize) -> bool {
        !io.output(o).is_eos() && self.backlog[o].is_empty() && !Self::holds_data(io, o)
    }

    fn wants_input(&self, io: &StreamIo<'_>) -> bool {
        let live: Vec<usize> = (0..io.output_count())
            .filter(|&o| !io.output(o).is_eos())
            .collect();
        let demanded = live
            .iter()
            .any(|&o| self.is_idle(io, o) && io.output(o).state() == BufState::Underflow);
        demanded || live.iter().all(|&o| self.is_idle(io, o))
    }

    /// Move held-back tuples into outputs with room. Returns tuples moved.
    fn flush_backlog(&mut self, io: &mut StreamIo<'_>, budget: u32) -> Result<u32> {
        let mut moved = 0u32;
        for o in 0..io.output_count() {
            while moved < budget {
                let Some(tuple) = self.backlog[o].front() else {
                    break;
                };
                if tuple_byte_count(tuple) > io.output(o).production_available() {
                    if !Self::holds_data(io, o) {
                        return Err(ExecStreamError::operator(
                            io.name(),
                            format!("input tuple does not fit in empty output {o}"),
                        ));
                    }
                    break;
                }
                if let Some(tuple) = self.backlog[o].pop_front() {
                    io.output_mut(o).produce_tuple(tuple);
                    moved += 1;
                }
            }
        }
        Ok(moved)
    }

    /// Copy input tuples to every output, directly where there is room and
    /// into the backlog otherwise. Stops once no output can take a tuple
    /// directly.
    fn copy_input(&mut self, io: &mut StreamIo<'_>, budget: u32) -> Result<u32> {
        let mut copied = 0u32;
        while copied < budget {
            let Some(tuple) = io.input(0).peek_tuple() else {
                break;
            };
            let size = tuple_byte_count(tuple);
            let mut direct = vec![false; io.output_count()];
            for (o, fits) in direct.iter_mut().enumerate() {
                if io.output(o).is_eos() || !self.backlog[o].is_empty() {
                    continue;
                }
                if size <= io.output(o).production_available() {
                    *fits = true;
                } else if !Self::holds_data(io, o) {
                    return Err(ExecStreamError::operator(
                        io.name(),
                        format!("input tuple does not fit in empty output {o}"),
                    ));
                }
            }
            if !direct.contains(&true) {
                break;
            }
            let Some(tuple) = io.input_mut(0).consume_tuple() else {
                break;
            };
            for (o, fits) in direct.into_iter().enumerate() {
                if fits {
                    io.output_mut(o).produce_tuple(tuple.clone());
                } else if !io.output(o).is_eos() {
                    self.backlog[o].push_back(tuple.clone());
                }
            }
            copied += 1;
        }
        self.rows += u64::from(copied);
        Ok(copied)
    }

    fn hand_over(io: &mut StreamIo<'_>) -> ExecResult {
        for o in 0..io.output_count() {
            io.output_mut(o).request_consumption();
        }
        ExecResult::BufferOverflow
    }
}

impl ExecStream for SplitterStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        if io.input_count() != 1 || io.output_count() == 0 {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!(
                    "splitter needs one input and at least one output, found {} and {}",
                    io.input_count(),
                    io.output_count()
                ),
            ));
        }
        let desc = io
            .input(0)
            .tuple_desc()
            .cloned()
            .ok_or_else(|| ExecStreamError::prepare(io.name(), "input has no tuple descriptor"))?;
        for o in 0..io.output_count() {
            io.output_mut(o).set_tuple_desc(desc.clone());
        }
        Ok(())
    }

    fn open(&mut self, io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.rows = 0;
        self.backlog = vec![VecDeque::new(); io.output_count()];
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, quantum: &Quantum) -> Result<ExecResult> {
        if (0..io.output_count()).all(|o| io.output(o).is_eos()) {
            return Ok(ExecResult::EndOfStream);
        }

        let mut moved = self.flush_backlog(io, quantum.n_tuples_max)?;
        if moved == quantum.n_tuples_max {
            return Ok(Self::hand_over(io));
        }

        if self.wants_input(io) {
            moved += self.copy_input(io, quantum.n_tuples_max - moved)?;
            if !io.input(0).is_consumption_possible() {
                if !io.input(0).is_eos() {
                    if moved == 0 {
                        io.input_mut(0).request_production();
                        return Ok(ExecResult::BufferUnderflow);
                    }
                } else {
                    for o in 0..io.output_count() {
                        if self.backlog[o].is_empty() {
                            io.output_mut(o).mark_eos();
                        }
                    }
                    if (0..io.output_count()).all(|o| io.output(o).is_eos()) {
                        return Ok(ExecResult::EndOfStream);
                    }
                }
            }
        }

        if moved > 0 {
            trace!(
                stream = %io.name(),
                moved,
                held = self.backlog.iter().map(VecDeque::len).sum::<usize>(),
                "split batch"
            );
        }
        Ok(Self::hand_over(io))
    }

    fn row_count(&self) -> u64 {
        self.rows
    }
}
