//! A stream whose every invocation is scripted by the test.

use std::sync::{Arc, Mutex};

use execstream::errors::Result;
use execstream::tuple::{Tuple, TupleDescriptor};
use execstream::{AbortHandle, ExecResult, ExecStream, Quantum, StreamIo};

/// Names of executed streams, in execution order, shared by all scripted
/// streams of a test.
pub type ExecLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Side effect applied to the stream's buffers before a step returns.
#[derive(Debug, Clone)]
pub enum Action {
    Produce { output: usize, tuple: Tuple },
    RequestConsumption(usize),
    /// Mark one output EOS.
    MarkEos(usize),
    MarkAllEos,
    /// Drop everything queued on an input.
    ConsumeAll(usize),
    RequestProduction(usize),
    /// Fire the abort handle as if a supervisor did it mid-invocation.
    Abort(AbortHandle),
}

#[derive(Debug, Clone)]
pub struct Step {
    pub actions: Vec<Action>,
    pub result: ExecResult,
}

impl Step {
    pub fn new(result: ExecResult) -> Self {
        Self {
            actions: Vec::new(),
            result,
        }
    }

    pub fn with(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Mark all outputs EOS and report `EndOfStream`.
    pub fn eos() -> Self {
        Self::new(ExecResult::EndOfStream).with(Action::MarkAllEos)
    }
}

/// Replays `steps` one per `execute`. Once the script runs out, every further
/// call behaves like [`Step::eos`].
#[derive(Debug)]
pub struct ScriptedStream {
    steps: Vec<Step>,
    next: usize,
    log: ExecLog,
    desc: TupleDescriptor,
}

impl ScriptedStream {
    pub fn new(steps: Vec<Step>, log: ExecLog) -> Self {
        Self {
            steps,
            next: 0,
            log,
            desc: TupleDescriptor::int64s(1),
        }
    }

    pub fn boxed(steps: Vec<Step>, log: &ExecLog) -> Box<dyn ExecStream> {
        Box::new(Self::new(steps, log.clone()))
    }
}

impl ExecStream for ScriptedStream {
    fn prepare(&mut self, io: &mut StreamIo<'_>) -> Result<()> {
        for o in 0..io.output_count() {
            io.output_mut(o).set_tuple_desc(self.desc.clone());
        }
        Ok(())
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    fn execute(&mut self, io: &mut StreamIo<'_>, _quantum: &Quantum) -> Result<ExecResult> {
        self.log
            .lock()
            .expect("exec log poisoned")
            .push(io.name().to_string());

        let step = self.steps.get(self.next).cloned().unwrap_or_else(Step::eos);
        self.next += 1;

        for action in step.actions {
            match action {
                Action::Produce { output, tuple } => {
                    assert!(
                        io.output_mut(output).produce_tuple(tuple),
                        "scripted tuple does not fit"
                    );
                }
                Action::RequestConsumption(o) => io.output_mut(o).request_consumption(),
                Action::MarkEos(o) => io.output_mut(o).mark_eos(),
                Action::MarkAllEos => {
                    for o in 0..io.output_count() {
                        io.output_mut(o).mark_eos();
                    }
                }
                Action::ConsumeAll(i) => {
                    io.input_mut(i).consume_all();
                }
                Action::RequestProduction(i) => io.input_mut(i).request_production(),
                Action::Abort(handle) => handle.abort(),
            }
        }
        Ok(step.result)
    }
}
