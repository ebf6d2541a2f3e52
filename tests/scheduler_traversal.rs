// tests/scheduler_traversal.rs

mod common;
use crate::common::builders::{shutdown, start};
use crate::common::{Action, ExecLog, ScriptedStream, Step, executed, init_tracing, new_log};

use std::thread;
use std::time::Duration;

use execstream::errors::Result;
use execstream::tuple::int_tuple;
use execstream::{
    BufState, DfsScheduler, ExecResult, ExecStream, ExecStreamError, ExecStreamScheduler,
    Quantum, StreamGraph, StreamId, StreamIo,
};

/// `P` feeds `B` (first out edge) and `A` (second); `B` also feeds `A`,
/// and `A` is the graph output.
///
/// Returns the graph and `A`.
fn fan_out_graph(
    log: &ExecLog,
    p: Vec<Step>,
    b: Vec<Step>,
    a: Vec<Step>,
) -> (StreamGraph, StreamId) {
    let mut graph = StreamGraph::new();
    let pid = graph.add_stream("P", ScriptedStream::boxed(p, log));
    let bid = graph.add_stream("B", ScriptedStream::boxed(b, log));
    let aid = graph.add_stream("A", ScriptedStream::boxed(a, log));
    graph.add_dataflow(pid, bid, 64);
    graph.add_dataflow(pid, aid, 64);
    graph.add_dataflow(bid, aid, 64);
    graph.add_output_dataflow(aid, 64);
    (graph, aid)
}

/// `P → A → output`.
fn chain_graph(log: &ExecLog, p: Vec<Step>, a: Vec<Step>) -> (StreamGraph, StreamId) {
    let mut graph = StreamGraph::new();
    let pid = graph.add_stream("P", ScriptedStream::boxed(p, log));
    let aid = graph.add_stream("A", ScriptedStream::boxed(a, log));
    graph.add_dataflow(pid, aid, 64);
    graph.add_output_dataflow(aid, 64);
    (graph, aid)
}

fn pull_first_input() -> Step {
    Step::new(ExecResult::BufferUnderflow).with(Action::RequestProduction(0))
}

fn emit_one(output: usize, value: i64) -> Step {
    Step::new(ExecResult::BufferOverflow)
        .with(Action::Produce {
            output,
            tuple: int_tuple(&[value]),
        })
        .with(Action::RequestConsumption(output))
}

#[test]
fn overflowing_producer_hands_off_to_waiting_consumer() {
    init_tracing();
    let log = new_log();
    let (graph, a) = fan_out_graph(
        &log,
        vec![emit_one(1, 7)],
        vec![],
        vec![
            pull_first_input(),
            Step::new(ExecResult::BufferOverflow)
                .with(Action::ConsumeAll(0))
                .with(Action::Produce {
                    output: 0,
                    tuple: int_tuple(&[70]),
                })
                .with(Action::RequestConsumption(0)),
        ],
    );
    let mut scheduler = start(graph, Quantum::default());

    let buf = scheduler.read_stream(a).unwrap();
    assert_eq!(buf.state(), BufState::Overflow);
    assert_eq!(buf.consume_all(), vec![int_tuple(&[70])]);

    // B sits behind an Empty edge and is never picked.
    assert_eq!(executed(&log), vec!["A", "P", "A"]);
    shutdown(scheduler);
}

#[test]
fn empty_consumer_runs_when_nothing_else_qualifies() {
    init_tracing();
    let log = new_log();
    let (graph, a) = fan_out_graph(
        &log,
        vec![Step::new(ExecResult::EndOfStream).with(Action::MarkEos(1))],
        vec![Step::eos()],
        vec![pull_first_input(), Step::eos()],
    );
    let mut scheduler = start(graph, Quantum::default());

    let buf = scheduler.read_stream(a).unwrap();
    assert_eq!(buf.state(), BufState::Eos);
    assert!(!buf.is_consumption_possible());

    assert_eq!(executed(&log), vec!["A", "P", "B", "A"]);
    shutdown(scheduler);
}

#[test]
fn quantum_expiry_reruns_the_same_stream() {
    init_tracing();
    let log = new_log();
    let (graph, a) = chain_graph(
        &log,
        vec![],
        vec![
            Step::new(ExecResult::QuantumExpired),
            Step::new(ExecResult::QuantumExpired),
            Step::eos(),
        ],
    );
    let mut scheduler = start(graph, Quantum::new(1));

    let buf = scheduler.read_stream(a).unwrap();
    assert!(buf.is_eos());
    assert_eq!(executed(&log), vec!["A", "A", "A"]);
    shutdown(scheduler);
}

#[test]
fn abort_stops_traversal_after_the_current_invocation() {
    init_tracing();
    let log = new_log();
    // The handle has to exist before the scripts that fire it.
    let mut scheduler = DfsScheduler::new();
    let handle = scheduler.abort_handle();

    let (mut graph, a) = chain_graph(
        &log,
        vec![emit_one(0, 1).with(Action::Abort(handle.clone()))],
        vec![
            pull_first_input(),
            Step::new(ExecResult::EndOfStream)
                .with(Action::ConsumeAll(0))
                .with(Action::MarkAllEos),
        ],
    );
    graph.prepare().unwrap();
    graph.open().unwrap();
    scheduler.add_graph(graph);
    scheduler.start();

    let err = scheduler.read_stream(a).unwrap_err();
    assert!(err.is_abort(), "unexpected error: {err}");
    assert!(matches!(err, ExecStreamError::Aborted));
    assert_eq!(executed(&log), vec!["A", "P"]);
    assert!(handle.is_aborted());

    // A restarted scheduler picks up where the aborted read left off.
    scheduler.stop();
    scheduler.start();
    let buf = scheduler.read_stream(a).unwrap();
    assert!(buf.is_eos());
    assert_eq!(executed(&log), vec!["A", "P", "A"]);
    shutdown(scheduler);
}

/// Never finishes; every call gives up its quantum.
#[derive(Debug)]
struct Spinner;

impl ExecStream for Spinner {
    fn prepare(&mut self, _io: &mut StreamIo<'_>) -> Result<()> {
        Ok(())
    }

    fn open(&mut self, _io: &mut StreamIo<'_>, _restart: bool) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, _io: &mut StreamIo<'_>, _quantum: &Quantum) -> Result<ExecResult> {
        thread::sleep(Duration::from_millis(1));
        Ok(ExecResult::QuantumExpired)
    }
}

#[test]
fn abort_from_another_thread_ends_a_running_read() {
    init_tracing();
    let mut graph = StreamGraph::new();
    let spinner = graph.add_stream("spinner", Box::new(Spinner));
    graph.add_output_dataflow(spinner, 64);
    let mut scheduler = start(graph, Quantum::default());

    let handle = scheduler.abort_handle();
    let supervisor = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.abort();
    });

    let result = scheduler.read_stream(spinner).map(|_| ());
    supervisor.join().unwrap();
    assert!(matches!(result, Err(ExecStreamError::Aborted)));
    shutdown(scheduler);
}

#[test]
#[should_panic(expected = "without an underflowing input")]
fn underflow_without_request_is_a_contract_violation() {
    let log = new_log();
    let (graph, a) = chain_graph(&log, vec![], vec![Step::new(ExecResult::BufferUnderflow)]);
    let mut scheduler = start(graph, Quantum::default());
    let _ = scheduler.read_stream(a);
}

#[test]
#[should_panic(expected = "is not a graph output")]
fn reading_an_inner_stream_panics() {
    let log = new_log();
    let (graph, a) = chain_graph(&log, vec![], vec![]);
    let p = graph.find_stream("P").unwrap();
    assert_ne!(p, a);
    let mut scheduler = start(graph, Quantum::default());
    let _ = scheduler.read_stream(p);
}

#[test]
#[should_panic(expected = "before start")]
fn reading_before_start_panics() {
    let log = new_log();
    let (mut graph, a) = chain_graph(&log, vec![], vec![]);
    graph.prepare().unwrap();
    graph.open().unwrap();
    let mut scheduler = DfsScheduler::new();
    scheduler.add_graph(graph);
    let _ = scheduler.read_stream(a);
}
