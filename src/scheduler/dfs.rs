// src/scheduler/dfs.rs

//! Demand-pull depth-first scheduler.
//!
//! `read_stream` starts at a graph output and repeatedly:
//! 1. walks upstream while the current stream has an input in `Underflow`,
//! 2. otherwise executes the current stream for one quantum and checks the
//!    abort flag,
//! 3. moves downstream after `EndOfStream`/`BufferOverflow`, returning as
//!    soon as the chosen edge leads to a sink sentinel.
//!
//! The walk is a plain loop over vertex ids and works for any acyclic graph,
//! including fan-out and fan-in.

use tracing::{debug, info, trace, warn};

use crate::buffer::{BufState, BufferAccessor};
use crate::errors::{ExecStreamError, Result};
use crate::graph::StreamGraph;
use crate::scheduler::{AbortHandle, ExecStreamScheduler};
use crate::types::{EdgeId, ExecResult, Quantum, StreamId};

/// Where control goes after a stream produced output or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextConsumer {
    /// The edge feeds a sink: its buffer is ready for the caller.
    Output(EdgeId),
    Stream(StreamId),
}

#[derive(Debug, Default)]
pub struct DfsScheduler {
    graph: Option<StreamGraph>,
    quantum: Quantum,
    abort: AbortHandle,
    started: bool,
    last_delivered: Option<StreamId>,
}

impl DfsScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quantum(quantum: Quantum) -> Self {
        Self {
            quantum,
            ..Self::default()
        }
    }

    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    pub fn set_quantum(&mut self, quantum: Quantum) {
        self.quantum = quantum;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }
}

/// Pick the next vertex downstream of `current`.
///
/// Out edges are scanned in insertion order. A sink edge wins immediately.
/// Otherwise the first edge whose state differs from `skip` wins, with the
/// first `Empty` edge kept as a fallback so that consumers which asked for
/// data go before idle ones.
fn find_next_consumer(graph: &StreamGraph, current: StreamId, skip: BufState) -> NextConsumer {
    let edges = graph.out_edges(current);
    assert!(
        !edges.is_empty(),
        "stream '{}' has no consumers",
        graph.stream_name(current)
    );

    let mut empty_fallback = None;
    for &edge in edges {
        let target = graph.edge_target(edge);
        if graph.is_sink(target) {
            return NextConsumer::Output(edge);
        }
        let state = graph.accessor_for_edge(edge).state();
        if state == BufState::Empty {
            empty_fallback.get_or_insert(target);
            continue;
        }
        if state != skip {
            return NextConsumer::Stream(target);
        }
    }

    if let Some(target) = empty_fallback {
        return NextConsumer::Stream(target);
    }
    assert!(
        skip != BufState::Underflow,
        "stream '{}' overflowed but every consumer is already waiting on it",
        graph.stream_name(current)
    );
    let last = edges[edges.len() - 1];
    NextConsumer::Stream(graph.edge_target(last))
}

fn first_underflowing_input(graph: &StreamGraph, id: StreamId) -> Option<EdgeId> {
    graph
        .in_edges(id)
        .iter()
        .copied()
        .find(|&e| graph.accessor_for_edge(e).state() == BufState::Underflow)
}

impl ExecStreamScheduler for DfsScheduler {
    fn add_graph(&mut self, graph: StreamGraph) {
        assert!(
            self.graph.is_none(),
            "a graph is already attached to this scheduler"
        );
        debug!(?graph, "graph attached");
        self.graph = Some(graph);
    }

    fn remove_graph(&mut self) -> StreamGraph {
        let Some(graph) = self.graph.take() else {
            panic!("remove_graph called with no graph attached");
        };
        self.started = false;
        debug!("graph detached");
        graph
    }

    fn graph(&self) -> &StreamGraph {
        match self.graph.as_ref() {
            Some(graph) => graph,
            None => panic!("no graph attached"),
        }
    }

    fn graph_mut(&mut self) -> &mut StreamGraph {
        match self.graph.as_mut() {
            Some(graph) => graph,
            None => panic!("no graph attached"),
        }
    }

    fn start(&mut self) {
        assert!(
            self.graph().is_acyclic(),
            "cannot schedule a cyclic stream graph"
        );
        self.abort.clear();
        self.started = true;
        info!(quantum = self.quantum.n_tuples_max, "scheduler started");
    }

    fn stop(&mut self) {
        self.abort.clear();
        if self.started {
            info!("scheduler stopped");
        }
        self.started = false;
    }

    fn abort(&self) {
        self.abort.abort();
    }

    fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn set_runnable(&mut self, stream: StreamId, runnable: bool) {
        panic!("set_runnable({stream}, {runnable}) is not supported by the DFS scheduler");
    }

    fn restart_stream(&mut self, stream: StreamId) -> Result<()> {
        self.graph_mut().open_stream(stream, true)
    }

    fn read_stream(&mut self, target: StreamId) -> Result<&mut BufferAccessor> {
        assert!(self.started, "read_stream called before start");
        let Self {
            graph,
            quantum,
            abort,
            last_delivered,
            ..
        } = self;
        let Some(graph) = graph.as_mut() else {
            panic!("no graph attached");
        };

        let outs = graph.out_edges(target);
        assert!(
            outs.len() == 1 && graph.is_sink(graph.edge_target(outs[0])),
            "stream '{}' is not a graph output",
            graph.stream_name(target)
        );

        let mut current = target;
        let output = 'traverse: loop {
            if let Some(edge) = first_underflowing_input(graph, current) {
                let source = graph.edge_source(edge);
                trace!(
                    from = %graph.stream_name(current),
                    to = %graph.stream_name(source),
                    "walking upstream"
                );
                current = source;
                continue;
            }

            let rc = graph.execute_stream(current, quantum)?;
            if abort.is_aborted() {
                warn!(stream = %graph.stream_name(current), "abort observed");
                return Err(ExecStreamError::Aborted);
            }

            let skip = match rc {
                ExecResult::EndOfStream => BufState::Eos,
                ExecResult::BufferOverflow => BufState::Underflow,
                ExecResult::BufferUnderflow => {
                    assert!(
                        first_underflowing_input(graph, current).is_some(),
                        "stream '{}' returned BufferUnderflow without an underflowing input",
                        graph.stream_name(current)
                    );
                    continue;
                }
                ExecResult::QuantumExpired => continue,
            };

            match find_next_consumer(graph, current, skip) {
                NextConsumer::Output(edge) => break 'traverse edge,
                NextConsumer::Stream(next) => {
                    trace!(
                        from = %graph.stream_name(current),
                        to = %graph.stream_name(next),
                        "moving downstream"
                    );
                    current = next;
                }
            }
        };

        let delivered = graph.edge_source(output);
        if delivered != target {
            debug!(
                requested = %graph.stream_name(target),
                delivered = %graph.stream_name(delivered),
                "traversal reached another graph output"
            );
        }
        *last_delivered = Some(delivered);
        Ok(graph.accessor_for_edge_mut(output))
    }

    fn last_delivered(&self) -> Option<StreamId> {
        self.last_delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::merge::MergeStream;
    use crate::operators::values::ValuesStream;
    use crate::tuple::{TupleDescriptor, int_tuple};

    fn values(rows: &[i64]) -> Box<dyn crate::stream::ExecStream> {
        Box::new(ValuesStream::new(
            TupleDescriptor::int64s(1),
            rows.iter().map(|&v| int_tuple(&[v])).collect(),
        ))
    }

    #[test]
    fn empty_consumer_is_only_a_fallback() {
        let mut graph = StreamGraph::new();
        let producer = graph.add_stream("p", values(&[1]));
        let idle = graph.add_stream("idle", values(&[2]));
        let waiting = graph.add_stream("waiting", values(&[3]));
        graph.add_dataflow(producer, idle, 64);
        let wait_edge = graph.add_dataflow(producer, waiting, 64);

        assert_eq!(
            find_next_consumer(&graph, producer, BufState::Eos),
            NextConsumer::Stream(idle)
        );

        graph.accessor_for_edge_mut(wait_edge).request_production();
        assert_eq!(
            find_next_consumer(&graph, producer, BufState::Eos),
            NextConsumer::Stream(waiting)
        );
    }

    #[test]
    fn all_consumers_skipped_falls_back_to_last_edge() {
        let mut graph = StreamGraph::new();
        let producer = graph.add_stream("p", values(&[1]));
        let a = graph.add_stream("a", values(&[2]));
        let b = graph.add_stream("b", values(&[3]));
        let ea = graph.add_dataflow(producer, a, 64);
        let eb = graph.add_dataflow(producer, b, 64);
        graph.accessor_for_edge_mut(ea).mark_eos();
        graph.accessor_for_edge_mut(eb).mark_eos();

        assert_eq!(
            find_next_consumer(&graph, producer, BufState::Eos),
            NextConsumer::Stream(b)
        );
    }

    #[test]
    fn sink_edge_returns_output() {
        let mut graph = StreamGraph::new();
        let producer = graph.add_stream("p", values(&[1]));
        let edge = graph.add_output_dataflow(producer, 64);
        assert_eq!(
            find_next_consumer(&graph, producer, BufState::Underflow),
            NextConsumer::Output(edge)
        );
    }

    #[test]
    fn read_stream_delivers_values_then_eos() {
        let mut graph = StreamGraph::new();
        let producer = graph.add_stream("p", values(&[1, 2, 3]));
        graph.add_output_dataflow(producer, 64);
        graph.prepare().unwrap();
        graph.open().unwrap();

        let mut scheduler = DfsScheduler::new();
        scheduler.add_graph(graph);
        scheduler.start();

        let buf = scheduler.read_stream(producer).unwrap();
        assert_eq!(buf.state(), BufState::Eos);
        assert_eq!(
            buf.consume_all(),
            vec![int_tuple(&[1]), int_tuple(&[2]), int_tuple(&[3])]
        );
        assert_eq!(scheduler.last_delivered(), Some(producer));

        scheduler.stop();
        let mut graph = scheduler.remove_graph();
        graph.close();
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn double_attach_panics() {
        let mut scheduler = DfsScheduler::new();
        scheduler.add_graph(StreamGraph::new());
        scheduler.add_graph(StreamGraph::new());
    }

    #[test]
    #[should_panic(expected = "cyclic")]
    fn start_rejects_cyclic_graph() {
        let mut graph = StreamGraph::new();
        let a = graph.add_stream("a", Box::new(MergeStream::new()));
        let b = graph.add_stream("b", Box::new(MergeStream::new()));
        graph.add_dataflow(a, b, 64);
        graph.add_dataflow(b, a, 64);

        let mut scheduler = DfsScheduler::new();
        scheduler.add_graph(graph);
        scheduler.start();
    }

    #[test]
    #[should_panic(expected = "no graph attached")]
    fn remove_without_graph_panics() {
        let mut scheduler = DfsScheduler::new();
        scheduler.remove_graph();
    }

    #[test]
    #[should_panic(expected = "not supported")]
    fn set_runnable_is_rejected() {
        let mut scheduler = DfsScheduler::new();
        scheduler.set_runnable(StreamId(0), true);
    }

    #[test]
    fn abort_flag_is_cleared_by_start_and_stop() {
        let mut scheduler = DfsScheduler::new();
        scheduler.add_graph(StreamGraph::new());
        let handle = scheduler.abort_handle();

        scheduler.abort();
        assert!(handle.is_aborted());
        scheduler.start();
        assert!(!handle.is_aborted());

        handle.abort();
        scheduler.stop();
        scheduler.stop();
        assert!(!handle.is_aborted());
    }
}
