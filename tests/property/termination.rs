use proptest::prelude::*;

use execstream::operators::generators::RampGenerator;
use execstream::operators::{
    MergeStream, MockProducerParams, MockProducerStream, SortParams, SortStream, SplitterStream,
};
use execstream::tuple::TupleDescriptor;
use execstream::{Quantum, StreamGraph, StreamId};
use execstream_test_utils::builders::{shutdown, start};
use execstream_test_utils::drain::rows;
use execstream_test_utils::drain_all;

/// One link of the pipeline behind the producer.
#[derive(Debug, Clone)]
enum Stage {
    Sort,
    /// splitter → one branch per entry (sorted or direct) → merge
    Diamond(Vec<bool>),
}

#[derive(Debug, Clone)]
struct Shape {
    rows: u64,
    stages: Vec<Stage>,
    /// Number of sorted leaves hanging off a final splitter; 0 means the
    /// last stage is the only output.
    leaves: usize,
    capacity: usize,
    quantum: Option<u32>,
}

impl Shape {
    fn copies(&self) -> usize {
        self.stages
            .iter()
            .map(|s| match s {
                Stage::Sort => 1,
                Stage::Diamond(branches) => branches.len(),
            })
            .product()
    }
}

fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        Just(Stage::Sort),
        proptest::collection::vec(any::<bool>(), 1..=3).prop_map(Stage::Diamond),
    ]
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    (
        0..30u64,
        proptest::collection::vec(stage_strategy(), 0..4),
        0..=3usize,
        // at least one 8-byte row per buffer
        8..=64usize,
        proptest::option::of(1..=5u32),
    )
        .prop_map(|(rows, stages, leaves, capacity, quantum)| Shape {
            rows,
            stages,
            leaves,
            capacity,
            quantum,
        })
}

fn sort() -> Box<SortStream> {
    Box::new(SortStream::new(SortParams::ascending(vec![0])))
}

/// Build the graph; returns it with its outputs.
fn build(shape: &Shape) -> (StreamGraph, Vec<StreamId>) {
    let mut graph = StreamGraph::new();
    let cap = shape.capacity;
    let mut tail = graph.add_stream(
        "producer",
        Box::new(MockProducerStream::new(MockProducerParams::generated(
            TupleDescriptor::int64s(1),
            shape.rows,
            Box::new(RampGenerator::new()),
        ))),
    );

    for (i, stage) in shape.stages.iter().enumerate() {
        match stage {
            Stage::Sort => {
                let s = graph.add_stream(format!("sort{i}"), sort());
                graph.add_dataflow(tail, s, cap);
                tail = s;
            }
            Stage::Diamond(branches) => {
                let split = graph.add_stream(format!("split{i}"), Box::new(SplitterStream::new()));
                let merge = graph.add_stream(format!("merge{i}"), Box::new(MergeStream::new()));
                graph.add_dataflow(tail, split, cap);
                for (b, &sorted) in branches.iter().enumerate() {
                    if sorted {
                        let s = graph.add_stream(format!("sort{i}.{b}"), sort());
                        graph.add_dataflow(split, s, cap);
                        graph.add_dataflow(s, merge, cap);
                    } else {
                        graph.add_dataflow(split, merge, cap);
                    }
                }
                tail = merge;
            }
        }
    }

    if shape.leaves == 0 {
        graph.add_output_dataflow(tail, cap);
        return (graph, vec![tail]);
    }
    let split = graph.add_stream("leaves", Box::new(SplitterStream::new()));
    graph.add_dataflow(tail, split, cap);
    let outputs = (0..shape.leaves)
        .map(|l| {
            let leaf = graph.add_stream(format!("leaf{l}"), sort());
            graph.add_dataflow(split, leaf, cap);
            graph.add_output_dataflow(leaf, cap);
            leaf
        })
        .collect();
    (graph, outputs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn read_stream_terminates_and_loses_nothing(shape in shape_strategy()) {
        let (graph, outputs) = build(&shape);
        let quantum = shape.quantum.map(Quantum::new).unwrap_or_default();
        let mut scheduler = start(graph, quantum);

        let drained = drain_all(&mut scheduler, &outputs).unwrap();
        shutdown(scheduler);

        let mut expected: Vec<i64> = (0..shape.rows as i64)
            .flat_map(|v| std::iter::repeat_n(v, shape.copies()))
            .collect();
        expected.sort_unstable();

        for output in &outputs {
            let deliveries = drained.get(output).cloned().unwrap_or_default();
            prop_assert!(
                deliveries.last().is_some_and(|d| d.state == execstream::BufState::Eos),
                "output {} never reached EOS", output
            );
            let mut values: Vec<i64> = rows(&deliveries)
                .iter()
                .map(|t| t[0].as_int().unwrap())
                .collect();
            values.sort_unstable();
            prop_assert_eq!(&values, &expected);
        }
    }
}
