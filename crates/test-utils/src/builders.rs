#![allow(dead_code)]

//! Shortcuts for assembling graphs and schedulers in tests.

use execstream::operators::bitmap::{BitmapIndex, SharedBitmapIndex};
use execstream::operators::generators::{
    ColumnGenerator, CompositeGenerator, RepeatingSeqColumnGenerator,
};
use execstream::operators::storage::{ColumnStore, SharedColumnStore};
use execstream::operators::{
    BarrierParams, BarrierStream, BitmapGeneratorParams, BitmapGeneratorStream,
    BitmapSplicerStream, ClusterAppendParams, ClusterAppendStream, MockProducerParams,
    MockProducerStream, SortParams, SortStream, SplitterStream, ValuesStream,
};
use execstream::tuple::{TupleDescriptor, int_tuple};
use execstream::{DfsScheduler, ExecStream, ExecStreamScheduler, Quantum, StreamGraph, StreamId};

/// Bytes one single-column `Int64` row occupies in a buffer.
pub const INT_ROW_BYTES: usize = 8;

pub fn values(rows: &[i64]) -> Box<dyn ExecStream> {
    Box::new(ValuesStream::new(
        TupleDescriptor::int64s(1),
        rows.iter().map(|&v| int_tuple(&[v])).collect(),
    ))
}

pub fn lean_producer(columns: usize, rows: u64) -> Box<dyn ExecStream> {
    Box::new(MockProducerStream::new(MockProducerParams::lean(
        TupleDescriptor::int64s(columns),
        rows,
    )))
}

/// `producer → output`, with a lean single-column producer.
pub fn lean_pipeline(rows: u64, capacity: usize) -> (StreamGraph, StreamId) {
    let mut graph = StreamGraph::new();
    let producer = graph.add_stream("producer", lean_producer(1, rows));
    graph.add_output_dataflow(producer, capacity);
    (graph, producer)
}

/// Prepare and open `graph`, attach it and start the scheduler.
pub fn start(mut graph: StreamGraph, quantum: Quantum) -> DfsScheduler {
    graph.prepare().expect("prepare failed");
    graph.open().expect("open failed");
    let mut scheduler = DfsScheduler::with_quantum(quantum);
    scheduler.add_graph(graph);
    scheduler.start();
    scheduler
}

/// Stop, detach and close.
pub fn shutdown(mut scheduler: DfsScheduler) -> StreamGraph {
    scheduler.stop();
    let mut graph = scheduler.remove_graph();
    graph.close();
    graph
}

/// A clustered table with one `Int64` column per cluster and a bitmap index
/// keyed on all of them.
pub struct IndexedTable {
    pub store: SharedColumnStore,
    pub index: SharedBitmapIndex,
    pub clusters: usize,
}

impl IndexedTable {
    pub fn new(clusters: usize) -> Self {
        Self {
            store: ColumnStore::new(vec![TupleDescriptor::int64s(1); clusters]).shared(),
            index: BitmapIndex::new(TupleDescriptor::int64s(clusters)).shared(),
            clusters,
        }
    }
}

/// The load graph: `producer → splitter → append × n → barrier →
/// generator → sort → splicer → output`.
///
/// Column `i` of the producer repeats `0..repeats[i]` and is loaded into
/// cluster `i`. Returns the graph and the splicer.
pub fn load_graph(
    table: &IndexedTable,
    rows: u64,
    repeats: &[i64],
    capacity: usize,
) -> (StreamGraph, StreamId) {
    assert_eq!(repeats.len(), table.clusters);
    let mut graph = StreamGraph::new();

    let generator = CompositeGenerator::new(
        repeats
            .iter()
            .map(|&n| {
                Box::new(RepeatingSeqColumnGenerator::new(n)) as Box<dyn ColumnGenerator>
            })
            .collect(),
    );
    let producer = graph.add_stream(
        "producer",
        Box::new(MockProducerStream::new(MockProducerParams::generated(
            TupleDescriptor::int64s(repeats.len()),
            rows,
            Box::new(generator),
        ))),
    );
    let splitter = graph.add_stream("splitter", Box::new(SplitterStream::new()));
    graph.add_dataflow(producer, splitter, capacity);

    let barrier = graph.add_stream(
        "barrier",
        Box::new(BarrierStream::new(BarrierParams {
            check_row_counts: true,
            ..BarrierParams::default()
        })),
    );
    for cluster in 0..table.clusters {
        let append = graph.add_stream(
            format!("append{cluster}"),
            Box::new(ClusterAppendStream::new(ClusterAppendParams {
                store: table.store.clone(),
                cluster,
                columns: vec![cluster],
            })),
        );
        graph.add_dataflow(splitter, append, capacity);
        graph.add_dataflow(append, barrier, capacity);
    }

    let bitmap_gen = graph.add_stream(
        "generator",
        Box::new(BitmapGeneratorStream::new(BitmapGeneratorParams {
            store: table.store.clone(),
            keys: (0..table.clusters).map(|c| (c, 0)).collect(),
        })),
    );
    graph.add_dataflow(barrier, bitmap_gen, capacity);

    let sort = graph.add_stream(
        "sort",
        Box::new(SortStream::new(SortParams::ascending(
            (0..=table.clusters).collect(),
        ))),
    );
    graph.add_dataflow(bitmap_gen, sort, capacity);

    let splicer = graph.add_stream(
        "splicer",
        Box::new(BitmapSplicerStream::new(table.index.clone())),
    );
    graph.add_dataflow(sort, splicer, capacity);
    graph.add_output_dataflow(splicer, capacity);

    (graph, splicer)
}
