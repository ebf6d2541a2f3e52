// src/config/build.rs

//! Turn a validated [`ConfigFile`] into an unprepared [`StreamGraph`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::{ConfigFile, StreamConfig, StreamKind};
use crate::graph::StreamGraph;
use crate::operators::barrier::{BarrierParams, BarrierStream};
use crate::operators::generators::CompositeGenerator;
use crate::operators::merge::MergeStream;
use crate::operators::mock_producer::{MockProducerParams, MockProducerStream};
use crate::operators::sort::{SortParams, SortStream};
use crate::operators::splitter::SplitterStream;
use crate::operators::values::ValuesStream;
use crate::stream::ExecStream;
use crate::tuple::{TupleDescriptor, int_tuple};
use crate::types::StreamId;

fn instantiate(cfg: &StreamConfig) -> Box<dyn ExecStream> {
    match &cfg.kind {
        StreamKind::MockProducer {
            rows,
            columns,
            lean,
            echo,
        } => {
            let desc = TupleDescriptor::int64s(columns.len());
            let mut params = if *lean {
                MockProducerParams::lean(desc, *rows)
            } else {
                let generator =
                    CompositeGenerator::new(columns.iter().map(|c| c.generator()).collect());
                MockProducerParams::generated(desc, *rows, Box::new(generator))
            };
            params.echo = *echo;
            Box::new(MockProducerStream::new(params))
        }
        StreamKind::Values { rows } => {
            let width = rows.first().map_or(0, Vec::len);
            Box::new(ValuesStream::new(
                TupleDescriptor::int64s(width),
                rows.iter().map(|r| int_tuple(r)).collect(),
            ))
        }
        StreamKind::Splitter => Box::new(SplitterStream::new()),
        StreamKind::Merge => Box::new(MergeStream::new()),
        StreamKind::Barrier {
            mode,
            check_row_counts,
        } => Box::new(BarrierStream::new(BarrierParams {
            mode: *mode,
            check_row_counts: *check_row_counts,
        })),
        StreamKind::Sort {
            keys,
            order,
            discard_duplicates,
        } => Box::new(SortStream::new(SortParams {
            keys: keys.clone(),
            orders: order.clone(),
            discard_duplicates: *discard_duplicates,
        })),
    }
}

/// Build the graph described by `cfg`.
///
/// Streams are registered in name order and every stream's inputs are
/// connected in the order listed, so a splitter's outputs follow the names of
/// its consumers. Streams nobody reads from become graph outputs.
pub fn build_graph(cfg: &ConfigFile) -> StreamGraph {
    let capacity = cfg.scheduler.buffer_capacity;
    let mut graph = StreamGraph::new();
    let mut ids: BTreeMap<&str, StreamId> = BTreeMap::new();

    for (name, stream) in cfg.stream.iter() {
        let id = graph.add_stream(name.clone(), instantiate(stream));
        ids.insert(name.as_str(), id);
    }

    for (name, stream) in cfg.stream.iter() {
        for input in stream.inputs.iter() {
            graph.add_dataflow(ids[input.as_str()], ids[name.as_str()], capacity);
        }
    }

    for (name, id) in ids.iter() {
        if cfg.consumers_of(name).is_empty() {
            graph.add_output_dataflow(*id, capacity);
            debug!(stream = %name, "graph output");
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;

    #[test]
    fn unread_streams_become_outputs() {
        let raw: RawConfigFile = toml::from_str(
            r#"
            [stream.src]
            kind = "mock_producer"
            rows = 4
            columns = ["ramp"]

            [stream.split]
            kind = "splitter"
            inputs = ["src"]

            [stream.a]
            kind = "sort"
            inputs = ["split"]
            keys = [0]

            [stream.b]
            kind = "sort"
            inputs = ["split"]
            keys = [0]
            order = ["desc"]
            "#,
        )
        .unwrap();
        let cfg = ConfigFile::try_from(raw).unwrap();
        let graph = build_graph(&cfg);

        let a = graph.find_stream("a").unwrap();
        let b = graph.find_stream("b").unwrap();
        let split = graph.find_stream("split").unwrap();
        assert_eq!(graph.output_streams(), vec![a, b]);
        let targets: Vec<_> = graph
            .out_edges(split)
            .iter()
            .map(|&e| graph.edge_target(e))
            .collect();
        assert_eq!(targets, vec![a, b]);
    }
}
