// tests/bitmap_search.rs
//
// Loads a three-column table through
// producer → splitter → cluster appends → barrier → bitmap generator → sort → splicer
// and then queries the resulting index with bitmap searches.

mod common;
use crate::common::builders::{IndexedTable, load_graph, shutdown, start};
use crate::common::drain::rows;
use crate::common::{drain_output, init_tracing};

use execstream::operators::{BitmapEntry, BitmapSearchParams, BitmapSearchStream, ValuesStream};
use execstream::tuple::{AttributeDescriptor, Datum, Tuple, TupleDescriptor, int_tuple};
use execstream::{
    DynamicParamId, ExecStreamError, ExecStreamScheduler, Quantum, StreamGraph, StreamId,
};

const ROWS: u64 = 100;
const REPEATS: [i64; 3] = [1, 5, 9];
/// Distinct `(c1, c2)` combinations: lcm(5, 9).
const COMBOS: u64 = 45;

fn loaded_table(capacity: usize, quantum: Quantum) -> IndexedTable {
    let table = IndexedTable::new(REPEATS.len());
    let (graph, splicer) = load_graph(&table, ROWS, &REPEATS, capacity);
    let mut scheduler = start(graph, quantum);
    let out = rows(&drain_output(&mut scheduler, splicer).unwrap());
    assert_eq!(out, vec![int_tuple(&[ROWS as i64])]);
    shutdown(scheduler);
    table
}

/// `values(keys) → search → output`.
fn search_graph(
    table: &IndexedTable,
    desc: TupleDescriptor,
    keys: Vec<Tuple>,
    key_params: Vec<Option<DynamicParamId>>,
) -> (StreamGraph, StreamId) {
    let mut graph = StreamGraph::new();
    let values = graph.add_stream("keys", Box::new(ValuesStream::new(desc, keys)));
    let search = graph.add_stream(
        "search",
        Box::new(BitmapSearchStream::new(BitmapSearchParams {
            index: table.index.clone(),
            key_params,
        })),
    );
    graph.add_dataflow(values, search, 256);
    graph.add_output_dataflow(search, 256);
    (graph, search)
}

fn found_rids(tuples: Vec<Tuple>) -> Vec<u64> {
    let mut rids: Vec<u64> = tuples
        .into_iter()
        .map(|t| BitmapEntry::from_tuple(t).expect("malformed entry"))
        .flat_map(|e| e.rids().collect::<Vec<_>>())
        .collect();
    rids.sort_unstable();
    rids
}

fn search_rids(table: &IndexedTable, keys: &[i64]) -> Vec<u64> {
    let (graph, search) = search_graph(
        table,
        TupleDescriptor::int64s(keys.len()),
        vec![int_tuple(keys)],
        vec![],
    );
    let mut scheduler = start(graph, Quantum::default());
    let found = rows(&drain_output(&mut scheduler, search).unwrap());
    shutdown(scheduler);
    found_rids(found)
}

fn rids_matching(pred: impl Fn(u64) -> bool) -> Vec<u64> {
    (0..ROWS).filter(|&r| pred(r)).collect()
}

#[test]
fn load_fills_every_cluster_and_the_index() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());

    let store = table.store.lock().unwrap();
    for cluster in 0..REPEATS.len() {
        assert_eq!(store.cluster_len(cluster), ROWS as usize);
    }
    assert_eq!(store.value(1, 7, 0), Some(&Datum::Int(2)));
    assert_eq!(store.value(2, 7, 0), Some(&Datum::Int(7)));

    // No two rids of one combination share an 8-rid segment.
    assert_eq!(table.index.lock().unwrap().len(), ROWS as usize);
}

#[test]
fn every_combination_finds_its_rids() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());

    for i in 0..COMBOS {
        let keys = [0, (i % 5) as i64, (i % 9) as i64];
        assert_eq!(
            search_rids(&table, &keys),
            rids_matching(|r| r % COMBOS == i),
            "keys {keys:?}"
        );
    }
}

#[test]
fn prefix_search_matches_leading_keys_only() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());

    assert_eq!(search_rids(&table, &[0, 2]), rids_matching(|r| r % 5 == 2));
    assert_eq!(search_rids(&table, &[0]), rids_matching(|_| true));
}

#[test]
fn unmatched_keys_return_nothing() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());

    assert!(search_rids(&table, &[0, 7, 3]).is_empty());
    assert!(search_rids(&table, &[1, 0, 0]).is_empty());
}

#[test]
fn tight_buffers_and_small_quantum_load_the_same_index() {
    init_tracing();
    let roomy = loaded_table(4096, Quantum::default());
    let tight = loaded_table(64, Quantum::new(3));

    let roomy_index = roomy.index.lock().unwrap();
    let tight_index = tight.index.lock().unwrap();
    assert_eq!(tight_index.len(), roomy_index.len());
    assert_eq!(
        tight_index.search(&[Datum::Int(0)]),
        roomy_index.search(&[Datum::Int(0)])
    );
}

#[test]
fn null_keys_are_filled_from_dynamic_parameters() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());
    let (p1, p2) = (DynamicParamId(1), DynamicParamId(2));

    let desc = TupleDescriptor::new(vec![
        AttributeDescriptor::int64(),
        AttributeDescriptor::nullable_int64(),
        AttributeDescriptor::nullable_int64(),
    ]);
    let (mut graph, search) = search_graph(
        &table,
        desc,
        vec![vec![Datum::Int(0), Datum::Null, Datum::Null]],
        vec![None, Some(p1), Some(p2)],
    );
    graph.dynamic_params_mut().declare(p1, Datum::Int(3));
    graph.dynamic_params_mut().declare(p2, Datum::Int(4));
    let mut scheduler = start(graph, Quantum::default());

    let found = found_rids(rows(&drain_output(&mut scheduler, search).unwrap()));
    assert_eq!(found, vec![13, 58]);

    // New parameter values take effect on the next run.
    let params = scheduler.graph_mut().dynamic_params_mut();
    params.set(p1, Datum::Int(0)).unwrap();
    params.set(p2, Datum::Int(0)).unwrap();
    scheduler.restart_stream(search).unwrap();
    let found = found_rids(rows(&drain_output(&mut scheduler, search).unwrap()));
    assert_eq!(found, vec![0, 45, 90]);
    shutdown(scheduler);
}

#[test]
fn undeclared_parameter_fails_the_read() {
    init_tracing();
    let table = loaded_table(4096, Quantum::default());

    let desc = TupleDescriptor::new(vec![AttributeDescriptor::nullable_int64()]);
    let (graph, search) = search_graph(
        &table,
        desc,
        vec![vec![Datum::Null]],
        vec![Some(DynamicParamId(9))],
    );
    let mut scheduler = start(graph, Quantum::default());

    match drain_output(&mut scheduler, search) {
        Err(ExecStreamError::DynamicParam(9)) => {}
        Err(e) => panic!("Expected DynamicParam error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    shutdown(scheduler);
}
