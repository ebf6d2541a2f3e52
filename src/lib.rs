// src/lib.rs

pub mod buffer;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod operators;
pub mod scheduler;
pub mod stream;
pub mod tuple;
pub mod types;

pub use buffer::{BufState, BufferAccessor};
pub use errors::ExecStreamError;
pub use graph::{DynamicParamId, DynamicParams, StreamGraph, StreamState};
pub use scheduler::{AbortHandle, DfsScheduler, ExecStreamScheduler};
pub use stream::{ExecStream, StreamIo};
pub use types::{BufProvision, EdgeId, ExecResult, Quantum, StreamId};

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::config::{build_graph, load_and_validate};
use crate::tuple::format_tuple;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and graph construction
/// - prepare / open of every stream
/// - the DFS scheduler, draining every graph output
/// - Ctrl-C handling through the abort handle
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg, &build_graph(&cfg));
        return Ok(());
    }

    let mut graph = build_graph(&cfg);
    graph.prepare()?;
    graph.open()?;

    let quantum = args
        .quantum
        .or(cfg.scheduler.quantum)
        .map(Quantum::new)
        .unwrap_or_default();
    let mut scheduler = DfsScheduler::with_quantum(quantum);
    scheduler.add_graph(graph);
    scheduler.start();

    // Ctrl-C → cooperative abort.
    {
        let abort = scheduler.abort_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received, aborting");
            abort.abort();
        });
    }

    // The traversal is synchronous and may run for a long time.
    let (mut scheduler, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = drain_outputs(&mut scheduler);
        (scheduler, outcome)
    })
    .await?;

    scheduler.stop();
    let mut graph = scheduler.remove_graph();
    graph.close();
    outcome?;
    Ok(())
}

/// Read every graph output to EOS, printing tuples to stdout.
///
/// A read may hand back another output's buffer, so every delivery is
/// printed under the output it came from.
fn drain_outputs(scheduler: &mut DfsScheduler) -> errors::Result<()> {
    let outputs = scheduler.graph().output_streams();
    let mut rows: BTreeMap<StreamId, u64> = BTreeMap::new();
    let mut finished: BTreeSet<StreamId> = BTreeSet::new();

    for &target in &outputs {
        while !finished.contains(&target) {
            let buf = scheduler.read_stream(target)?;
            let eos = buf.is_eos();
            let tuples = buf.consume_all();
            let Some(from) = scheduler.last_delivered() else {
                break;
            };
            let name = scheduler.graph().stream_name(from);
            for tuple in &tuples {
                println!("{name}: {}", format_tuple(tuple));
            }
            *rows.entry(from).or_default() += tuples.len() as u64;
            if eos && finished.insert(from) {
                info!(stream = %name, rows = rows[&from], "output drained");
            }
        }
    }
    Ok(())
}

/// Print streams, their kinds and the edges of the built graph.
fn print_dry_run(cfg: &ConfigFile, graph: &StreamGraph) {
    println!("execstream dry-run");
    match cfg.scheduler.quantum {
        Some(q) => println!("  scheduler.quantum = {q}"),
        None => println!("  scheduler.quantum = unlimited"),
    }
    println!(
        "  scheduler.buffer_capacity = {}",
        cfg.scheduler.buffer_capacity
    );
    println!();

    println!("streams ({}):", cfg.stream.len());
    for (name, stream) in cfg.stream.iter() {
        println!("  - {name} ({})", stream.kind.name());
        if !stream.inputs.is_empty() {
            println!("      inputs: {:?}", stream.inputs);
        }
    }
    println!();

    println!("edges:");
    for edge in graph.edges() {
        let source = graph.stream_name(graph.edge_source(edge));
        let target = graph.edge_target(edge);
        if graph.is_sink(target) {
            println!("  {source} -> <output>");
        } else {
            println!("  {source} -> {}", graph.stream_name(target));
        }
    }

    debug!("dry-run complete (no execution)");
}
