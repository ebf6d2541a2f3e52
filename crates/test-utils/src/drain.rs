//! Reading graph outputs to completion.

use std::collections::{BTreeMap, BTreeSet};

use execstream::errors::Result;
use execstream::tuple::Tuple;
use execstream::{BufState, ExecStreamScheduler, StreamId};

/// Upper bound on `read_stream` calls before a test gives up.
const MAX_READS: usize = 100_000;

/// What one `read_stream` call handed back.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Buffer state as returned, before draining.
    pub state: BufState,
    pub tuples: Vec<Tuple>,
}

/// Call `read_stream` on `output` until its buffer comes back at EOS,
/// draining each delivery.
///
/// Only for graphs with a single output: a delivery from any other output
/// fails the test.
pub fn drain_output<S: ExecStreamScheduler>(
    scheduler: &mut S,
    output: StreamId,
) -> Result<Vec<Delivery>> {
    let mut all = drain_all(scheduler, &[output])?;
    if let Some(other) = all.keys().find(|&&id| id != output) {
        panic!("reading {output} delivered output {other}; use drain_all");
    }
    Ok(all.remove(&output).unwrap_or_default())
}

/// Read every output in `outputs` to EOS, in order, attributing each
/// delivery to the output it actually came from.
pub fn drain_all<S: ExecStreamScheduler>(
    scheduler: &mut S,
    outputs: &[StreamId],
) -> Result<BTreeMap<StreamId, Vec<Delivery>>> {
    let mut deliveries: BTreeMap<StreamId, Vec<Delivery>> = BTreeMap::new();
    let mut finished = BTreeSet::new();
    let mut reads = 0usize;

    for &target in outputs {
        while !finished.contains(&target) {
            reads += 1;
            assert!(reads <= MAX_READS, "outputs did not reach EOS within {MAX_READS} reads");

            let buf = scheduler.read_stream(target)?;
            let state = buf.state();
            let tuples = buf.consume_all();
            let from = scheduler
                .last_delivered()
                .expect("read_stream succeeded without a delivered output");
            if state == BufState::Eos && !finished.insert(from) {
                // Already complete; an exhausted output can be revisited.
                continue;
            }
            deliveries.entry(from).or_default().push(Delivery { state, tuples });
        }
    }
    Ok(deliveries)
}

/// All tuples of a drained output, in delivery order.
pub fn rows(deliveries: &[Delivery]) -> Vec<Tuple> {
    deliveries
        .iter()
        .flat_map(|d| d.tuples.iter().cloned())
        .collect()
}
