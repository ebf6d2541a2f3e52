// src/buffer.rs

//! Buffer accessors: the bounded, stateful channel on every graph edge.
//!
//! A producer writes tuples into the accessor and a consumer reads them back
//! in FIFO order. The [`BufState`] tag tells the scheduler which side has to
//! run next; it only ever changes through producer/consumer calls.

use std::collections::VecDeque;

use tracing::trace;

use crate::errors::{ExecStreamError, Result};
use crate::tuple::{Tuple, TupleDescriptor, tuple_byte_count};
use crate::types::BufProvision;

/// Default edge capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// State of a buffer accessor. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufState {
    /// No data, and the consumer has not asked for any.
    Empty,
    /// Data is queued but the producer has not asked for it to be consumed yet.
    NonEmpty,
    /// Data is queued and the producer wants the consumer to run.
    Overflow,
    /// The consumer needs data the producer has not supplied yet.
    Underflow,
    /// The producer is done for this run. Queued data may still remain.
    Eos,
}

#[derive(Debug, Clone)]
pub struct BufferAccessor {
    capacity: usize,
    queue: VecDeque<Tuple>,
    /// Write cursor: bytes produced since the buffer was last drained.
    bytes_produced: usize,
    /// Read cursor: bytes consumed since the buffer was last drained.
    bytes_consumed: usize,
    state: BufState,
    provision: BufProvision,
    tuple_desc: Option<TupleDescriptor>,
}

impl BufferAccessor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
            bytes_produced: 0,
            bytes_consumed: 0,
            state: BufState::Empty,
            provision: BufProvision::None,
            tuple_desc: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> BufState {
        self.state
    }

    pub fn provision(&self) -> BufProvision {
        self.provision
    }

    pub fn set_provision(&mut self, provision: BufProvision) {
        self.provision = provision;
    }

    /// Shape of the tuples flowing through this edge, once the producer has
    /// been prepared.
    pub fn tuple_desc(&self) -> Option<&TupleDescriptor> {
        self.tuple_desc.as_ref()
    }

    pub fn set_tuple_desc(&mut self, desc: TupleDescriptor) {
        self.tuple_desc = Some(desc);
    }

    /// Drop all queued data and go back to `Empty`. Used on restart.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.bytes_produced = 0;
        self.bytes_consumed = 0;
        self.state = BufState::Empty;
    }

    /// Mark the end of the stream. Irreversible until the next `clear`.
    pub fn mark_eos(&mut self) {
        if self.state != BufState::Eos {
            trace!(queued = self.queue.len(), "buffer marked EOS");
        }
        self.state = BufState::Eos;
    }

    pub fn is_eos(&self) -> bool {
        self.state == BufState::Eos
    }

    /// Consumer side: ask the producer for more data.
    pub fn request_production(&mut self) {
        debug_assert!(
            self.queue.is_empty(),
            "request_production with {} tuples still queued",
            self.queue.len()
        );
        if self.state != BufState::Eos {
            self.state = BufState::Underflow;
        }
    }

    /// Producer side: tell the consumer that queued data is ready.
    pub fn request_consumption(&mut self) {
        if self.state != BufState::Eos && !self.queue.is_empty() {
            self.state = BufState::Overflow;
        }
    }

    /// Remaining production space in bytes.
    pub fn production_available(&self) -> usize {
        self.capacity - self.bytes_produced
    }

    /// Write cursor (bytes already produced into the current fill).
    pub fn production_start(&self) -> usize {
        self.bytes_produced
    }

    /// Append one tuple. Returns `false` when it does not fit.
    pub fn produce_tuple(&mut self, tuple: Tuple) -> bool {
        assert!(
            self.state != BufState::Eos,
            "produce_tuple on a buffer already marked EOS"
        );
        let size = tuple_byte_count(&tuple);
        if size > self.production_available() {
            return false;
        }
        self.push(tuple, size);
        true
    }

    /// Bulk append. The whole batch must fit.
    pub fn produce_data(&mut self, tuples: Vec<Tuple>) -> Result<()> {
        assert!(
            self.state != BufState::Eos,
            "produce_data on a buffer already marked EOS"
        );
        let needed: usize = tuples.iter().map(|t| tuple_byte_count(t)).sum();
        let available = self.production_available();
        if needed > available {
            return Err(ExecStreamError::BufferCapacity { needed, available });
        }
        for tuple in tuples {
            let size = tuple_byte_count(&tuple);
            self.push(tuple, size);
        }
        Ok(())
    }

    fn push(&mut self, tuple: Tuple, size: usize) {
        self.queue.push_back(tuple);
        self.bytes_produced += size;
        if matches!(self.state, BufState::Empty | BufState::Underflow) {
            self.state = BufState::NonEmpty;
        }
    }

    pub fn consumption_tuples_available(&self) -> usize {
        self.queue.len()
    }

    pub fn is_consumption_possible(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn peek_tuple(&self) -> Option<&Tuple> {
        self.queue.front()
    }

    /// Take the next queued tuple.
    pub fn consume_tuple(&mut self) -> Option<Tuple> {
        let tuple = self.queue.pop_front()?;
        self.bytes_consumed += tuple_byte_count(&tuple);
        if self.queue.is_empty() {
            self.on_drained();
        }
        Some(tuple)
    }

    /// Take every queued tuple.
    pub fn consume_all(&mut self) -> Vec<Tuple> {
        let tuples: Vec<Tuple> = self.queue.drain(..).collect();
        if !tuples.is_empty() {
            self.on_drained();
        }
        tuples
    }

    /// Production space is only reclaimed once the consumer caught up.
    fn on_drained(&mut self) {
        self.bytes_produced = 0;
        self.bytes_consumed = 0;
        if matches!(self.state, BufState::NonEmpty | BufState::Overflow) {
            self.state = BufState::Empty;
        }
    }
}
