// src/operators/generators.rs

//! Synthetic value generators for [`MockProducerStream`].
//!
//! [`MockProducerStream`]: crate::operators::mock_producer::MockProducerStream

use std::fmt;

/// Produces the value of column `col` in row `row`.
///
/// Called once per column, in column order, for every row.
pub trait RowGenerator: Send + fmt::Debug {
    fn generate_value(&mut self, row: u64, col: usize) -> i64;

    /// Rewind to row 0. Called on every open.
    fn reset(&mut self) {}
}

/// Every column carries `row + offset`.
#[derive(Debug, Clone, Default)]
pub struct RampGenerator {
    offset: i64,
}

impl RampGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: i64) -> Self {
        Self { offset }
    }
}

impl RowGenerator for RampGenerator {
    fn generate_value(&mut self, row: u64, _col: usize) -> i64 {
        row as i64 + self.offset
    }
}

/// A stateful source for one column.
pub trait ColumnGenerator: Send + fmt::Debug {
    fn next_value(&mut self) -> i64;
    fn reset(&mut self);
}

/// `start, start + step, start + 2 * step, ...`
#[derive(Debug, Clone)]
pub struct SeqColumnGenerator {
    start: i64,
    step: i64,
    next: i64,
}

impl SeqColumnGenerator {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            start,
            step,
            next: start,
        }
    }
}

impl ColumnGenerator for SeqColumnGenerator {
    fn next_value(&mut self) -> i64 {
        let value = self.next;
        self.next += self.step;
        value
    }

    fn reset(&mut self) {
        self.next = self.start;
    }
}

/// `0, 1, ..., n - 1, 0, 1, ...`
#[derive(Debug, Clone)]
pub struct RepeatingSeqColumnGenerator {
    n: i64,
    next: i64,
}

impl RepeatingSeqColumnGenerator {
    pub fn new(n: i64) -> Self {
        Self { n: n.max(1), next: 0 }
    }
}

impl ColumnGenerator for RepeatingSeqColumnGenerator {
    fn next_value(&mut self) -> i64 {
        let value = self.next;
        self.next = (self.next + 1) % self.n;
        value
    }

    fn reset(&mut self) {
        self.next = 0;
    }
}

#[derive(Debug, Clone)]
pub struct ConstColumnGenerator {
    value: i64,
}

impl ConstColumnGenerator {
    pub fn new(value: i64) -> Self {
        Self { value }
    }
}

impl ColumnGenerator for ConstColumnGenerator {
    fn next_value(&mut self) -> i64 {
        self.value
    }

    fn reset(&mut self) {}
}

/// One [`ColumnGenerator`] per column.
#[derive(Debug, Default)]
pub struct CompositeGenerator {
    columns: Vec<Box<dyn ColumnGenerator>>,
}

impl CompositeGenerator {
    pub fn new(columns: Vec<Box<dyn ColumnGenerator>>) -> Self {
        Self { columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl RowGenerator for CompositeGenerator {
    fn generate_value(&mut self, _row: u64, col: usize) -> i64 {
        self.columns[col].next_value()
    }

    fn reset(&mut self) {
        for column in &mut self.columns {
            column.reset();
        }
    }
}
