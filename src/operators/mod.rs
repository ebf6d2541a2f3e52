// src/operators/mod.rs

//! Operator library.
//!
//! General purpose streams:
//! - [`mock_producer`] / [`generators`]: synthetic rows,
//! - [`values`]: a fixed tuple list,
//! - [`splitter`], [`merge`], [`barrier`]: fan-out and fan-in,
//! - [`sort`]: in-memory sort.
//!
//! Loading and searching an in-memory clustered table with a bitmap index:
//! [`cluster_append`], [`bitmap_generator`], [`bitmap_splicer`] and
//! [`bitmap_search`], on top of [`storage`] and [`bitmap`].

pub mod barrier;
pub mod bitmap;
pub mod bitmap_generator;
pub mod bitmap_search;
pub mod bitmap_splicer;
pub mod cluster_append;
pub mod generators;
pub mod merge;
pub mod mock_producer;
pub mod sort;
pub mod splitter;
pub mod storage;
pub mod values;

pub use barrier::{BarrierMode, BarrierParams, BarrierStream};
pub use bitmap::{BitmapEntry, BitmapIndex, SharedBitmapIndex};
pub use bitmap_generator::{BitmapGeneratorParams, BitmapGeneratorStream};
pub use bitmap_search::{BitmapSearchParams, BitmapSearchStream};
pub use bitmap_splicer::BitmapSplicerStream;
pub use cluster_append::{ClusterAppendParams, ClusterAppendStream};
pub use merge::MergeStream;
pub use mock_producer::{MockProducerParams, MockProducerStream};
pub use sort::{SortParams, SortStream};
pub use splitter::SplitterStream;
pub use storage::{ColumnStore, SharedColumnStore};
pub use values::ValuesStream;
