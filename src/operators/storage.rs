// src/operators/storage.rs

//! In-memory clustered column store shared by append and bitmap streams.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{ExecStreamError, Result};
use crate::tuple::{Datum, Tuple, TupleDescriptor};

pub type SharedColumnStore = Arc<Mutex<ColumnStore>>;

/// Lock shared storage on behalf of `stream`.
pub(crate) fn lock<'a, T>(shared: &'a Mutex<T>, stream: &str) -> Result<MutexGuard<'a, T>> {
    shared
        .lock()
        .map_err(|_| ExecStreamError::operator(stream, "shared storage lock poisoned"))
}

#[derive(Debug, Clone)]
struct Cluster {
    desc: TupleDescriptor,
    rows: Vec<Tuple>,
}

/// A table split column-wise into clusters. All clusters share one rid space:
/// rid `r` of every cluster belongs to the same logical row.
#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    clusters: Vec<Cluster>,
}

impl ColumnStore {
    pub fn new(cluster_descs: Vec<TupleDescriptor>) -> Self {
        Self {
            clusters: cluster_descs
                .into_iter()
                .map(|desc| Cluster {
                    desc,
                    rows: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn shared(self) -> SharedColumnStore {
        Arc::new(Mutex::new(self))
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster_desc(&self, cluster: usize) -> Option<&TupleDescriptor> {
        self.clusters.get(cluster).map(|c| &c.desc)
    }

    pub fn cluster_len(&self, cluster: usize) -> usize {
        self.clusters.get(cluster).map_or(0, |c| c.rows.len())
    }

    /// Append a row to one cluster and return its rid.
    pub fn append(&mut self, cluster: usize, row: Tuple) -> u64 {
        let c = &mut self.clusters[cluster];
        debug_assert_eq!(row.len(), c.desc.len());
        c.rows.push(row);
        (c.rows.len() - 1) as u64
    }

    pub fn value(&self, cluster: usize, rid: u64, column: usize) -> Option<&Datum> {
        self.clusters
            .get(cluster)?
            .rows
            .get(rid as usize)?
            .get(column)
    }
}
