// src/graph/params.rs

//! Dynamic parameters: a per-graph id → value side-channel operators can
//! read and write while executing.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tracing::trace;

use crate::errors::{ExecStreamError, Result};
use crate::tuple::Datum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct DynamicParamId(pub u32);

impl fmt::Display for DynamicParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DynamicParams {
    values: BTreeMap<DynamicParamId, Datum>,
}

impl DynamicParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) a parameter with an initial value.
    pub fn declare(&mut self, id: DynamicParamId, initial: Datum) {
        trace!(param = %id, ?initial, "declared dynamic parameter");
        self.values.insert(id, initial);
    }

    /// Overwrite a declared parameter.
    pub fn set(&mut self, id: DynamicParamId, value: Datum) -> Result<()> {
        let slot = self
            .values
            .get_mut(&id)
            .ok_or(ExecStreamError::DynamicParam(id.0))?;
        *slot = value;
        Ok(())
    }

    pub fn get(&self, id: DynamicParamId) -> Result<&Datum> {
        self.values
            .get(&id)
            .ok_or(ExecStreamError::DynamicParam(id.0))
    }

    pub fn contains(&self, id: DynamicParamId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn remove(&mut self, id: DynamicParamId) -> Option<Datum> {
        self.values.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
