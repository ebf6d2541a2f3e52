// src/stream/confluence.rs

//! Validation shared by streams with several inputs and one output.

use crate::errors::{ExecStreamError, Result};
use crate::stream::StreamIo;
use crate::tuple::TupleDescriptor;
use crate::types::BufProvision;

/// Input-side checks for fan-in streams.
pub struct Confluence;

impl Confluence {
    /// Every input must exist, carry the expected provision and a tuple shape.
    ///
    /// Returns the input descriptors in input order.
    pub fn prepare_inputs(
        io: &StreamIo<'_>,
        provision: BufProvision,
    ) -> Result<Vec<TupleDescriptor>> {
        if io.input_count() == 0 {
            return Err(ExecStreamError::prepare(
                io.name(),
                "confluence stream has no inputs",
            ));
        }
        let mut descs = Vec::with_capacity(io.input_count());
        for i in 0..io.input_count() {
            let input = io.input(i);
            if input.provision() != provision {
                return Err(ExecStreamError::prepare(
                    io.name(),
                    format!(
                        "input {i} has provision {:?}, expected {provision:?}",
                        input.provision()
                    ),
                ));
            }
            let desc = input.tuple_desc().cloned().ok_or_else(|| {
                ExecStreamError::prepare(io.name(), format!("input {i} has no tuple descriptor"))
            })?;
            descs.push(desc);
        }
        Ok(descs)
    }

    /// All inputs must share one shape (UNION ALL style streams).
    pub fn common_desc(io: &StreamIo<'_>, descs: &[TupleDescriptor]) -> Result<TupleDescriptor> {
        let first = descs[0].clone();
        if let Some(i) = descs.iter().position(|d| d.len() != first.len()) {
            return Err(ExecStreamError::prepare(
                io.name(),
                format!(
                    "input {i} has {} columns, input 0 has {}",
                    descs[i].len(),
                    first.len()
                ),
            ));
        }
        Ok(first)
    }
}
