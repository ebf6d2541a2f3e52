// src/stream/conduit.rs

//! Buffer-state checks shared by one-input, one-output streams.

use crate::buffer::{BufState, BufferAccessor};
use crate::types::ExecResult;

/// Standard entry check for a conduit.
///
/// Returns `None` when the stream can make progress (input has data and the
/// output has been drained), or the result to report right away otherwise.
/// An exhausted input is propagated by marking the output EOS.
pub fn precheck_conduit(
    input: &mut BufferAccessor,
    output: &mut BufferAccessor,
) -> Option<ExecResult> {
    match output.state() {
        BufState::Eos => return Some(ExecResult::EndOfStream),
        BufState::Overflow => return Some(ExecResult::BufferOverflow),
        _ => {}
    }
    if input.is_consumption_possible() {
        return None;
    }
    Some(match input.state() {
        BufState::Eos => {
            output.mark_eos();
            ExecResult::EndOfStream
        }
        BufState::Underflow => ExecResult::BufferUnderflow,
        _ => {
            input.request_production();
            ExecResult::BufferUnderflow
        }
    })
}

/// Result for a conduit whose input ran dry during this call.
///
/// Anything already produced is handed downstream first; the input is
/// requested on the next call.
pub fn input_drained(input: &mut BufferAccessor, output: &mut BufferAccessor) -> ExecResult {
    if output.is_consumption_possible() {
        output.request_consumption();
        return ExecResult::BufferOverflow;
    }
    if input.is_eos() {
        output.mark_eos();
        return ExecResult::EndOfStream;
    }
    input.request_production();
    ExecResult::BufferUnderflow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::int_tuple;

    #[test]
    fn empty_input_requests_production() {
        let mut input = BufferAccessor::new(64);
        let mut output = BufferAccessor::new(64);
        assert_eq!(
            precheck_conduit(&mut input, &mut output),
            Some(ExecResult::BufferUnderflow)
        );
        assert_eq!(input.state(), BufState::Underflow);
    }

    #[test]
    fn exhausted_input_propagates_eos() {
        let mut input = BufferAccessor::new(64);
        let mut output = BufferAccessor::new(64);
        input.mark_eos();
        assert_eq!(
            precheck_conduit(&mut input, &mut output),
            Some(ExecResult::EndOfStream)
        );
        assert!(output.is_eos());
    }

    #[test]
    fn eos_input_with_data_still_proceeds() {
        let mut input = BufferAccessor::new(64);
        let mut output = BufferAccessor::new(64);
        input.produce_tuple(int_tuple(&[1]));
        input.mark_eos();
        assert_eq!(precheck_conduit(&mut input, &mut output), None);
    }

    #[test]
    fn undrained_output_blocks_before_input_is_touched() {
        let mut input = BufferAccessor::new(64);
        let mut output = BufferAccessor::new(64);
        output.produce_tuple(int_tuple(&[1]));
        output.request_consumption();
        assert_eq!(
            precheck_conduit(&mut input, &mut output),
            Some(ExecResult::BufferOverflow)
        );
        assert_eq!(input.state(), BufState::Empty);
    }

    #[test]
    fn drained_input_prefers_handing_off_output() {
        let mut input = BufferAccessor::new(64);
        let mut output = BufferAccessor::new(64);
        output.produce_tuple(int_tuple(&[1]));
        assert_eq!(
            input_drained(&mut input, &mut output),
            ExecResult::BufferOverflow
        );
        assert_eq!(output.state(), BufState::Overflow);
        assert_eq!(input.state(), BufState::Empty);

        output.consume_all();
        assert_eq!(
            input_drained(&mut input, &mut output),
            ExecResult::BufferUnderflow
        );
        assert_eq!(input.state(), BufState::Underflow);
    }
}
