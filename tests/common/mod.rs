#![allow(dead_code, unused_imports)]

pub use execstream_test_utils::{builders, drain, init_tracing, scripted};
pub use execstream_test_utils::{
    Action, Delivery, ExecLog, ScriptedStream, Step, drain_all, drain_output, new_log,
};

/// Names recorded in an execution log, in order.
pub fn executed(log: &ExecLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
