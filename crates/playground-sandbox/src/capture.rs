//! Scoped capture of the sandbox console.
//!
//! Snippet code logs through the usual `console` channels. For the duration
//! of one execution those channels are swapped for interceptors (installed
//! by the bootstrap, engaged and restored by the execution wrapper) that
//! push every line through [`op_playground_console`]. The op records the
//! line, in call order, into [`ConsoleLog`] and forwards it to the host
//! logger so capture never swallows host-level logging. The runner drains
//! the buffer on every exit path.
//!
//! The `#[op2]` macro generates additional public items that cannot carry
//! doc comments, so `missing_docs` is suppressed at the module level.
#![allow(missing_docs)]

use deno_core::{op2, OpState};

/// Ordered log captured during a single execution. Lives in the runtime's
/// `OpState`.
#[derive(Debug, Default)]
pub struct ConsoleLog(pub Vec<String>);

/// Receive one console line from the sandbox.
///
/// The message arrives pre-joined (object arguments JSON-stringified on the
/// JavaScript side); this op prefixes the severity tag and records the line.
#[op2(fast)]
pub fn op_playground_console(state: &mut OpState, #[string] level: &str, #[string] message: &str) {
    match level {
        "ERROR" => tracing::error!(target: "playground::sandbox::js", "{}", message),
        "WARN" => tracing::warn!(target: "playground::sandbox::js", "{}", message),
        _ => tracing::info!(target: "playground::sandbox::js", "{}", message),
    }
    let line = format!("[{level}] {message}");
    state.borrow_mut::<ConsoleLog>().0.push(line);
}

/// Remove and return the captured log from a runtime's `OpState`.
pub(crate) fn drain(state: &mut OpState) -> Vec<String> {
    state
        .try_take::<ConsoleLog>()
        .map(|log| log.0)
        .unwrap_or_default()
}
