//! deno_core op definitions for the playground sandbox.
//!
//! The `#[op2]` macro generates additional public items (v8 function
//! pointers, metadata structs) that cannot carry doc comments. We suppress
//! `missing_docs` at the module level — all actual functions and types are
//! documented below.
#![allow(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use deno_core::{op2, OpState};
use deno_error::JsErrorBox;

use crate::capture::op_playground_console;
use crate::{SubscriptionDispatcher, SubscriptionOp};

/// Wrapper for the execution result envelope stored in OpState.
pub struct ExecutionResult(pub String);

/// Store the execution result envelope.
#[op2(fast)]
pub fn op_playground_set_result(state: &mut OpState, #[string] json: &str) {
    state.put(ExecutionResult(json.to_string()));
}

/// Dispatch one approved subscription operation.
///
/// Returns an envelope string: `{"ok": <result>}` on success, or
/// `{"error": {"message", "code"}}` when the dispatcher fails. The bootstrap
/// rethrows the latter as an `Error` carrying the code, so snippet `catch`
/// blocks and the error normalizer see a structured failure instead of a
/// bare rejection message.
#[op2]
#[string]
pub async fn op_playground_call(
    op_state: Rc<RefCell<OpState>>,
    #[string] method: String,
    #[string] options_json: String,
) -> Result<String, JsErrorBox> {
    tracing::debug!(
        method = %method,
        options_len = options_json.len(),
        "subscription call dispatched"
    );

    let op = SubscriptionOp::from_method_name(&method)
        .ok_or_else(|| JsErrorBox::generic(format!("unknown subscription method: {method}")))?;

    let dispatcher = {
        let state = op_state.borrow();
        state.borrow::<Arc<dyn SubscriptionDispatcher>>().clone()
    };

    let options: serde_json::Value = serde_json::from_str(&options_json)
        .map_err(|e| JsErrorBox::generic(format!("invalid JSON options: {e}")))?;

    let envelope = match dispatcher.dispatch(op, options).await {
        Ok(value) => serde_json::json!({ "ok": value }),
        Err(error) => {
            tracing::warn!(method = %method, error = %error, "subscription call failed");
            serde_json::json!({
                "error": { "message": error.to_string(), "code": error.code() }
            })
        }
    };

    serde_json::to_string(&envelope)
        .map_err(|e| JsErrorBox::generic(format!("result serialization failed: {e}")))
}

deno_core::extension!(
    playground_ext,
    ops = [
        op_playground_console,
        op_playground_set_result,
        op_playground_call
    ],
);
