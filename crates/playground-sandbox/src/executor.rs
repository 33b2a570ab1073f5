//! Sandboxed runner — validates and executes playground snippets.
//!
//! Each execution gets a brand new runtime. No state leaks between
//! submissions.
//!
//! V8 isolates are `!Send`, so all `JsRuntime` operations run on a dedicated
//! thread with its own single-threaded tokio runtime. The public API is
//! fully async and `Send`-safe.

use std::sync::Arc;

use deno_core::{JsRuntime, PollEventLoopOptions, RuntimeOptions};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::capture;
use crate::error::{ErrorDetails, SandboxError};
use crate::ops::{playground_ext, ExecutionResult};
use crate::policy::WhitelistPolicy;
use crate::sanitize::presanitize;
use crate::validator::{validate, ValidationDiagnostic};
use crate::SubscriptionDispatcher;

/// Named values injected into the snippet's scope, in parameter order.
///
/// The generated callable's parameter list is exactly this set; the matching
/// arguments are the frozen globals of the same name built by the bootstrap.
const SNIPPET_CONTEXT: &[&str] = &["base"];

/// Configuration for the sandbox runner.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Maximum size of submitted code in bytes.
    pub max_code_size: usize,
    /// Include stack traces in normalized runtime errors.
    pub capture_stack: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_code_size: 64 * 1024, // 64 KB
            capture_stack: cfg!(debug_assertions),
        }
    }
}

/// Terminal result of one executed snippet: the resolved value or the
/// failure as data, plus everything the snippet logged while running.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Resolved return value, or the normalized error.
    pub result: Result<Value, ErrorDetails>,
    /// Console lines captured during the attempt, in call order.
    pub log: Vec<String>,
}

/// What the full pipeline produced for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The validator rejected the code; nothing was executed.
    Rejected {
        /// All violations found, in discovery order.
        diagnostics: Vec<ValidationDiagnostic>,
    },
    /// The code was accepted and executed once.
    Executed(ExecutionOutcome),
}

/// The sandboxed runner. Creates a fresh V8 isolate per execution and
/// serializes submissions — one at a time, each with its own log buffer.
pub struct SandboxRunner {
    config: SandboxConfig,
    gate: Arc<Semaphore>,
}

impl SandboxRunner {
    /// Create a runner with the given configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Run the full pipeline on raw submitted code: size check →
    /// pre-sanitize → validate → execute.
    ///
    /// Validation failures come back as data ([`SubmissionOutcome::Rejected`]);
    /// `Err` is reserved for the sandbox machinery itself.
    pub async fn execute(
        &self,
        raw_code: &str,
        dispatcher: Arc<dyn SubscriptionDispatcher>,
    ) -> Result<SubmissionOutcome, SandboxError> {
        tracing::info!(code_len = raw_code.len(), "execute: starting");

        if raw_code.len() > self.config.max_code_size {
            return Err(SandboxError::CodeTooLarge {
                max: self.config.max_code_size,
                actual: raw_code.len(),
            });
        }

        let presanitized = presanitize(raw_code);
        let outcome = validate(&presanitized, WhitelistPolicy::shared());
        if !outcome.accepted {
            tracing::info!(
                diagnostics = outcome.diagnostics.len(),
                "execute: rejected by validator"
            );
            return Ok(SubmissionOutcome::Rejected {
                diagnostics: outcome.diagnostics,
            });
        }

        let executed = self.run(&outcome.sanitized_code, dispatcher).await?;
        match &executed.result {
            Ok(_) => tracing::info!("execute: complete"),
            Err(error) => tracing::warn!(error = %error.message, "execute: snippet failed"),
        }
        Ok(SubmissionOutcome::Executed(executed))
    }

    /// Execute already-validated code once and capture its outcome.
    ///
    /// The log is present on every path, and the console channels are
    /// restored before this returns regardless of how the snippet ended.
    /// There are no retries and no internal deadline — a caller that needs a
    /// timeout must impose one externally, and a runaway synchronous loop
    /// inside the snippet cannot be reclaimed by such a timeout.
    pub async fn run(
        &self,
        sanitized_code: &str,
        dispatcher: Arc<dyn SubscriptionDispatcher>,
    ) -> Result<ExecutionOutcome, SandboxError> {
        // One submission at a time: the console capture model assumes a
        // single active capture scope.
        let _permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::Execution(anyhow::anyhow!("runner gate closed")))?;

        let code = sanitized_code.to_string();
        let config = self.config.clone();

        // V8 isolates are !Send — run everything on a dedicated thread
        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    if tx.send(Err(SandboxError::Execution(e.into()))).is_err() {
                        tracing::warn!("sandbox result receiver dropped");
                    }
                    return;
                }
            };
            let result = rt.block_on(run_snippet(&config, &code, dispatcher));
            if tx.send(result).is_err() {
                tracing::warn!("sandbox result receiver dropped before result was sent");
            }
        });

        rx.await
            .map_err(|_| SandboxError::Execution(anyhow::anyhow!("sandbox thread panicked")))?
    }
}

impl Default for SandboxRunner {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

/// Result envelope written by the execution wrapper.
#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<ErrorDetails>,
}

/// Bootstrap: capture the ops in closures, build the frozen approved
/// namespace and the console-capture installer, then remove dangerous
/// globals.
///
/// The validator already rejects `eval`/`Function` statically; an accepted
/// snippet still runs with those primitives removed so a validator gap
/// cannot become code generation inside the isolate.
const BOOTSTRAP: &str = r#"
((ops) => {
    const callOp = (method, optionsJson) => ops.op_playground_call(method, optionsJson);
    const consoleOp = (level, message) => ops.op_playground_console(level, message);
    const setResult = (json) => ops.op_playground_set_result(json);

    const call = async (method, options) => {
        const raw = await callOp(method, JSON.stringify(options ?? {}));
        const payload = JSON.parse(raw);
        if (payload.error) {
            const err = new Error(payload.error.message);
            if (payload.error.code !== undefined) {
                err.code = payload.error.code;
            }
            throw err;
        }
        return payload.ok;
    };

    globalThis.base = Object.freeze({
        subscription: Object.freeze({
            getOrCreateSubscriptionOwnerWallet: (options) =>
                call("getOrCreateSubscriptionOwnerWallet", options),
            subscribe: (options) => call("subscribe", options),
            getStatus: (options) => call("getStatus", options),
            charge: (options) => call("charge", options),
            revoke: (options) => call("revoke", options),
        }),
    });

    const formatArgs = (args) =>
        args
            .map((a) => (typeof a === "object" && a !== null ? JSON.stringify(a, null, 2) : String(a)))
            .join(" ");
    const previousConsole = globalThis.console;
    const captureConsole = () => {
        const forward = (name, args) => {
            if (previousConsole && typeof previousConsole[name] === "function") {
                previousConsole[name](...args);
            }
        };
        globalThis.console = {
            log: (...args) => { consoleOp("LOG", formatArgs(args)); forward("log", args); },
            info: (...args) => { consoleOp("INFO", formatArgs(args)); forward("info", args); },
            warn: (...args) => { consoleOp("WARN", formatArgs(args)); forward("warn", args); },
            error: (...args) => { consoleOp("ERROR", formatArgs(args)); forward("error", args); },
        };
        return () => {
            globalThis.console = previousConsole;
        };
    };

    globalThis.__playground = Object.freeze({
        setResult: setResult,
        captureConsole: captureConsole,
    });

    delete globalThis.Deno;

    // Remove code generation primitives so prototype chain access cannot
    // reach the Function constructor.
    delete globalThis.eval;
    const AsyncFunction = (async function () {}).constructor;
    const GeneratorFunction = (function* () {}).constructor;
    Object.defineProperty(Function.prototype, "constructor", {
        value: undefined, configurable: false, writable: false
    });
    Object.defineProperty(AsyncFunction.prototype, "constructor", {
        value: undefined, configurable: false, writable: false
    });
    Object.defineProperty(GeneratorFunction.prototype, "constructor", {
        value: undefined, configurable: false, writable: false
    });
})(Deno.core.ops);
"#;

/// Wrap sanitized code as a one-shot async callable over the fixed context.
///
/// The parameter list is exactly [`SNIPPET_CONTEXT`]. Console capture
/// engages before the call and is restored in `finally`; success and every
/// failure shape end in a result envelope.
fn wrap_snippet(code: &str, capture_stack: bool) -> String {
    let params = SNIPPET_CONTEXT.join(", ");
    let args = SNIPPET_CONTEXT
        .iter()
        .map(|name| format!("globalThis.{name}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
(async () => {{
    const __restore = __playground.captureConsole();
    try {{
        const __snippet = async ({params}) => {{
{code}
        }};
        const __value = await __snippet({args});
        __playground.setResult(JSON.stringify({{ value: __value === undefined ? null : __value }}));
    }} catch (e) {{
        let __details;
        if (e instanceof Error) {{
            __details = {{ message: e.message, kind: e.name || "Error", details: null }};
            for (const key of ["code", "details", "response", "statusCode"]) {{
                if (e[key] !== undefined) {{
                    __details[key] = e[key];
                }}
            }}
            if ({capture_stack} && e.stack) {{
                __details.stack = e.stack;
            }}
        }} else if (typeof e === "string") {{
            __details = {{ message: e, kind: "string", details: null }};
        }} else if (e !== null && typeof e === "object") {{
            __details = {{ message: "Unknown error occurred", kind: "unknown", details: null, ...e }};
            __details.message = e.message || JSON.stringify(e);
        }} else {{
            __details = {{ message: "Unknown error occurred", kind: "unknown", details: null }};
        }}
        if (typeof __details.kind !== "string") {{
            __details.kind = "unknown";
        }}
        if (typeof __details.message !== "string") {{
            __details.message = String(__details.message);
        }}
        __playground.setResult(JSON.stringify({{ error: __details }}));
    }} finally {{
        __restore();
    }}
}})();
"#
    )
}

/// Run one snippet on the current thread (must be a dedicated thread, not
/// the caller's tokio runtime).
async fn run_snippet(
    config: &SandboxConfig,
    code: &str,
    dispatcher: Arc<dyn SubscriptionDispatcher>,
) -> Result<ExecutionOutcome, SandboxError> {
    let mut runtime = JsRuntime::new(RuntimeOptions {
        extensions: vec![playground_ext::init()],
        ..Default::default()
    });

    runtime.op_state().borrow_mut().put(dispatcher);
    runtime
        .op_state()
        .borrow_mut()
        .put(capture::ConsoleLog::default());

    runtime
        .execute_script("[playground:bootstrap]", BOOTSTRAP)
        .map_err(|e| SandboxError::Execution(anyhow::anyhow!("bootstrap failed: {e}")))?;

    let wrapped = wrap_snippet(code, config.capture_stack);

    let exec_error = match runtime.execute_script("[playground:snippet]", wrapped) {
        Ok(_) => {
            // Drive the event loop so awaited proxy calls run to completion
            match runtime
                .run_event_loop(PollEventLoopOptions::default())
                .await
            {
                Ok(()) => None,
                Err(e) => Some(e.to_string()),
            }
        }
        Err(e) => Some(e.to_string()),
    };

    // The log and the result envelope come out of OpState on every path.
    let (log, result_json) = {
        let state = runtime.op_state();
        let mut state = state.borrow_mut();
        let log = capture::drain(&mut state);
        let result_json = state.try_take::<ExecutionResult>().map(|r| r.0);
        (log, result_json)
    };

    // The wrapper catches everything the snippet throws; a failure of the
    // event loop itself is still surfaced as a normalized runtime error.
    if let Some(message) = exec_error {
        return Ok(ExecutionOutcome {
            result: Err(ErrorDetails::new(message, "Error")),
            log,
        });
    }

    let result_json = result_json.ok_or_else(|| {
        SandboxError::Execution(anyhow::anyhow!("no result captured from snippet execution"))
    })?;

    let envelope: ResultEnvelope = serde_json::from_str(&result_json)?;
    let result = match envelope.error {
        Some(details) => Err(details),
        None => Ok(envelope.value.unwrap_or(Value::Null)),
    };

    Ok(ExecutionOutcome { result, log })
}
