//! End-to-end execution tests running snippets through the full pipeline
//! against stub dispatchers.

use std::sync::Arc;

use playground_error::ProxyError;
use playground_sandbox::{
    ExecutionOutcome, SandboxConfig, SandboxError, SandboxRunner, SubmissionOutcome,
    SubscriptionDispatcher, SubscriptionOp,
};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("playground_sandbox=debug")
        .try_init();
}

fn runner() -> SandboxRunner {
    init_tracing();
    SandboxRunner::new(SandboxConfig::default())
}

/// Echoes the method name and options back as the result.
struct EchoDispatcher;

#[async_trait::async_trait]
impl SubscriptionDispatcher for EchoDispatcher {
    async fn dispatch(&self, op: SubscriptionOp, options: Value) -> Result<Value, ProxyError> {
        Ok(json!({ "method": op.method_name(), "options": options }))
    }
}

/// Resolves wallet creation with a fixed address.
struct WalletDispatcher;

#[async_trait::async_trait]
impl SubscriptionDispatcher for WalletDispatcher {
    async fn dispatch(&self, op: SubscriptionOp, _options: Value) -> Result<Value, ProxyError> {
        match op {
            SubscriptionOp::GetOrCreateOwnerWallet => Ok(json!({ "address": "0xabc" })),
            _ => Ok(json!({})),
        }
    }
}

/// Fails `charge` the way a backend with an underfunded subscription would.
struct FailingChargeDispatcher;

#[async_trait::async_trait]
impl SubscriptionDispatcher for FailingChargeDispatcher {
    async fn dispatch(&self, op: SubscriptionOp, _options: Value) -> Result<Value, ProxyError> {
        match op {
            SubscriptionOp::Charge => {
                Err(ProxyError::Internal(anyhow::anyhow!("insufficient balance")))
            }
            _ => Ok(json!({})),
        }
    }
}

fn executed(outcome: SubmissionOutcome) -> ExecutionOutcome {
    match outcome {
        SubmissionOutcome::Executed(executed) => executed,
        SubmissionOutcome::Rejected { diagnostics } => {
            panic!("expected execution, got rejection: {diagnostics:?}")
        }
    }
}

#[tokio::test]
async fn wallet_snippet_returns_the_dispatcher_result() {
    let code =
        "const w = await base.subscription.getOrCreateSubscriptionOwnerWallet(); return w;";
    let outcome = runner()
        .execute(code, Arc::new(WalletDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.result.unwrap(), json!({ "address": "0xabc" }));
}

#[tokio::test]
async fn options_pass_through_to_the_dispatcher() {
    let code = "return base.subscription.getStatus({ id: '0x2', testnet: true });";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    let value = executed.result.unwrap();
    assert_eq!(value["method"], "getStatus");
    assert_eq!(value["options"], json!({ "id": "0x2", "testnet": true }));
}

#[tokio::test]
async fn missing_options_default_to_an_empty_object() {
    let code = "return base.subscription.subscribe();";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.result.unwrap()["options"], json!({}));
}

#[tokio::test]
async fn charge_rejection_is_normalized() {
    let code = "return base.subscription.charge({ id: '0x1', amount: '5.00' });";
    let outcome = runner()
        .execute(code, Arc::new(FailingChargeDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    let details = executed.result.unwrap_err();
    assert_eq!(details.message, "insufficient balance");
    assert_eq!(details.kind, "Error");
    assert_eq!(details.code, Some(json!("INTERNAL")));
}

#[tokio::test]
async fn proxy_error_codes_reach_snippet_catch_blocks() {
    struct CredentialDispatcher;

    #[async_trait::async_trait]
    impl SubscriptionDispatcher for CredentialDispatcher {
        async fn dispatch(&self, _op: SubscriptionOp, _options: Value) -> Result<Value, ProxyError> {
            Err(ProxyError::Credentials {
                reason: "CDP API key not configured".into(),
            })
        }
    }

    let code = r#"try {
  return await base.subscription.revoke({ id: '0x1' });
} catch (error) {
  return error.code;
}"#;
    let outcome = runner()
        .execute(code, Arc::new(CredentialDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.result.unwrap(), json!("CREDENTIALS"));
}

#[tokio::test]
async fn console_lines_are_captured_in_order_with_severity_prefixes() {
    let code = r#"console.log('hi');
console.log('hi');
console.log('hi');
return 1;"#;
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.log, vec!["[LOG] hi", "[LOG] hi", "[LOG] hi"]);
    assert_eq!(executed.result.unwrap(), json!(1));
}

#[tokio::test]
async fn severities_keep_call_order() {
    let code = r#"console.log('one');
console.warn('two');
console.error('three');
console.info('four');
return null;"#;
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(
        executed.log,
        vec!["[LOG] one", "[WARN] two", "[ERROR] three", "[INFO] four"]
    );
}

#[tokio::test]
async fn object_arguments_are_json_stringified() {
    let code = "console.log('status:', { active: true }); return null;";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.log.len(), 1);
    assert!(
        executed.log[0].starts_with("[LOG] status: {"),
        "got: {}",
        executed.log[0]
    );
    assert!(
        executed.log[0].contains("\"active\": true"),
        "got: {}",
        executed.log[0]
    );
}

#[tokio::test]
async fn log_is_preserved_when_the_snippet_throws() {
    let code = r#"console.log('before failure');
throw 'boom';"#;
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.log, vec!["[LOG] before failure"]);
    let details = executed.result.unwrap_err();
    assert_eq!(details.message, "boom");
    assert_eq!(details.kind, "string");
}

#[tokio::test]
async fn thrown_plain_objects_merge_their_fields() {
    let code = "throw { message: 'payment required', statusCode: 402, hint: 'top up' };";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    let details = executed.result.unwrap_err();
    assert_eq!(details.message, "payment required");
    assert_eq!(details.kind, "unknown");
    assert_eq!(details.status_code, Some(json!(402)));
    assert_eq!(details.extra.get("hint"), Some(&json!("top up")));
}

#[tokio::test]
async fn snippet_without_return_resolves_to_null() {
    let code = "const x = 1;";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let executed = executed(outcome);
    assert_eq!(executed.result.unwrap(), Value::Null);
}

#[tokio::test]
async fn rejected_code_is_never_executed() {
    let code = "eval('1+1')";
    let outcome = runner()
        .execute(code, Arc::new(EchoDispatcher))
        .await
        .unwrap();
    match outcome {
        SubmissionOutcome::Rejected { diagnostics } => {
            assert!(!diagnostics.is_empty());
        }
        SubmissionOutcome::Executed(_) => panic!("eval must not execute"),
    }
}

#[tokio::test]
async fn oversized_code_is_refused_up_front() {
    let runner = SandboxRunner::new(SandboxConfig {
        max_code_size: 32,
        ..SandboxConfig::default()
    });
    let code = "return 1; ".repeat(16);
    let err = runner
        .execute(&code, Arc::new(EchoDispatcher))
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::CodeTooLarge { max: 32, .. }));
}

#[tokio::test]
async fn stack_is_captured_when_configured() {
    let runner = SandboxRunner::new(SandboxConfig {
        capture_stack: true,
        ..SandboxConfig::default()
    });
    // `new Error` is outside the whitelist, so drive the runner directly the
    // way a dispatcher-thrown error would.
    let executed = runner
        .run("throw new Error('with stack');", Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let details = executed.result.unwrap_err();
    assert_eq!(details.message, "with stack");
    assert!(details.stack.is_some());
}

#[tokio::test]
async fn stack_is_omitted_when_not_configured() {
    let runner = SandboxRunner::new(SandboxConfig {
        capture_stack: false,
        ..SandboxConfig::default()
    });
    let executed = runner
        .run("throw new Error('no stack');", Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let details = executed.result.unwrap_err();
    assert!(details.stack.is_none());
}

// --- Runtime hardening (the dynamic layer behind the static whitelist) ---

#[tokio::test]
async fn namespace_objects_are_frozen() {
    let executed = runner()
        .run(
            "return Object.isFrozen(base) && Object.isFrozen(base.subscription);",
            Arc::new(EchoDispatcher),
        )
        .await
        .unwrap();
    assert_eq!(executed.result.unwrap(), json!(true));
}

#[tokio::test]
async fn eval_and_deno_are_absent_from_the_isolate() {
    let executed = runner()
        .run(
            "return [typeof globalThis.eval, typeof globalThis.Deno];",
            Arc::new(EchoDispatcher),
        )
        .await
        .unwrap();
    assert_eq!(executed.result.unwrap(), json!(["undefined", "undefined"]));
}

#[tokio::test]
async fn function_constructor_chain_is_disabled() {
    let executed = runner()
        .run(
            "const fn = async () => {}; return String(fn.constructor);",
            Arc::new(EchoDispatcher),
        )
        .await
        .unwrap();
    assert_eq!(executed.result.unwrap(), json!("undefined"));
}

#[tokio::test]
async fn submissions_are_independent() {
    let runner = runner();
    let first = runner
        .execute("console.log('a'); return 1;", Arc::new(EchoDispatcher))
        .await
        .unwrap();
    let second = runner
        .execute("return 2;", Arc::new(EchoDispatcher))
        .await
        .unwrap();
    assert_eq!(executed(first).log, vec!["[LOG] a"]);
    // a fresh isolate and log buffer per submission: nothing carries over
    let second = executed(second);
    assert!(second.log.is_empty());
    assert_eq!(second.result.unwrap(), json!(2));
}
