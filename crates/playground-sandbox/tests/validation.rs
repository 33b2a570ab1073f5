//! Integration tests for the pre-sanitize + validate half of the pipeline.

use playground_sandbox::sanitize::presanitize;
use playground_sandbox::validator::{format_diagnostics, validate};
use playground_sandbox::{ValidationOutcome, WhitelistPolicy};

fn check(code: &str) -> ValidationOutcome {
    validate(&presanitize(code), WhitelistPolicy::shared())
}

/// The copy-pasted SDK snippet shape: import line, try/catch, approved chain.
#[test]
fn default_wallet_snippet_is_accepted() {
    let code = r#"import { base } from '@base-org/account'

try {
  const wallet = await base.subscription.getOrCreateSubscriptionOwnerWallet({
    testnet: true
  })

  console.log('Wallet address:', wallet.address);

  return wallet;
} catch (error) {
  console.error('Failed to get/create wallet:', error.message);
  throw error;
}"#;
    let outcome = check(code);
    assert!(outcome.accepted, "got: {:?}", outcome.diagnostics);
    assert!(!outcome.sanitized_code.contains("import"));
}

#[test]
fn multi_line_import_is_removed_and_code_parses() {
    let code = "import {\n  base\n} from '@base-org/account';\nreturn base.subscription.getStatus({ id: '0x1' });";
    let outcome = check(code);
    assert!(outcome.accepted, "got: {:?}", outcome.diagnostics);
}

#[test]
fn export_declaration_is_removed() {
    let code = "export const unused = 1;\nreturn 2;";
    let outcome = check(code);
    assert!(outcome.accepted, "got: {:?}", outcome.diagnostics);
    assert!(!outcome.sanitized_code.contains("export"));
}

#[test]
fn eval_is_rejected_with_a_diagnostic_naming_it() {
    let outcome = check("eval('1+1')");
    assert!(!outcome.accepted);
    assert!(outcome.sanitized_code.is_empty());
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("eval")),
        "got: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn unapproved_sixth_method_is_rejected_by_path() {
    let outcome = check("return base.subscription.unsubscribe({ id: '0x1' });");
    assert!(!outcome.accepted);
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.message == "Method 'base.subscription.unsubscribe' is not allowed"),
        "got: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn all_approved_methods_pass() {
    for method in [
        "subscribe",
        "getStatus",
        "charge",
        "revoke",
        "getOrCreateSubscriptionOwnerWallet",
    ] {
        let code = format!("return base.subscription.{method}({{}});");
        let outcome = check(&code);
        assert!(outcome.accepted, "{method} rejected: {:?}", outcome.diagnostics);
    }
}

#[test]
fn denied_globals_are_rejected() {
    for code in [
        "return process.env.SECRET;",
        "const r = require('fs');",
        "window.open('https://example.com');",
        "await fetch('https://example.com');",
    ] {
        let outcome = check(code);
        assert!(!outcome.accepted, "should reject: {code}");
    }
}

#[test]
fn diagnostics_accumulate_instead_of_short_circuiting() {
    let code = "eval('a');\nprocess.exit();\nconsole.table([]);";
    let outcome = check(code);
    assert!(!outcome.accepted);
    assert!(
        outcome.diagnostics.len() >= 3,
        "expected all violations reported, got: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn diagnostics_report_submission_lines() {
    let code = "const ok = 1;\nconsole.table([]);";
    let outcome = check(code);
    assert!(!outcome.accepted);
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.line == Some(2) && d.message.contains("console.table")),
        "got: {:?}",
        outcome.diagnostics
    );
    let rendered = format_diagnostics(&outcome.diagnostics);
    assert!(rendered.contains("Line 2: "), "got: {rendered}");
}

#[test]
fn import_stripping_keeps_line_numbers_useful() {
    // The import line is removed entirely, so the violation's reported line
    // refers to the pre-sanitized source handed to the parser.
    let code = "import { base } from 'x';\nconst a = 1;\neval('x');";
    let outcome = check(code);
    assert!(!outcome.accepted);
    assert!(
        outcome.diagnostics.iter().any(|d| d.line == Some(2)),
        "got: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn syntax_errors_become_a_single_diagnostic() {
    let outcome = check("const = broken ;;;!");
    assert!(!outcome.accepted);
    assert_eq!(
        outcome.diagnostics.len(),
        1,
        "got: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn validation_is_idempotent_end_to_end() {
    for code in [
        "return base.subscription.getStatus({ id: '0x1' });",
        "eval('1+1')",
        "const = ;",
    ] {
        assert_eq!(check(code), check(code), "outcomes differ for: {code}");
    }
}

#[test]
fn accepted_code_is_the_presanitized_code() {
    let code = "import { base } from 'x';\nreturn 1;";
    let outcome = check(code);
    assert!(outcome.accepted);
    assert_eq!(outcome.sanitized_code, presanitize(code));
}
