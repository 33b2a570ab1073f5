//! Whitelist policy for the structural validator.
//!
//! The policy is pure data: sets and maps consulted by the walker in
//! [`crate::validator`]. Approving a new operation or namespace member is an
//! edit here, not a new code path, which keeps "what is allowed" auditable
//! independently of "how validation walks the tree".

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Declarative whitelist consulted for every node of a submitted snippet.
///
/// Authoring invariant (not checked at runtime): `allowed_call_names` and
/// `denied_identifiers` are disjoint.
#[derive(Debug, Clone)]
pub struct WhitelistPolicy {
    /// Bare function names callable without a namespace prefix.
    pub allowed_call_names: HashSet<&'static str>,
    /// Object name → member names reachable on it.
    pub allowed_namespaces: HashMap<&'static str, HashSet<&'static str>>,
    /// Syntax node categories permitted anywhere in the body.
    pub allowed_node_categories: HashSet<&'static str>,
    /// Names that must never appear as bare identifiers or call targets.
    pub denied_identifiers: HashSet<&'static str>,
    /// Names permitted after `new`.
    pub allowed_constructors: HashSet<&'static str>,
    /// Root of the approved namespace chain.
    pub root_namespace: &'static str,
    /// Sub-namespace under the root.
    pub sub_namespace: &'static str,
    /// Methods reachable as `<root>.<sub>.<method>()`.
    pub namespace_methods: HashSet<&'static str>,
}

/// SDK operations callable either bare or through the approved chain.
const SDK_FUNCTIONS: [&str; 5] = [
    "subscribe",
    "getStatus",
    "charge",
    "revoke",
    "getOrCreateSubscriptionOwnerWallet",
];

impl WhitelistPolicy {
    /// The policy for the `base.subscription` playground surface.
    pub fn base_subscription() -> Self {
        let allowed_namespaces: HashMap<&'static str, HashSet<&'static str>> = [
            ("base", &["subscription"][..]),
            ("console", &["log", "error", "warn", "info"][..]),
            ("Promise", &["resolve", "reject", "all", "race"][..]),
            ("Object", &["keys", "values", "entries", "assign"][..]),
            ("Array", &["isArray", "from"][..]),
            ("JSON", &["stringify", "parse"][..]),
            ("Math", &["floor", "ceil", "round", "min", "max", "abs"][..]),
        ]
        .into_iter()
        .map(|(object, members)| (object, members.iter().copied().collect()))
        .collect();

        let allowed_node_categories: HashSet<&'static str> = [
            "VariableDeclaration",
            "VariableDeclarator",
            "FunctionDeclaration",
            "FunctionExpression",
            "ArrowFunctionExpression",
            "BlockStatement",
            "ExpressionStatement",
            "ReturnStatement",
            "IfStatement",
            "TryStatement",
            "CatchClause",
            "ThrowStatement",
            "AwaitExpression",
            "CallExpression",
            "MemberExpression",
            "Identifier",
            "Literal",
            "TemplateLiteral",
            "TemplateElement",
            "ObjectExpression",
            "ArrayExpression",
            "Property",
            "AssignmentExpression",
            "BinaryExpression",
            "UnaryExpression",
            "ConditionalExpression",
            "LogicalExpression",
            "UpdateExpression",
            "SpreadElement",
            "ForStatement",
            "ForInStatement",
            "ForOfStatement",
            "WhileStatement",
            "DoWhileStatement",
            "BreakStatement",
            "ContinueStatement",
            "SwitchStatement",
            "SwitchCase",
            "AssignmentPattern",
            "ObjectPattern",
            "ArrayPattern",
            "RestElement",
            "ThisExpression",
            "ChainExpression",
            "OptionalMemberExpression",
            "OptionalCallExpression",
            "SequenceExpression",
            "NewExpression",
        ]
        .into_iter()
        .collect();

        let denied_identifiers: HashSet<&'static str> = [
            "eval",
            "Function",
            "AsyncFunction",
            "GeneratorFunction",
            "AsyncGeneratorFunction",
            "require",
            "import",
            "export",
            "process",
            "global",
            "window",
            "document",
            "XMLHttpRequest",
            "fetch",
            "WebSocket",
            "Worker",
            "SharedWorker",
            "ServiceWorker",
            "localStorage",
            "sessionStorage",
            "indexedDB",
            "crypto",
            "location",
            "history",
            "navigator",
            "__dirname",
            "__filename",
            "module",
            "exports",
            "Buffer",
            "setImmediate",
        ]
        .into_iter()
        .collect();

        Self {
            allowed_call_names: SDK_FUNCTIONS.into_iter().collect(),
            allowed_namespaces,
            allowed_node_categories,
            denied_identifiers,
            allowed_constructors: ["Promise", "Date"].into_iter().collect(),
            root_namespace: "base",
            sub_namespace: "subscription",
            namespace_methods: SDK_FUNCTIONS.into_iter().collect(),
        }
    }

    /// Process-wide shared policy, created once at startup and never mutated.
    pub fn shared() -> &'static WhitelistPolicy {
        static POLICY: LazyLock<WhitelistPolicy> = LazyLock::new(WhitelistPolicy::base_subscription);
        &POLICY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_and_denied_names_are_disjoint() {
        let policy = WhitelistPolicy::base_subscription();
        for name in &policy.allowed_call_names {
            assert!(
                !policy.denied_identifiers.contains(name),
                "'{name}' is both allowed and denied"
            );
        }
    }

    #[test]
    fn approved_chain_exposes_exactly_the_sdk_functions() {
        let policy = WhitelistPolicy::base_subscription();
        assert_eq!(policy.namespace_methods, policy.allowed_call_names);
        assert_eq!(policy.namespace_methods.len(), 5);
    }

    #[test]
    fn root_namespace_maps_to_sub_namespace() {
        let policy = WhitelistPolicy::base_subscription();
        let members = policy
            .allowed_namespaces
            .get(policy.root_namespace)
            .expect("root namespace missing");
        assert!(members.contains(policy.sub_namespace));
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn shared_policy_is_a_single_instance() {
        assert!(std::ptr::eq(
            WhitelistPolicy::shared(),
            WhitelistPolicy::shared()
        ));
    }

    #[test]
    fn category_whitelist_spot_checks() {
        let policy = WhitelistPolicy::base_subscription();
        assert!(policy.allowed_node_categories.contains("CallExpression"));
        assert!(policy.allowed_node_categories.contains("ForOfStatement"));
        assert!(!policy.allowed_node_categories.contains("ClassDeclaration"));
        assert!(!policy
            .allowed_node_categories
            .contains("TaggedTemplateExpression"));
    }
}
