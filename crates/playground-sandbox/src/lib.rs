#![warn(missing_docs)]

//! # playground-sandbox
//!
//! Whitelist sandbox for the subscription playground.
//!
//! Untrusted snippets submitted through the playground editor run against a
//! small set of approved subscription operations and nothing else. The
//! pipeline has three stages:
//!
//! 1. **Pre-sanitize** ([`sanitize::presanitize`]): import/export
//!    declarations are stripped textually — they are not legal inside the
//!    synthetic function wrapper the later stages use.
//! 2. **Validate** ([`validator::validate`]): the code is parsed with
//!    `oxc_parser` and every node is checked against a declarative
//!    [`WhitelistPolicy`]. Violations accumulate as diagnostics and are
//!    returned as data, never thrown.
//! 3. **Run** ([`SandboxRunner`]): accepted code executes once in a fresh
//!    `deno_core` isolate with no filesystem, network, or environment
//!    access. The only bridge to the host is the frozen `base.subscription`
//!    namespace, which routes to a [`SubscriptionDispatcher`].
//!
//! ## Security model
//!
//! - **Static whitelist**: name-based, no scope analysis — local bindings
//!   are never policed, known dangerous globals always are
//! - **Fresh isolate per execution**: no state leakage between submissions
//! - **No ambient capabilities**: `Deno` and `eval` are removed, the
//!   `Function` constructor chain is disabled
//! - **Opaque proxies**: backend credentials never enter the isolate
//! - **Captured console**: snippet logging is recorded in order and returned
//!   with the outcome

pub mod capture;
pub mod error;
pub mod executor;
pub mod ops;
pub mod policy;
pub mod sanitize;
pub mod validator;

pub use error::{ErrorDetails, SandboxError};
pub use executor::{ExecutionOutcome, SandboxConfig, SandboxRunner, SubmissionOutcome};
pub use policy::WhitelistPolicy;
pub use validator::{ValidationDiagnostic, ValidationOutcome};

use serde_json::Value;

/// The five operations reachable through `base.subscription`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionOp {
    /// Create the subscription owner wallet, or fetch it if it exists.
    GetOrCreateOwnerWallet,
    /// Start a subscription.
    Subscribe,
    /// Look up the current status of a subscription.
    GetStatus,
    /// Charge an active subscription.
    Charge,
    /// Revoke a subscription.
    Revoke,
}

impl SubscriptionOp {
    /// All approved operations.
    pub const ALL: [SubscriptionOp; 5] = [
        SubscriptionOp::GetOrCreateOwnerWallet,
        SubscriptionOp::Subscribe,
        SubscriptionOp::GetStatus,
        SubscriptionOp::Charge,
        SubscriptionOp::Revoke,
    ];

    /// The method name exposed on `base.subscription` inside the sandbox.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::GetOrCreateOwnerWallet => "getOrCreateSubscriptionOwnerWallet",
            Self::Subscribe => "subscribe",
            Self::GetStatus => "getStatus",
            Self::Charge => "charge",
            Self::Revoke => "revoke",
        }
    }

    /// Resolve a sandbox-facing method name back to an operation.
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.method_name() == name)
    }

    /// Whether the operation must be proxied to the trusted backend.
    ///
    /// Wallet creation, `charge`, and `revoke` need secret credentials the
    /// sandbox must never see; `subscribe` and `getStatus` can be served by
    /// a client-side capability.
    pub fn requires_backend_credentials(self) -> bool {
        matches!(
            self,
            Self::GetOrCreateOwnerWallet | Self::Charge | Self::Revoke
        )
    }
}

/// Trait for dispatching approved subscription operations out of the sandbox.
///
/// Implementations hold credentials and connections to the subscription
/// service and the backend proxy. Snippet code never sees either — it calls
/// through the frozen `base.subscription` namespace, which routes here.
#[async_trait::async_trait]
pub trait SubscriptionDispatcher: Send + Sync {
    /// Perform one approved operation.
    ///
    /// `options` is the plain options object the snippet passed; the result
    /// is a plain JSON value handed back to the snippet unchanged. Failures
    /// surface inside the sandbox as thrown errors carrying
    /// [`playground_error::ProxyError::code`].
    async fn dispatch(
        &self,
        op: SubscriptionOp,
        options: Value,
    ) -> Result<Value, playground_error::ProxyError>;
}
