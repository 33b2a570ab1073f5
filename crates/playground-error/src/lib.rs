//! Typed error types for the playground proxy boundary.
//!
//! Provides [`ProxyError`] — the canonical error type reported by
//! `SubscriptionDispatcher` implementations when a proxied subscription
//! operation fails. The sandbox turns these into ordinary thrown errors
//! inside the isolate, carrying [`ProxyError::code`] along for the snippet's
//! `catch` blocks.

use thiserror::Error;

/// Canonical error type for proxied subscription operations.
///
/// All variants are `#[non_exhaustive]` to allow future additions without
/// breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProxyError {
    /// The options object was missing a required field or carried an
    /// unusable value.
    #[error("invalid options: {reason}")]
    InvalidOptions {
        /// What was missing or malformed.
        reason: String,
    },

    /// The backend proxy is not configured with the credentials the
    /// operation requires.
    #[error("missing backend credentials: {reason}")]
    Credentials {
        /// Which credential configuration is absent.
        reason: String,
    },

    /// The trusted backend endpoint answered with a non-success status.
    #[error("backend request failed with status {status}: {message}")]
    Backend {
        /// HTTP status returned by the backend.
        status: u16,
        /// The error message from the backend response body.
        message: String,
    },

    /// The subscription service itself reported a failure.
    #[error("subscription service error: {message}")]
    Upstream {
        /// The error message from the upstream service.
        message: String,
    },

    /// An internal error (catch-all for unexpected failures).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// Returns a static error code string for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOptions { .. } => "INVALID_OPTIONS",
            Self::Credentials { .. } => "CREDENTIALS",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Returns whether the operation that produced this error may succeed if
    /// retried.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Backend { status, .. } => *status >= 500 || *status == 429,
            Self::Upstream { .. } => true,
            Self::InvalidOptions { .. } => false,
            Self::Credentials { .. } => false,
            Self::Internal(_) => false,
        }
    }
}

// Compile-time assertion: ProxyError must be Send + Sync + 'static
const _: fn() = || {
    fn assert_bounds<T: Send + Sync + 'static>() {}
    assert_bounds::<ProxyError>();
};
