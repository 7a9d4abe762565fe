//! Error kinds surfaced by the deployment pipeline.
//!
//! Every fallible operation in this crate returns an [`anyhow::Error`]. When the failure belongs to
//! one of the well-known categories below, a [`DeployError`] sits somewhere in the error chain so
//! that callers can classify it with [`error_kind`] no matter how many context layers were added
//! on the way up.

use std::future::Future;

use alloy_core::primitives::B256;
use tokio_util::sync::CancellationToken;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed input, detected before any external call.
    Validation,
    /// The L1 RPC endpoint could not be reached or answered with an error.
    Connectivity,
    /// One or more role keys could not be derived.
    Derivation,
    /// The bootstrap transaction failed on chain.
    Bootstrap,
    /// The contract toolchain failed or did not produce its artifact.
    Backend,
    /// The operation was aborted on request.
    Cancelled,
    /// Anything not covered above (filesystem, serialization, ...).
    Other,
}

/// Typed pipeline failures.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{0}")]
    Validation(String),

    #[error("L1 request {method} failed")]
    Connectivity { method: String },

    #[error("failed to derive address for {role} ({failures} role(s) failed in total): {reason}")]
    Derivation {
        role: String,
        reason: String,
        failures: usize,
    },

    #[error("bootstrap transaction {tx_hash} reverted")]
    BootstrapReverted { tx_hash: B256 },

    #[error("{0}")]
    Backend(String),

    #[error("artifact {name} not found in {location}")]
    ArtifactNotFound { name: String, location: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl DeployError {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::Derivation { .. } => ErrorKind::Derivation,
            Self::BootstrapReverted { .. } => ErrorKind::Bootstrap,
            Self::Backend(_) | Self::ArtifactNotFound { .. } => ErrorKind::Backend,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Classify an error by the first [`DeployError`] found in its chain.
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    if is_cancelled(err) {
        return ErrorKind::Cancelled;
    }

    err.downcast_ref::<DeployError>()
        .map(DeployError::kind)
        .unwrap_or(ErrorKind::Other)
}

/// Returns true if the error (or anything it wraps) is a cancellation.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<DeployError>(), Some(DeployError::Cancelled)))
        || matches!(err.downcast_ref::<DeployError>(), Some(DeployError::Cancelled))
}

/// Drive `fut` to completion unless `cancel` fires first.
///
/// The future is dropped on cancellation, so only use this for futures that own no resources
/// needing explicit teardown.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled.into()),
        res = fut => res,
    }
}
