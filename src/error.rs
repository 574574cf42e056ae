//! Error types for the NAS provisioner
//!
//! Provides structured error types for provisioning, deletion, the external
//! command capability, and the Kubernetes control loop.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    // =========================================================================
    // Deletion Errors
    // =========================================================================
    #[error("Refusing to operate on unsafe export path: {path:?}")]
    UnsafePath { path: String },

    #[error("Mount of {server}:{path} failed: {reason}")]
    MountFailure {
        server: String,
        path: String,
        reason: String,
    },

    #[error("Deletion of {path} failed: {reason}")]
    DeletionFailure { path: String, reason: String },

    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Volume {name} cannot be reclaimed: {reason}")]
    InvalidVolume { name: String, reason: String },
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_)
            | Error::MountFailure { .. }
            | Error::CommandFailed { .. }
            | Error::DeletionFailure { .. } => ErrorAction::RequeueWithBackoff,

            // Storage class may be fixed by an admin - check back later
            Error::Configuration(_) => ErrorAction::RequeueAfter(Duration::from_secs(300)),

            // Request/volume shape will not change on its own
            Error::UnsupportedRequest(_)
            | Error::UnsafePath { .. }
            | Error::InvalidVolume { .. } => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Kube(_) | Error::MountFailure { .. } | Error::CommandFailed { .. }
        )
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;
