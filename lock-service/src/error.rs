//! Error types for the lock service

use thiserror::Error;

/// Result type for lock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lock service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Acquisition retries exhausted; transient, the caller may retry later
    #[error("Lock acquisition attempts exceeded for {resource}")]
    ResourceAttemptsExceeded {
        /// Resource path that stayed contended
        resource: String,
    },

    /// A held lock's lease was lost mid-operation.
    ///
    /// Any side effect made before the expiry must be re-validated before
    /// the caller continues.
    #[error("Lock expired{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ResourceExpired {
        /// Why the lease was lost, when known
        reason: Option<String>,
    },

    /// Backend failure (connection, protocol)
    #[error("Lock backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
