//! Session store error types.
//!
//! Every variant carries the key or path involved. Stored values are never
//! included: they hold CSRF tokens and pending credentials.

/// Errors that can occur during session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to open the session store at the given path.
    #[error("failed to open session store at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a value.
    #[error("failed to read session key '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Failed to write a value.
    #[error("failed to write session key '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Failed to delete a key.
    #[error("failed to delete session key '{key}': {reason}")]
    Delete { key: String, reason: String },

    /// Failed to begin or commit a transaction.
    #[error("session transaction failed: {reason}")]
    Transaction { reason: String },
}
