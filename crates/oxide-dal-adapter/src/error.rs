//! Error types for the adapter.

use oxide_dal_core::CompileError;

use crate::client::ClientError;
use crate::transaction::TransactionToken;

/// Errors raised while executing operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The operation failed validation before reaching the client.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// The token was never issued, or its transaction already ended.
    #[error("unknown transaction token: {0}")]
    UnknownTransaction(TransactionToken),

    /// Error raised by the driver.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A capability this adapter has switched off.
    #[error("{0} is not supported by this adapter")]
    Unsupported(&'static str),

    /// The driver returned something the adapter can't interpret.
    #[error("invalid result: {0}")]
    InvalidResult(String),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
