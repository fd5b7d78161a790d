// The six error kinds of spec §7. `InvalidRequest`/`Unauthorized`/
// `InvalidAddress`/`InvalidCoins`/`InsufficientFunds` are rejected-transaction
// errors; `Invariant` is chain-halting and must never be silently
// swallowed by a handler.

use crate::coin::CoinError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("invariant violation (fatal): {0}")]
    Invariant(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ChainError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        ChainError::InvalidRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ChainError::Unauthorized(msg.into())
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        ChainError::InsufficientFunds(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        ChainError::Invariant(msg.into())
    }

    /// Whether this error is fatal (should halt the chain) rather than
    /// simply rejecting the current transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChainError::Invariant(_))
    }
}

impl From<CoinError> for ChainError {
    fn from(e: CoinError) -> Self {
        ChainError::InvalidCoins(e.to_string())
    }
}

/// Lower-level storage-layer failures, wrapped into `ChainError::Storage`
/// at the module boundary (grounded on `common/src/error.rs::StorageError`).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backing store column {0} not found")]
    ColumnNotFound(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("corrupt encoding: {0}")]
    Corrupt(String),

    #[error("key not found")]
    NotFound,
}

impl From<crate::serializer::ReaderError> for StorageError {
    fn from(e: crate::serializer::ReaderError) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}
