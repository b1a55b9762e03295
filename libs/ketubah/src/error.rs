use thiserror::Error;

use crate::binding::KetubahField;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("call failed: {0}")]
    Call(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("unexpected value for {0:?}")]
    UnexpectedValue(KetubahField),
}

/// Reasons a write is refused before anything reaches the mempool, or fails afterwards
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("no wallet connected")]
    NoSigner,
    #[error("wallet is on chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("provider error: {0}")]
    Provider(String),
}
