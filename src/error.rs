//! Stable, user-visible error codes and the crate's internal error type.
//!
//! `ErrorCode` is the wire-stable enum from spec §6; `Error` is the richer
//! internal type operators and the validator actually return, carrying a
//! message and (where known) the plan node that raised it. Every non-user
//! error is logged before it crosses a suspension point (see `executor`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, user-visible status/error codes (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Succeeded,
    SyntaxError,
    SemanticError,
    PermissionError,
    SpaceNotFound,
    TagNotFound,
    EdgeNotFound,
    IndexNotFound,
    LeaderChanged,
    PartNotFound,
    ConsensusError,
    RpcFailure,
    PartialSuccess,
    Timeout,
    MemoryExceeded,
    ExecutionError,
}

impl ErrorCode {
    /// User errors are never retried (spec §7).
    pub fn is_user_error(self) -> bool {
        matches!(
            self,
            ErrorCode::SyntaxError | ErrorCode::SemanticError | ErrorCode::PermissionError
        )
    }

    /// Transient infrastructure errors are retried by the storage client up
    /// to a configured cap before surfacing (spec §7).
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCode::LeaderChanged | ErrorCode::Timeout)
    }
}

/// The crate's internal error type. Validator, optimizer, and executor
/// functions return `Result<T, Error>`; `Error::code()` maps each variant to
/// the stable `ErrorCode` surfaced to callers.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum Error {
    #[error("semantic error at node {node_id:?}: {message}")]
    Semantic {
        message: String,
        node_id: Option<u64>,
    },

    #[error("symbol not found: {name}")]
    SymbolNotFound { name: String },

    #[error("ambiguous column: {name}")]
    AmbiguousColumn { name: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("permission denied: {message}")]
    Permission { message: String },

    #[error("space not found: {name}")]
    SpaceNotFound { name: String },

    #[error("tag not found: {name}")]
    TagNotFound { name: String },

    #[error("edge type not found: {name}")]
    EdgeNotFound { name: String },

    #[error("index not found: {name}")]
    IndexNotFound { name: String },

    #[error("leader changed for part {part}")]
    LeaderChanged { part: i32 },

    #[error("part not found: {part}")]
    PartNotFound { part: i32 },

    #[error("rpc failure: {message}")]
    RpcFailure { message: String },

    #[error("query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("memory limit exceeded: used {used} bytes, limit {limit} bytes")]
    MemoryExceeded { used: usize, limit: usize },

    #[error("execution error: {message}")]
    Execution { message: String },

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Semantic { .. } => ErrorCode::SemanticError,
            Error::SymbolNotFound { .. } => ErrorCode::SemanticError,
            Error::AmbiguousColumn { .. } => ErrorCode::SemanticError,
            Error::TypeMismatch { .. } => ErrorCode::SemanticError,
            Error::Permission { .. } => ErrorCode::PermissionError,
            Error::SpaceNotFound { .. } => ErrorCode::SpaceNotFound,
            Error::TagNotFound { .. } => ErrorCode::TagNotFound,
            Error::EdgeNotFound { .. } => ErrorCode::EdgeNotFound,
            Error::IndexNotFound { .. } => ErrorCode::IndexNotFound,
            Error::LeaderChanged { .. } => ErrorCode::LeaderChanged,
            Error::PartNotFound { .. } => ErrorCode::PartNotFound,
            Error::RpcFailure { .. } => ErrorCode::RpcFailure,
            Error::Timeout { .. } => ErrorCode::Timeout,
            Error::MemoryExceeded { .. } => ErrorCode::MemoryExceeded,
            Error::Execution { .. } => ErrorCode::ExecutionError,
            Error::Cancelled => ErrorCode::ExecutionError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
