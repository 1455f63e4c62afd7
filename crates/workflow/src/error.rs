use std::fmt;

use bikeshare_records::RecordError;
use bikeshare_storage::StorageError;

/// Coarse classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Validation,
    NotFound,
    Conflict,
    Encoding,
    Identity,
    InvalidOperation,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Identity => "identity",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way an invocation can fail. The display text is the message
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// The caller's principal does not satisfy the operation's role.
    #[error("{0}")]
    Authorization(String),

    /// Wrong arity or an argument that does not parse.
    #[error("{0}")]
    Validation(String),

    /// A referenced record is absent.
    #[error("{0}")]
    NotFound(String),

    /// Record already exists, illegal status, reference mismatch, or an
    /// optimistic concurrency conflict at commit.
    #[error("{0}")]
    Conflict(String),

    /// Stored bytes could not be decoded, or a record could not be encoded.
    #[error(transparent)]
    Encoding(#[from] RecordError),

    /// The caller's identity could not be extracted.
    #[error("{0}")]
    Identity(String),

    #[error("{0}")]
    InvalidOperation(String),

    /// Ledger backend failure other than a conflict.
    #[error("{0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Authorization(_) => ErrorKind::Authorization,
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::Conflict(_) => ErrorKind::Conflict,
            WorkflowError::Encoding(_) => ErrorKind::Encoding,
            WorkflowError::Identity(_) => ErrorKind::Identity,
            WorkflowError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            WorkflowError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<StorageError> for WorkflowError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ConcurrentConflict { .. } => WorkflowError::Conflict(e.to_string()),
            StorageError::Backend(_) => WorkflowError::Storage(e.to_string()),
        }
    }
}
