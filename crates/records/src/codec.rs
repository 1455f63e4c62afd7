//! Strict JSON encoding and decoding of ledger records.
//!
//! Decoding never fills in defaults: a missing field, an unknown field, an
//! out-of-domain status or a `docType` naming a different entity all fail
//! with a [`RecordError`].

use crate::types::{DocType, Record};

/// Errors produced while encoding, decoding or interpreting records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Stored bytes are not a valid record of the expected type.
    #[error("malformed {doc_type} record: {message}")]
    Malformed { doc_type: DocType, message: String },

    /// The stored record declares a different document type.
    #[error("expected a {expected} record, found docType {found}")]
    DocTypeMismatch { expected: DocType, found: DocType },

    /// A record could not be serialized.
    #[error("failed to encode {doc_type} record: {message}")]
    Encode { doc_type: DocType, message: String },

    #[error("unknown {domain} value '{value}'")]
    UnknownStatus { domain: &'static str, value: String },

    #[error("unknown document type '{0}'")]
    UnknownDocType(String),

    #[error("{doc_type} records have no status")]
    NoStatusDomain { doc_type: DocType },
}

/// Serialize a record to its stored byte form.
pub fn encode<T: Record>(record: &T) -> Result<Vec<u8>, RecordError> {
    serde_json::to_vec(record).map_err(|e| RecordError::Encode {
        doc_type: T::DOC_TYPE,
        message: e.to_string(),
    })
}

/// Decode stored bytes as a record of type `T`.
pub fn decode<T: Record>(bytes: &[u8]) -> Result<T, RecordError> {
    let record: T = serde_json::from_slice(bytes).map_err(|e| RecordError::Malformed {
        doc_type: T::DOC_TYPE,
        message: e.to_string(),
    })?;
    if record.doc_type() != T::DOC_TYPE {
        return Err(RecordError::DocTypeMismatch {
            expected: T::DOC_TYPE,
            found: record.doc_type(),
        });
    }
    Ok(record)
}
