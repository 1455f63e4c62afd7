/// All errors that can be returned by a LedgerStore implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict. A key in the snapshot's read
    /// set was changed by another commit after it was read.
    #[error("concurrent conflict on key {}", printable_key(key))]
    ConcurrentConflict { key: String },

    /// A backend-specific storage error (lock poisoning, serialization, I/O).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Composite keys carry NUL delimiters; render them visibly in messages.
pub fn printable_key(key: &str) -> String {
    key.replace('\u{0}', "\\0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_shows_delimiters() {
        let err = StorageError::ConcurrentConflict {
            key: "\u{0}Bike\u{0}b1\u{0}".to_string(),
        };
        assert_eq!(err.to_string(), "concurrent conflict on key \\0Bike\\0b1\\0");
    }
}
