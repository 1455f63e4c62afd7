//! Guarded read-validate-write transitions, one function per operation.
//!
//! Each function reads every record it needs through the [`Accessor`],
//! checks preconditions in a fixed order and stages its writes only after
//! all checks pass. The first failing check returns; the engine then aborts
//! the snapshot, so a rejected operation writes nothing.
//!
//! Functions return the success payload: the new record's id for
//! operations that create a derived-id record, empty otherwise.
//!
//! [`Accessor`]: crate::accessor::Accessor

pub(crate) mod bikes;
pub(crate) mod ids;
pub(crate) mod issues;
pub(crate) mod registration;
pub(crate) mod repairs;
pub(crate) mod rides;

use crate::config::EngineConfig;
use crate::error::WorkflowError;

/// Per-invocation inputs shared by every transition.
pub(crate) struct Context<'c> {
    pub config: &'c EngineConfig,
    /// Unix seconds, read once when the invocation started.
    pub now: i64,
}

pub(crate) type Payload = Vec<u8>;

pub(crate) fn conflict(message: String) -> WorkflowError {
    WorkflowError::Conflict(message)
}
