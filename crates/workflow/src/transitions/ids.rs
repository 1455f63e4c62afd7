use bikeshare_records::Record;
use bikeshare_storage::LedgerStore;
use tracing::debug;

use crate::accessor::Accessor;
use crate::config::IdCollision;
use crate::error::WorkflowError;

/// Claim `base` as the id of a new `T`, or a suffixed variant of it.
///
/// Every probed key is read through the snapshot, so a concurrent claim of
/// the same id fails this invocation's commit.
pub(crate) async fn allocate<T: Record, S: LedgerStore>(
    tx: &mut Accessor<'_, S>,
    base: String,
    strategy: IdCollision,
    taken: impl FnOnce(&str) -> String,
) -> Result<String, WorkflowError> {
    if !tx.exists::<T>(&base).await? {
        return Ok(base);
    }
    match strategy {
        IdCollision::Reject => Err(WorkflowError::Conflict(taken(&base))),
        IdCollision::Suffix => {
            let mut n: u64 = 1;
            loop {
                let candidate = format!("{}-{}", base, n);
                if !tx.exists::<T>(&candidate).await? {
                    debug!(base = %base, id = %candidate, "derived id taken, using suffix");
                    return Ok(candidate);
                }
                n += 1;
            }
        }
    }
}
