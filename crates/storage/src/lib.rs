pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::{printable_key, StorageError};
pub use memory::{LedgerDump, LedgerEntry, MemoryLedger, MemorySnapshot};
pub use record::{QueryRecord, Selector, SelectorFields};
pub use traits::LedgerStore;
