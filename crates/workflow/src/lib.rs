//! Bike-share workflow engine.
//!
//! Users rent bikes, report issues with finished rides, and repairers fix
//! bikes. Every operation is a guarded transition over records kept in a
//! [`LedgerStore`](bikeshare_storage::LedgerStore): it reads the records it
//! needs, checks their status, and stages all writes in one snapshot that
//! commits atomically or not at all.
//!
//! ```ignore
//! let engine = Engine::new(MemoryLedger::new(), EngineConfig::new(true), Arc::new(SystemClock))?;
//! engine.invoke(&Anonymous, "registerBike", &["b1"]).await?;
//! ```

pub mod accessor;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod numeric;
pub mod operation;
pub mod policy;
pub mod query;
mod transitions;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BikeConfig, ConfigError, DiscardPolicy, EngineConfig, IdCollision, IdConfig, PolicyConfig,
    PricingConfig,
};
pub use engine::Engine;
pub use error::{ErrorKind, WorkflowError};
pub use identity::{Anonymous, Caller, CallerIdentity};
pub use operation::{Operation, OperationSpec, Registry};
pub use policy::{AccessPolicy, Principal, Requirement, Role};
pub use query::{query_by_status, status_payload, QueryRow};
