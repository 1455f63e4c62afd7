//! bikeshare-records: the record schema shared by the ledger, the workflow
//! engine and the command line host.
//!
//! Provides typed structs for every entity (User, Repairer, Bike, Ride,
//! Issue, Repair), their closed status domains, the composite key layout
//! that namespaces ids by entity type, and a strict JSON codec.

pub mod codec;
pub mod keys;
pub mod types;

pub use codec::{decode, encode, RecordError};
pub use keys::{derive_key, parse_key};
pub use types::*;
