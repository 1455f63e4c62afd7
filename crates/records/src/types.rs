//! Typed structs for every record kept on the bike-share ledger.
//!
//! Each record carries its `docType` discriminator so that a stored value
//! is self-describing, and every status domain is a closed enum. Field
//! names follow the camelCase wire format used by the selector queries
//! (`docType`, `status`, `userId`, ...).

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::RecordError;
use crate::keys::derive_key;

// ── Document types ──────────────────────────────────────────────────

/// The entity type discriminator stored in every record's `docType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocType {
    User,
    Repairer,
    Bike,
    Ride,
    Issue,
    Repair,
}

impl DocType {
    pub const ALL: &'static [DocType] = &[
        DocType::User,
        DocType::Repairer,
        DocType::Bike,
        DocType::Ride,
        DocType::Issue,
        DocType::Repair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::User => "User",
            DocType::Repairer => "Repairer",
            DocType::Bike => "Bike",
            DocType::Ride => "Ride",
            DocType::Issue => "Issue",
            DocType::Repair => "Repair",
        }
    }

    /// Validate `status` against this document type's status domain and
    /// return its canonical spelling.
    ///
    /// Repairers carry no status, so every value is rejected for them.
    pub fn parse_status(&self, status: &str) -> Result<&'static str, RecordError> {
        match self {
            DocType::User => status.parse::<UserStatus>().map(|s| s.as_str()),
            DocType::Bike => status.parse::<BikeStatus>().map(|s| s.as_str()),
            DocType::Ride => status.parse::<RideStatus>().map(|s| s.as_str()),
            DocType::Issue => status.parse::<IssueStatus>().map(|s| s.as_str()),
            DocType::Repair => status.parse::<RepairStatus>().map(|s| s.as_str()),
            DocType::Repairer => Err(RecordError::NoStatusDomain { doc_type: *self }),
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocType::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| RecordError::UnknownDocType(s.to_string()))
    }
}

// ── Status domains ──────────────────────────────────────────────────

macro_rules! status_domain {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:tt),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(RecordError::UnknownStatus {
                        domain: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

status_domain!(
    /// Whether a user is free to start a ride.
    UserStatus {
        Free => "FREE",
        InRide => "IN_RIDE",
    }
);

status_domain!(
    /// Bike lifecycle. `Discarded` is terminal.
    BikeStatus {
        Available => "AVAILABLE",
        InUse => "IN_USE",
        ToRepair => "TO_REPAIR",
        Repairing => "REPAIRING",
        Repaired => "REPAIRED",
        Discarded => "DISCARDED",
    }
);

status_domain!(
    /// Ride lifecycle. `IssueClosed` is terminal.
    RideStatus {
        Ongoing => "ONGOING",
        Completed => "COMPLETED",
        IssueOpen => "ISSUE_OPEN",
        IssueClosed => "ISSUE_CLOSED",
    }
);

status_domain!(
    IssueStatus {
        Open => "OPEN",
        Closed => "CLOSED",
    }
);

status_domain!(
    /// Repair lifecycle. `Rejected` and `Completed` are terminal.
    RepairStatus {
        Requested => "REQUESTED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
        Completed => "COMPLETED",
    }
);

// ── Record trait ────────────────────────────────────────────────────

/// A ledger record: serializable, self-describing, keyed by `(DOC_TYPE, id)`.
pub trait Record: Serialize + DeserializeOwned {
    const DOC_TYPE: DocType;

    fn id(&self) -> &str;

    /// The discriminator actually carried by this value.
    fn doc_type(&self) -> DocType;

    /// Composite storage key of this record.
    fn key(&self) -> String {
        derive_key(Self::DOC_TYPE, self.id())
    }
}

macro_rules! impl_record {
    ($ty:ty, $doc:expr) => {
        impl Record for $ty {
            const DOC_TYPE: DocType = $doc;

            fn id(&self) -> &str {
                &self.id
            }

            fn doc_type(&self) -> DocType {
                self.doc_type
            }
        }
    };
}

/// Nullable fields must still be present on the wire. Routing them through
/// `deserialize_with` turns a missing field into a decode error instead of
/// serde's implicit `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

// ── Location ────────────────────────────────────────────────────────

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

// ── User ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    pub doc_type: DocType,
    pub id: String,
    pub balance: Decimal,
    /// Set while the user is `IN_RIDE`, cleared when the ride ends.
    #[serde(deserialize_with = "nullable")]
    pub current_ride_id: Option<String>,
    pub status: UserStatus,
}

impl User {
    pub fn new(id: impl Into<String>, balance: Decimal) -> Self {
        Self {
            doc_type: DocType::User,
            id: id.into(),
            balance,
            current_ride_id: None,
            status: UserStatus::Free,
        }
    }
}

impl_record!(User, DocType::User);

// ── Repairer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Repairer {
    pub doc_type: DocType,
    pub id: String,
}

impl Repairer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            doc_type: DocType::Repairer,
            id: id.into(),
        }
    }
}

impl_record!(Repairer, DocType::Repairer);

// ── Bike ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Bike {
    pub doc_type: DocType,
    pub id: String,
    /// Unknown until the bike is first located or ridden.
    #[serde(deserialize_with = "nullable")]
    pub location: Option<GeoPoint>,
    pub status: BikeStatus,
}

impl Bike {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            doc_type: DocType::Bike,
            id: id.into(),
            location: None,
            status: BikeStatus::Available,
        }
    }
}

impl_record!(Bike, DocType::Bike);

// ── Ride ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ride {
    pub doc_type: DocType,
    pub id: String,
    pub user_id: String,
    pub bike_id: String,
    /// Unix seconds (UTC).
    pub start_time: i64,
    pub start_location: GeoPoint,
    #[serde(deserialize_with = "nullable")]
    pub end_time: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub end_location: Option<GeoPoint>,
    pub cost: Decimal,
    pub status: RideStatus,
}

impl Ride {
    pub fn start(
        id: impl Into<String>,
        user_id: impl Into<String>,
        bike_id: impl Into<String>,
        start_time: i64,
        start_location: GeoPoint,
    ) -> Self {
        Self {
            doc_type: DocType::Ride,
            id: id.into(),
            user_id: user_id.into(),
            bike_id: bike_id.into(),
            start_time,
            start_location,
            end_time: None,
            end_location: None,
            cost: Decimal::ZERO,
            status: RideStatus::Ongoing,
        }
    }
}

impl_record!(Ride, DocType::Ride);

// ── Issue ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Issue {
    pub doc_type: DocType,
    pub id: String,
    pub user_id: String,
    pub bike_id: String,
    pub ride_id: String,
    pub status: IssueStatus,
}

impl Issue {
    pub fn open(
        id: impl Into<String>,
        user_id: impl Into<String>,
        bike_id: impl Into<String>,
        ride_id: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: DocType::Issue,
            id: id.into(),
            user_id: user_id.into(),
            bike_id: bike_id.into(),
            ride_id: ride_id.into(),
            status: IssueStatus::Open,
        }
    }
}

impl_record!(Issue, DocType::Issue);

// ── Repair ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Repair {
    pub doc_type: DocType,
    pub id: String,
    pub bike_id: String,
    pub repairer_id: String,
    pub status: RepairStatus,
}

impl Repair {
    pub fn request(
        id: impl Into<String>,
        bike_id: impl Into<String>,
        repairer_id: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: DocType::Repair,
            id: id.into(),
            bike_id: bike_id.into(),
            repairer_id: repairer_id.into(),
            status: RepairStatus::Requested,
        }
    }
}

impl_record!(Repair, DocType::Repair);
