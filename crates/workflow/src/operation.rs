//! The operation registry: every invocable name with its role requirement
//! and argument schema. Built once and consulted before any record is read.

use std::collections::BTreeMap;

use bikeshare_records::DocType;

use crate::error::WorkflowError;
use crate::policy::{Requirement, Role};

/// Every workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RegisterUser,
    RegisterRepairer,
    RegisterBike,
    ReactivateBike,
    DiscardBike,
    UpdateBikeLocation,
    StartRide,
    EndRide,
    ReportIssue,
    AcceptIssue,
    RejectIssue,
    RequestRepair,
    AcceptRepair,
    RejectRepair,
    CompleteRepair,
    /// Read-only listing of one entity type by status.
    QueryByStatus(DocType),
}

impl Operation {
    pub fn is_query(&self) -> bool {
        matches!(self, Operation::QueryByStatus(_))
    }
}

/// Registry entry for one operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub operation: Operation,
    pub requirement: Requirement,
    /// Argument names, in order. The arity is its length.
    pub schema: &'static [&'static str],
}

impl OperationSpec {
    pub fn arity(&self) -> usize {
        self.schema.len()
    }

    /// `{User ID, Balance}`
    pub fn schema_label(&self) -> String {
        format!("{{{}}}", self.schema.join(", "))
    }

    pub fn check_arity(&self, found: usize) -> Result<(), WorkflowError> {
        if found == self.arity() {
            return Ok(());
        }
        Err(WorkflowError::Validation(format!(
            "Incorrect number of arguments. Expecting {}: {}. Found {}.",
            self.arity(),
            self.schema_label(),
            found
        )))
    }
}

const PROVIDER: Requirement = Requirement::Role(Role::Provider);
const USER: Requirement = Requirement::Role(Role::User);
const REPAIRER: Requirement = Requirement::Role(Role::Repairer);

const RIDE_ARGS: &[&str] = &["User ID", "Bike ID", "Longitude", "Latitude"];
const REPAIR_ARGS: &[&str] = &["Repairer ID", "Repair ID"];
const STATUS_ARGS: &[&str] = &["Status"];

const STANDARD: &[OperationSpec] = &[
    OperationSpec {
        name: "registerUser",
        operation: Operation::RegisterUser,
        requirement: USER,
        schema: &["User ID", "Balance"],
    },
    OperationSpec {
        name: "registerRepairer",
        operation: Operation::RegisterRepairer,
        requirement: REPAIRER,
        schema: &["Repairer ID"],
    },
    OperationSpec {
        name: "registerBike",
        operation: Operation::RegisterBike,
        requirement: PROVIDER,
        schema: &["Bike ID"],
    },
    OperationSpec {
        name: "reactivateBike",
        operation: Operation::ReactivateBike,
        requirement: PROVIDER,
        schema: &["Bike ID"],
    },
    OperationSpec {
        name: "discardBike",
        operation: Operation::DiscardBike,
        requirement: PROVIDER,
        schema: &["Bike ID"],
    },
    OperationSpec {
        name: "updateBikeLocation",
        operation: Operation::UpdateBikeLocation,
        requirement: PROVIDER,
        schema: &["Bike ID", "Longitude", "Latitude"],
    },
    OperationSpec {
        name: "startRide",
        operation: Operation::StartRide,
        requirement: USER,
        schema: RIDE_ARGS,
    },
    OperationSpec {
        name: "endRide",
        operation: Operation::EndRide,
        requirement: USER,
        schema: RIDE_ARGS,
    },
    OperationSpec {
        name: "reportIssue",
        operation: Operation::ReportIssue,
        requirement: USER,
        schema: &["User ID", "Ride ID"],
    },
    OperationSpec {
        name: "acceptIssue",
        operation: Operation::AcceptIssue,
        requirement: PROVIDER,
        schema: &["Issue ID"],
    },
    OperationSpec {
        name: "rejectIssue",
        operation: Operation::RejectIssue,
        requirement: PROVIDER,
        schema: &["Issue ID"],
    },
    OperationSpec {
        name: "requestRepair",
        operation: Operation::RequestRepair,
        requirement: PROVIDER,
        schema: &["Bike ID", "Repairer ID"],
    },
    OperationSpec {
        name: "acceptRepair",
        operation: Operation::AcceptRepair,
        requirement: REPAIRER,
        schema: REPAIR_ARGS,
    },
    OperationSpec {
        name: "rejectRepair",
        operation: Operation::RejectRepair,
        requirement: REPAIRER,
        schema: REPAIR_ARGS,
    },
    OperationSpec {
        name: "completeRepair",
        operation: Operation::CompleteRepair,
        requirement: REPAIRER,
        schema: REPAIR_ARGS,
    },
    OperationSpec {
        name: "getBikesByStatus",
        operation: Operation::QueryByStatus(DocType::Bike),
        requirement: Requirement::AnyOf(&[Role::Provider, Role::User, Role::Repairer]),
        schema: STATUS_ARGS,
    },
    OperationSpec {
        name: "getRidesByStatus",
        operation: Operation::QueryByStatus(DocType::Ride),
        requirement: Requirement::AnyOf(&[Role::Provider, Role::User]),
        schema: STATUS_ARGS,
    },
    OperationSpec {
        name: "getIssuesByStatus",
        operation: Operation::QueryByStatus(DocType::Issue),
        requirement: Requirement::AnyOf(&[Role::Provider, Role::User]),
        schema: STATUS_ARGS,
    },
    OperationSpec {
        name: "getRepairsByStatus",
        operation: Operation::QueryByStatus(DocType::Repair),
        requirement: Requirement::AnyOf(&[Role::Provider, Role::Repairer]),
        schema: STATUS_ARGS,
    },
];

/// Name-indexed operation table. Iteration follows registration order.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Vec<OperationSpec>,
    by_name: BTreeMap<&'static str, usize>,
}

impl Registry {
    /// The full bike-share operation set.
    pub fn standard() -> Self {
        let specs = STANDARD.to_vec();
        let by_name = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name, i))
            .collect();
        Self { specs, by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    /// Like [`Registry::lookup`], failing with the caller-facing message.
    pub fn resolve(&self, name: &str) -> Result<&OperationSpec, WorkflowError> {
        self.lookup(name)
            .ok_or_else(|| WorkflowError::InvalidOperation("Invalid invoke function name.".into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_operation_once() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), 19);
        let names: std::collections::BTreeSet<_> = registry.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 19);
    }

    #[test]
    fn unknown_name_is_invalid_operation() {
        let err = Registry::standard().resolve("stealBike").unwrap_err();
        assert_eq!(err.to_string(), "Invalid invoke function name.");
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOperation);
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(Registry::standard().lookup("StartRide").is_none());
    }

    #[test]
    fn arity_message_names_the_schema() {
        let registry = Registry::standard();
        let spec = registry.lookup("registerUser").unwrap();
        let err = spec.check_arity(1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incorrect number of arguments. Expecting 2: {User ID, Balance}. Found 1."
        );
        let spec = registry.lookup("updateBikeLocation").unwrap();
        assert_eq!(spec.arity(), 3);
        assert!(spec.check_arity(3).is_ok());
        assert!(spec.check_arity(4).is_err());
    }

    #[test]
    fn ride_operations_need_the_user_role() {
        let registry = Registry::standard();
        for name in ["startRide", "endRide", "reportIssue", "registerUser"] {
            assert_eq!(registry.lookup(name).unwrap().requirement, USER, "{name}");
        }
    }

    #[test]
    fn queries_are_flagged_read_only() {
        let registry = Registry::standard();
        let queries: Vec<_> = registry
            .iter()
            .filter(|s| s.operation.is_query())
            .map(|s| s.name)
            .collect();
        assert_eq!(
            queries,
            ["getBikesByStatus", "getRidesByStatus", "getIssuesByStatus", "getRepairsByStatus"]
        );
        assert_eq!(
            registry.lookup("getBikesByStatus").unwrap().requirement.label(),
            "Provider/User/Repairer"
        );
    }
}
