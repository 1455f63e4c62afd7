//! Caller identity as presented by the hosting ledger.

use crate::error::WorkflowError;

/// Source of the invoking principal. Extraction failures are fatal to the
/// invocation; there is no fallback identity.
pub trait CallerIdentity: Send + Sync {
    /// The caller's organization (membership service provider id).
    fn organization(&self) -> Result<String, WorkflowError>;

    /// Common name of the authority that issued the caller's certificate.
    fn issuer_common_name(&self) -> Result<String, WorkflowError>;
}

/// An identity already extracted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub organization: String,
    pub issuer: String,
}

impl Caller {
    pub fn new(organization: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            issuer: issuer.into(),
        }
    }
}

impl CallerIdentity for Caller {
    fn organization(&self) -> Result<String, WorkflowError> {
        Ok(self.organization.clone())
    }

    fn issuer_common_name(&self) -> Result<String, WorkflowError> {
        Ok(self.issuer.clone())
    }
}

/// No identity attached. Every extraction fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CallerIdentity for Anonymous {
    fn organization(&self) -> Result<String, WorkflowError> {
        Err(extraction_failed("no caller organization"))
    }

    fn issuer_common_name(&self) -> Result<String, WorkflowError> {
        Err(extraction_failed("no certificate issuer"))
    }
}

pub fn extraction_failed(reason: &str) -> WorkflowError {
    WorkflowError::Identity(format!("Error extracting creator identity info: {reason}"))
}
