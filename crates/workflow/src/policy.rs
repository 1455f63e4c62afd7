//! Role-based access policy.
//!
//! A role is satisfied by any of its configured principals: an exact,
//! case-sensitive `(organization, certificate issuer common name)` pair.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Provider,
    User,
    Repairer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Provider, Role::User, Role::Repairer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Provider => "Provider",
            Role::User => "User",
            Role::Repairer => "Repairer",
        }
    }

    /// The principal this role accepts when configuration names none.
    pub fn reference_principal(&self) -> Principal {
        let (organization, issuer) = match self {
            Role::Provider => ("ProviderOrgMSP", "ca.providerorg.bikeshare.com"),
            Role::User => ("UserOrgMSP", "ca.userorg.bikeshare.com"),
            Role::Repairer => ("RepairerOrgMSP", "ca.repairerorg.bikeshare.com"),
        };
        Principal::new(organization, issuer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Role(Role),
    /// Satisfied when any listed role is.
    AnyOf(&'static [Role]),
}

impl Requirement {
    pub fn roles(&self) -> &[Role] {
        match self {
            Requirement::Role(role) => std::slice::from_ref(role),
            Requirement::AnyOf(roles) => roles,
        }
    }

    /// `Provider`, or `Provider/User/Repairer` for an `AnyOf`.
    pub fn label(&self) -> String {
        self.roles()
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// An accepted `(organization, issuer common name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Principal {
    pub organization: String,
    pub issuer: String,
}

impl Principal {
    pub fn new(organization: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            issuer: issuer.into(),
        }
    }

    fn matches(&self, organization: &str, issuer: &str) -> bool {
        self.organization == organization && self.issuer == issuer
    }
}

/// The role table consulted for every non-development invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    principals: BTreeMap<Role, Vec<Principal>>,
}

impl AccessPolicy {
    /// One reference principal per role.
    pub fn reference() -> Self {
        Self {
            principals: Role::ALL
                .iter()
                .map(|role| (*role, vec![role.reference_principal()]))
                .collect(),
        }
    }

    /// Build from configuration; roles it omits keep their reference principal.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let mut policy = Self::reference();
        for role in Role::ALL {
            if let Some(configured) = config.for_role(role) {
                policy.principals.insert(role, configured.to_vec());
            }
        }
        policy
    }

    pub fn principals(&self, role: Role) -> &[Principal] {
        self.principals.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn authorize(&self, organization: &str, issuer: &str, requirement: &Requirement) -> bool {
        requirement.roles().iter().any(|role| {
            self.principals(*role)
                .iter()
                .any(|p| p.matches(organization, issuer))
        })
    }

    /// [`AccessPolicy::authorize`] as a `Result` carrying the caller-facing message.
    pub fn check(
        &self,
        organization: &str,
        issuer: &str,
        requirement: &Requirement,
    ) -> Result<(), WorkflowError> {
        if self.authorize(organization, issuer, requirement) {
            Ok(())
        } else {
            Err(WorkflowError::Authorization(format!(
                "Caller not a member of {} Org. Access denied.",
                requirement.label()
            )))
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER: (&str, &str) = ("ProviderOrgMSP", "ca.providerorg.bikeshare.com");
    const USER: (&str, &str) = ("UserOrgMSP", "ca.userorg.bikeshare.com");
    const REPAIRER: (&str, &str) = ("RepairerOrgMSP", "ca.repairerorg.bikeshare.com");

    #[test]
    fn reference_table_accepts_each_role() {
        let policy = AccessPolicy::reference();
        assert!(policy.authorize(PROVIDER.0, PROVIDER.1, &Requirement::Role(Role::Provider)));
        assert!(policy.authorize(USER.0, USER.1, &Requirement::Role(Role::User)));
        assert!(policy.authorize(REPAIRER.0, REPAIRER.1, &Requirement::Role(Role::Repairer)));
    }

    #[test]
    fn roles_do_not_leak_into_each_other() {
        let policy = AccessPolicy::reference();
        assert!(!policy.authorize(USER.0, USER.1, &Requirement::Role(Role::Provider)));
        assert!(!policy.authorize(PROVIDER.0, PROVIDER.1, &Requirement::Role(Role::Repairer)));
    }

    #[test]
    fn organization_and_issuer_must_both_match() {
        let policy = AccessPolicy::reference();
        let provider = Requirement::Role(Role::Provider);
        assert!(!policy.authorize(PROVIDER.0, USER.1, &provider));
        assert!(!policy.authorize(USER.0, PROVIDER.1, &provider));
        assert!(!policy.authorize("providerorgmsp", PROVIDER.1, &provider));
    }

    #[test]
    fn any_of_succeeds_when_one_role_matches() {
        let policy = AccessPolicy::reference();
        let req = Requirement::AnyOf(&[Role::Provider, Role::Repairer]);
        assert!(policy.authorize(REPAIRER.0, REPAIRER.1, &req));
        assert!(!policy.authorize(USER.0, USER.1, &req));
    }

    #[test]
    fn rejection_message_lists_roles() {
        let policy = AccessPolicy::reference();
        let err = policy
            .check("Nobody", "nowhere", &Requirement::AnyOf(&Role::ALL))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Caller not a member of Provider/User/Repairer Org. Access denied."
        );
        let err = policy
            .check("Nobody", "nowhere", &Requirement::Role(Role::User))
            .unwrap_err();
        assert_eq!(err.to_string(), "Caller not a member of User Org. Access denied.");
    }

    #[test]
    fn configured_role_replaces_reference_principal() {
        let config = PolicyConfig {
            provider: Some(vec![
                Principal::new("FleetMSP", "ca.fleet.example"),
                Principal::new("DepotMSP", "ca.depot.example"),
            ]),
            ..PolicyConfig::default()
        };
        let policy = AccessPolicy::from_config(&config);
        let provider = Requirement::Role(Role::Provider);
        assert!(policy.authorize("DepotMSP", "ca.depot.example", &provider));
        assert!(!policy.authorize(PROVIDER.0, PROVIDER.1, &provider));
        // Untouched roles keep the reference entry.
        assert!(policy.authorize(USER.0, USER.1, &Requirement::Role(Role::User)));
    }
}
