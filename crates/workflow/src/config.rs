//! Engine configuration.
//!
//! Loaded from TOML by hosts, or built in code with [`EngineConfig::new`].
//!
//! # Example
//!
//! ```toml
//! dev_mode = false
//!
//! [pricing]
//! rate_per_minute = "0.1"
//! cost_scale = 2
//!
//! [ids]
//! collision = "suffix"
//!
//! [bikes]
//! discard_discarded = "reject"
//!
//! [[policy.provider]]
//! organization = "ProviderOrgMSP"
//! issuer = "ca.providerorg.bikeshare.com"
//! ```

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::policy::{Principal, Role};

/// Largest number of decimal places a ride cost may be rounded to.
pub const MAX_COST_SCALE: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Types ─────────────────────────────────────────────────────────────────────

/// Everything an engine needs besides its ledger and clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Skip identity extraction and access checks. Required; there is no
    /// implicit default.
    pub dev_mode: bool,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub bikes: BikeConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// `[pricing]`: ride cost is `elapsed_seconds * rate_per_minute / 60`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub rate_per_minute: Decimal,
    /// Decimal places the cost is rounded to (banker's rounding).
    pub cost_scale: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: Decimal::new(1, 1),
            cost_scale: 2,
        }
    }
}

/// What to do when a derived record id is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdCollision {
    /// Append `-1`, `-2`, ... until the id is free.
    #[default]
    Suffix,
    /// Fail the operation with a conflict.
    Reject,
}

impl IdCollision {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdCollision::Suffix => "suffix",
            IdCollision::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdConfig {
    pub collision: IdCollision,
}

/// What `discardBike` does with a bike that is already discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardPolicy {
    #[default]
    Reject,
    /// Succeed without writing anything.
    Ignore,
}

impl DiscardPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardPolicy::Reject => "reject",
            DiscardPolicy::Ignore => "ignore",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BikeConfig {
    pub discard_discarded: DiscardPolicy,
}

/// `[[policy.<role>]]` principal lists. `None` keeps the reference principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Vec<Principal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Vec<Principal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repairer: Option<Vec<Principal>>,
}

impl PolicyConfig {
    pub fn for_role(&self, role: Role) -> Option<&[Principal]> {
        match role {
            Role::Provider => self.provider.as_deref(),
            Role::User => self.user.as_deref(),
            Role::Repairer => self.repairer.as_deref(),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Default settings with an explicit development-mode choice.
    pub fn new(dev_mode: bool) -> Self {
        Self {
            dev_mode,
            pricing: PricingConfig::default(),
            ids: IdConfig::default(),
            bikes: BikeConfig::default(),
            policy: PolicyConfig::default(),
        }
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pricing.rate_per_minute < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "pricing.rate_per_minute must be non-negative, got {}",
                self.pricing.rate_per_minute
            )));
        }
        if self.pricing.cost_scale > MAX_COST_SCALE {
            return Err(ConfigError::Invalid(format!(
                "pricing.cost_scale must be at most {}, got {}",
                MAX_COST_SCALE, self.pricing.cost_scale
            )));
        }
        for role in Role::ALL {
            let Some(principals) = self.policy.for_role(role) else {
                continue;
            };
            let section = role.as_str().to_lowercase();
            if principals.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "policy.{section} must list at least one principal"
                )));
            }
            for (i, p) in principals.iter().enumerate() {
                if p.organization.trim().is_empty() || p.issuer.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "policy.{section}[{i}] needs a non-empty organization and issuer"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromStr for EngineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: EngineConfig = "dev_mode = true".parse().unwrap();
        assert_eq!(config, EngineConfig::new(true));
        assert_eq!(config.pricing.rate_per_minute, Decimal::new(1, 1));
        assert_eq!(config.pricing.cost_scale, 2);
        assert_eq!(config.ids.collision, IdCollision::Suffix);
        assert_eq!(config.bikes.discard_discarded, DiscardPolicy::Reject);
    }

    #[test]
    fn dev_mode_is_required() {
        let err = "[pricing]\ncost_scale = 3".parse::<EngineConfig>().unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("dev_mode"), "{msg}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn full_file_parses() {
        let text = r#"
dev_mode = false

[pricing]
rate_per_minute = "0.25"
cost_scale = 4

[ids]
collision = "reject"

[bikes]
discard_discarded = "ignore"

[[policy.provider]]
organization = "FleetMSP"
issuer = "ca.fleet.example"

[[policy.provider]]
organization = "DepotMSP"
issuer = "ca.depot.example"
"#;
        let config: EngineConfig = text.parse().unwrap();
        assert!(!config.dev_mode);
        assert_eq!(config.pricing.rate_per_minute, Decimal::new(25, 2));
        assert_eq!(config.pricing.cost_scale, 4);
        assert_eq!(config.ids.collision, IdCollision::Reject);
        assert_eq!(config.bikes.discard_discarded, DiscardPolicy::Ignore);
        assert_eq!(config.policy.provider.as_ref().map(Vec::len), Some(2));
        assert!(config.policy.user.is_none());
    }

    #[test]
    fn negative_rate_is_invalid() {
        let err = "dev_mode = true\n[pricing]\nrate_per_minute = \"-0.1\""
            .parse::<EngineConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn oversized_scale_is_invalid() {
        let err = "dev_mode = true\n[pricing]\ncost_scale = 11"
            .parse::<EngineConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn empty_principal_fields_are_invalid() {
        let text = "dev_mode = false\n[[policy.user]]\norganization = \"\"\nissuer = \"ca\"";
        let err = text.parse::<EngineConfig>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: policy.user[0] needs a non-empty organization and issuer"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!("dev_mode = true\nverbose = true".parse::<EngineConfig>().is_err());
        assert!("dev_mode = true\n[ids]\nstrategy = \"suffix\""
            .parse::<EngineConfig>()
            .is_err());
    }

    #[test]
    fn unknown_collision_strategy_is_rejected() {
        assert!("dev_mode = true\n[ids]\ncollision = \"retry\""
            .parse::<EngineConfig>()
            .is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EngineConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
