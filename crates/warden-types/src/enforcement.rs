//! Enforcement actions

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementAction {
    /// Blocks the request
    #[default]
    Deny,
    /// Attached to the response as a warning
    Warn,
    /// Recorded only
    Dryrun,
}

impl EnforcementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::Deny => "deny",
            EnforcementAction::Warn => "warn",
            EnforcementAction::Dryrun => "dryrun",
        }
    }

    /// Validate a raw action string.
    pub fn validate(raw: &str) -> Result<Self, ValidationError> {
        raw.parse()
    }
}

impl FromStr for EnforcementAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny" => Ok(EnforcementAction::Deny),
            "warn" => Ok(EnforcementAction::Warn),
            "dryrun" => Ok(EnforcementAction::Dryrun),
            other => Err(ValidationError::Invalid {
                field: "enforcementAction",
                reason: format!("could not find the provided enforcementAction value {other:?} within the supported list [deny, warn, dryrun]"),
            }),
        }
    }
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_actions() {
        assert_eq!(EnforcementAction::validate("deny").unwrap(), EnforcementAction::Deny);
        assert_eq!(EnforcementAction::validate("warn").unwrap(), EnforcementAction::Warn);
        assert_eq!(
            EnforcementAction::validate("dryrun").unwrap(),
            EnforcementAction::Dryrun
        );
    }

    #[test]
    fn rejects_unknown_and_mixed_case() {
        assert!(EnforcementAction::validate("Deny").is_err());
        assert!(EnforcementAction::validate("block").is_err());
        assert!(EnforcementAction::validate("").is_err());
    }

    #[test]
    fn defaults_to_deny() {
        assert_eq!(EnforcementAction::default(), EnforcementAction::Deny);
    }
}
