//! Engine configuration
//!
//! One policy switch: whether a double of a type with no declared interface
//! anywhere in its ancestor chain fails verification (strict) or only
//! produces an advisory (lenient, the default).
//!
//! Sources, later ones win: defaults, a manifest `settings` block, the
//! `MOCKGUARD_REQUIRE_INTERFACES` environment variable, CLI flags.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding [`Config::require_declared_interfaces`]
pub const REQUIRE_INTERFACES_ENV: &str = "MOCKGUARD_REQUIRE_INTERFACES";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Undeclared interfaces are hard failures instead of advisories
    pub require_declared_interfaces: bool,
}

impl Config {
    pub fn strict() -> Self {
        Self {
            require_declared_interfaces: true,
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply the environment override, if set
    pub fn with_env_overrides(self) -> Result<Self> {
        match std::env::var(REQUIRE_INTERFACES_ENV) {
            Ok(raw) => self.with_override(&raw),
            Err(_) => Ok(self),
        }
    }

    fn with_override(mut self, raw: &str) -> Result<Self> {
        self.require_declared_interfaces = parse_flag(raw)?;
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "strict" => Ok(true),
        "0" | "false" | "no" | "off" | "lenient" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, found '{}'",
            REQUIRE_INTERFACES_ENV, other
        ))),
    }
}
