//! Validator configuration.
//!
//! Defaults suit most inputs. Override via environment variables, a JSON
//! file, or explicit construction.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default extra tolerance for table-level `min`/`max` equality: none
/// beyond the rounding of the stored component type.
pub const DEFAULT_FLOAT_EPSILON: f64 = 0.0;

/// Tunables of the binary property table validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Relative tolerance when comparing a declared table `min`/`max` to
    /// the computed one, on top of storage rounding. Range checks and
    /// exact integers ignore it.
    pub float_epsilon: f64,
    /// Run the value checks (enum membership, ranges, statistics). The
    /// structural checks always run.
    pub validate_values: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            float_epsilon: DEFAULT_FLOAT_EPSILON,
            validate_values: true,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `TMV_FLOAT_EPSILON` (default: `0`)
    /// - `TMV_VALIDATE_VALUES` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("TMV_FLOAT_EPSILON") {
            config.float_epsilon = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidVariable("TMV_FLOAT_EPSILON".to_string(), raw))?;
        }
        if let Some(raw) = lookup("TMV_VALIDATE_VALUES") {
            config.validate_values = parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidVariable("TMV_VALIDATE_VALUES".to_string(), raw)
            })?;
        }
        config.check()
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.check()
    }

    fn check(self) -> Result<Self, ConfigError> {
        if !self.float_epsilon.is_finite() || self.float_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.float_epsilon));
        }
        Ok(self)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {0}: \"{1}\"")]
    InvalidVariable(String, String),
    /// The tolerance is negative or not finite.
    #[error("floatEpsilon must be a finite non-negative number, got {0}")]
    InvalidEpsilon(f64),
    /// A configuration file could not be read or parsed.
    #[error("cannot load configuration from {path}: {reason}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        reason: String,
    },
}
