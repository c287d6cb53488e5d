//! # tmv-cli — Metadata Validator Command-Line Interface
//!
//! Thin front end over `tmv-validate`. Argument parsing lives in the binary;
//! the handlers here return process exit codes and write to any
//! [`std::io::Write`], so they can be exercised without spawning a process.
//!
//! ## Subcommands
//!
//! - `validate`: validate a metadata document, print issues and a summary
//! - `inspect`: print the values of a property table as JSON
//!
//! ## Exit Codes
//!
//! - `0`: no ERROR issues
//! - `1`: ERROR issues present
//! - `2`: operational failure (unreadable input, bad configuration)

use std::path::Path;

use anyhow::{Context, Result};

use tmv_validate::ValidatorConfig;

pub mod inspect;
pub mod validate;

/// Exit code: no ERROR issues.
pub const EXIT_OK: u8 = 0;
/// Exit code: ERROR issues present.
pub const EXIT_ISSUES: u8 = 1;
/// Exit code: the command could not run.
pub const EXIT_FAILURE: u8 = 2;

/// Load the validator configuration from `path`, or from the environment
/// when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ValidatorConfig> {
    match path {
        Some(path) => ValidatorConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => ValidatorConfig::from_env().context("invalid configuration in environment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmv.json");
        std::fs::write(&path, r#"{"floatEpsilon": 0.5, "validateValues": false}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.float_epsilon, 0.5);
        assert!(!config.validate_values);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }
}
