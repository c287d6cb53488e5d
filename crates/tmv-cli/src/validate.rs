//! # Validate Subcommand
//!
//! Validates one metadata document and prints every issue as
//! `SEVERITY TYPE path: message`, followed by a summary line. With `--json`
//! the report is printed as JSON instead.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tmv_core::{Severity, ValidationResult};
use tmv_validate::{DocumentValidator, ValidatorConfig};

use crate::{EXIT_ISSUES, EXIT_OK};

/// Arguments for the `tmv validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// The metadata document to validate.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when no ERROR issues were found, 1 otherwise.
pub fn run_validate(
    args: &ValidateArgs,
    config: &ValidatorConfig,
    out: &mut impl Write,
) -> Result<u8> {
    let validator = DocumentValidator::new(config.clone());
    let result = validator
        .validate_file(&args.document)
        .with_context(|| format!("failed to read {}", args.document.display()))?;

    tracing::info!(
        document = %args.document.display(),
        issues = result.len(),
        "validation finished"
    );

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &result.to_report())
            .context("failed to write report")?;
        writeln!(out)?;
    } else {
        write_text_report(&result, out)?;
    }

    if result.has_errors() {
        Ok(EXIT_ISSUES)
    } else {
        Ok(EXIT_OK)
    }
}

fn write_text_report(result: &ValidationResult, out: &mut impl Write) -> Result<()> {
    for issue in result {
        writeln!(out, "{issue}")?;
    }
    let errors = result.count_severity(Severity::Error);
    let warnings = result.count_severity(Severity::Warning);
    let infos = result.count_severity(Severity::Info);
    if result.is_empty() {
        writeln!(out, "OK: no issues found")?;
    } else {
        writeln!(
            out,
            "{} issue(s): {errors} error(s), {warnings} warning(s), {infos} info(s)",
            result.len()
        )?;
    }
    Ok(())
}
