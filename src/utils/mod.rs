use anyhow::{Context, Result};
use std::path::Path;

use crate::builders::reporter::{
    ConsoleReporter, JsonReporter, ProgressReporter, Remediation, SummaryReporter,
};
use crate::builders::validator::{ConfigValidator, StandardValidator};
use crate::builders::{catalog, scenarios};
use crate::core::config::{ConfigFormat, ConfigManager, ConfigProvider, HarnessConfig};
use crate::core::executor::ProcessExecutor;
use crate::core::git::Git2Probe;
use crate::core::run::ValidationRun;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Loads the configuration and refuses to continue if it is malformed.
pub fn load_validated_config(manager: &ConfigManager) -> Result<HarnessConfig> {
    let config = manager.load_config()?;
    let issues = StandardValidator::new().validate_config(&config)?;

    if issues.is_empty() {
        return Ok(config);
    }

    let source = manager
        .config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    eprintln!("⚠️  Found issues in configuration ({source}):");
    for issue in &issues {
        eprintln!("  - {issue}");
    }
    anyhow::bail!("Configuration validation failed.");
}

/// Runs the static config validator and prints its summary.
pub fn validate_cache(
    manager: &ConfigManager,
    config: &HarnessConfig,
    format: OutputFormat,
) -> Result<ValidationRun> {
    let root = manager.project_root();
    tracing::info!(project_root = %root.display(), "validating cache configuration");

    let executor = ProcessExecutor::new(root);
    let run = with_reporters(format, |progress| {
        catalog::validate_catalog(&config.catalog, root, &executor, progress)
    });
    summarize(format, &run, &catalog::remediation(&config.catalog))?;
    Ok(run)
}

/// Runs the behavioral scenarios against the task runner and prints the summary.
pub fn test_jj(
    manager: &ConfigManager,
    config: &HarnessConfig,
    format: OutputFormat,
) -> Result<ValidationRun> {
    let root = manager.project_root();
    tracing::info!(project_root = %root.display(), runner = %config.plan.runner, "running jj scenarios");

    let executor = ProcessExecutor::new(root);
    let probe = Git2Probe::new(config.plan.marker_dir.clone());
    let run = with_reporters(format, |progress| {
        scenarios::run_scenarios(&config.plan, root, &executor, &probe, progress)
    });
    summarize(format, &run, &scenarios::remediation())?;
    Ok(run)
}

/// Writes the effective configuration to `output`, or stdout when `None`.
pub fn export_config(manager: &ConfigManager, format: ConfigFormat, output: Option<&Path>) -> Result<()> {
    let content = manager.export_config(format)?;

    match output {
        Some(path) => {
            std::fs::write(path, content).context("Failed to write export file")?;
            println!("✓ Exported configuration to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn with_reporters<T>(format: OutputFormat, body: impl FnOnce(&dyn ProgressReporter) -> T) -> T {
    match format {
        OutputFormat::Text => body(&ConsoleReporter::new()),
        OutputFormat::Json => body(&JsonReporter),
    }
}

fn summarize(format: OutputFormat, run: &ValidationRun, remediation: &Remediation) -> Result<()> {
    match format {
        OutputFormat::Text => ConsoleReporter::new().report_summary(run, remediation),
        OutputFormat::Json => JsonReporter.report_summary(run, remediation),
    }
}
