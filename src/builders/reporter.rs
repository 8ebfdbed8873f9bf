use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;

use crate::core::run::{CheckRecord, Diagnostic, ValidationRun};

/// The `ProgressReporter` trait receives progress while a run is executing.
///
/// `run_checks` calls it in declaration order as each check starts and
/// completes, so console output is interleaved with the checks rather than
/// buffered until the end. Implementations decide where progress goes:
/// stdout for the console, the log for JSON mode, nowhere for tests.
pub trait ProgressReporter {
    /// Announces a run before its first check.
    ///
    /// # Arguments
    /// * `run`: The freshly created, still empty `ValidationRun`.
    fn run_started(&self, run: &ValidationRun);

    /// Announces that the named check is about to run.
    ///
    /// # Arguments
    /// * `name`: The check's name as declared in the catalog or plan.
    fn check_started(&self, name: &str);

    /// Shows detail produced while a check runs, such as one missing
    /// recipe name. Notes are not diagnostics and do not affect the outcome.
    ///
    /// # Arguments
    /// * `name`: The check producing the note.
    /// * `message`: The note text.
    fn check_note(&self, name: &str, message: &str);

    /// Reports the outcome of a check once it has completed.
    ///
    /// # Arguments
    /// * `name`: The check that finished.
    /// * `passed`: Whether the check passed, after the fault boundary.
    fn check_finished(&self, name: &str, passed: bool);
}

/// The `SummaryReporter` trait renders the end-of-run summary.
pub trait SummaryReporter {
    /// Writes the summary of a finished run.
    ///
    /// # Arguments
    /// * `run`: The completed `ValidationRun`.
    /// * `remediation`: Closing guidance; which message is shown depends on
    ///   the run's `Outcome`.
    ///
    /// # Returns
    /// A `Result<()>` that fails only if the summary cannot be rendered.
    fn report_summary(&self, run: &ValidationRun, remediation: &Remediation) -> Result<()>;
}

/// Closing guidance, chosen by what the run recorded.
#[derive(Debug, Clone)]
pub struct Remediation {
    pub all_clear: String,
    pub next_steps: Vec<String>,
    pub fix_errors: String,
    pub warnings_only: String,
}

/// Which closing message applies to a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllClear,
    HasErrors,
    WarningsOnly,
}

impl Outcome {
    /// Classifies a run by its recorded diagnostics.
    ///
    /// # Arguments
    /// * `run`: The run to classify.
    ///
    /// # Returns
    /// `HasErrors` if any Error was recorded, `WarningsOnly` if only
    /// Warnings were, and `AllClear` otherwise.
    pub fn of(run: &ValidationRun) -> Self {
        if run.error_count() > 0 {
            Outcome::HasErrors
        } else if run.warning_count() > 0 {
            Outcome::WarningsOnly
        } else {
            Outcome::AllClear
        }
    }
}

/// Human-readable reporter writing to stdout.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// Builds the summary block printed after the last check.
    ///
    /// The block holds the pass/fail counts, every Error and every Warning
    /// (numbered and attributed to their check), and the closing remediation
    /// message. Next steps are listed only on an all-clear run.
    ///
    /// # Arguments
    /// * `run`: The completed `ValidationRun`.
    /// * `remediation`: The guidance to choose the closing message from.
    ///
    /// # Returns
    /// The rendered summary as a `String`, colored unless colors are disabled.
    pub fn render_summary(&self, run: &ValidationRun, remediation: &Remediation) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "{}",
            format!("📋 {} SUMMARY", run.title.to_uppercase()).bold()
        );
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "📊 Results: {} passed, {} failed ({} checks)",
            run.passed(),
            run.failed(),
            run.records.len()
        );

        let errors: Vec<&Diagnostic> = run.errors().collect();
        if !errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", format!("❌ {} error(s) found:", errors.len()).red().bold());
            for (i, error) in errors.iter().enumerate() {
                let _ = writeln!(out, "   {}. [{}] {}", i + 1, error.check, error.message);
            }
        }

        let warnings: Vec<&Diagnostic> = run.warnings().collect();
        if !warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", format!("⚠️  {} warning(s):", warnings.len()).yellow().bold());
            for (i, warning) in warnings.iter().enumerate() {
                let _ = writeln!(out, "   {}. [{}] {}", i + 1, warning.check, warning.message);
            }
        }

        let _ = writeln!(out);
        match Outcome::of(run) {
            Outcome::AllClear => {
                let _ = writeln!(out, "{}", format!("✅ {}", remediation.all_clear).green().bold());
                if !remediation.next_steps.is_empty() {
                    let _ = writeln!(out, "\n🚀 Next steps:");
                    for (i, step) in remediation.next_steps.iter().enumerate() {
                        let _ = writeln!(out, "{}. {step}", i + 1);
                    }
                }
            }
            Outcome::HasErrors => {
                let _ = writeln!(out, "{}", format!("🔧 {}", remediation.fix_errors).red());
            }
            Outcome::WarningsOnly => {
                let _ = writeln!(out, "{}", format!("✅ {}", remediation.warnings_only).green());
            }
        }

        out
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn run_started(&self, run: &ValidationRun) {
        println!("{}\n", format!("🚀 Starting {}...", run.title).bold());
    }

    fn check_started(&self, name: &str) {
        println!("🔍 Checking {name}...");
    }

    fn check_note(&self, _name: &str, message: &str) {
        println!("   {message}");
    }

    fn check_finished(&self, name: &str, passed: bool) {
        if passed {
            println!("{}\n", format!("✅ {name} passed").green());
        } else {
            println!("{}\n", format!("❌ {name} failed").red());
        }
    }
}

impl SummaryReporter for ConsoleReporter {
    fn report_summary(&self, run: &ValidationRun, remediation: &Remediation) -> Result<()> {
        print!("{}", self.render_summary(run, remediation));
        Ok(())
    }
}

/// Machine-readable view of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub id: String,
    pub title: &'a str,
    pub success: bool,
    pub passed: usize,
    pub failed: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub checks: &'a [CheckRecord],
    pub diagnostics: &'a [Diagnostic],
}

impl<'a> RunSummary<'a> {
    pub fn new(run: &'a ValidationRun) -> Self {
        Self {
            id: run.id.to_string(),
            title: &run.title,
            success: run.is_success(),
            passed: run.passed(),
            failed: run.failed(),
            error_count: run.error_count(),
            warning_count: run.warning_count(),
            checks: &run.records,
            diagnostics: &run.diagnostics,
        }
    }
}

/// Emits one JSON document per run; progress goes to the log only.
pub struct JsonReporter;

impl JsonReporter {
    /// Serializes a finished run as a pretty-printed JSON document.
    ///
    /// # Arguments
    /// * `run`: The completed `ValidationRun`.
    ///
    /// # Returns
    /// A `Result<String>` with the `RunSummary` of the run.
    pub fn render(&self, run: &ValidationRun) -> Result<String> {
        serde_json::to_string_pretty(&RunSummary::new(run)).context("Failed to serialize run summary")
    }
}

impl ProgressReporter for JsonReporter {
    fn run_started(&self, run: &ValidationRun) {
        tracing::info!(title = %run.title, run_id = %run.id, "run started");
    }

    fn check_started(&self, name: &str) {
        tracing::info!(check = name, "check started");
    }

    // Must pass the default `warn` filter.
    fn check_note(&self, name: &str, message: &str) {
        tracing::warn!(check = name, "{message}");
    }

    fn check_finished(&self, _name: &str, _passed: bool) {}
}

impl SummaryReporter for JsonReporter {
    fn report_summary(&self, run: &ValidationRun, _remediation: &Remediation) -> Result<()> {
        println!("{}", self.render(run)?);
        Ok(())
    }
}

/// Discards progress. Used where output would only be noise.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn run_started(&self, _run: &ValidationRun) {}
    fn check_started(&self, _name: &str) {}
    fn check_note(&self, _name: &str, _message: &str) {}
    fn check_finished(&self, _name: &str, _passed: bool) {}
}
