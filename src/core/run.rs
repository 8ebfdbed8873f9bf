use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// How serious a recorded finding is.
///
/// Any `Error` fails the run. `Warning`s are informational and never change
/// the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding attributed to the check that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub check: String,
    pub message: String,
}

/// The outcome of one check, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub name: String,
    pub passed: bool,
}

/// Accumulator for one invocation of a harness.
///
/// Created before the first check, appended to as each check completes and
/// handed to a reporter once at the end. Success is derived from the error
/// count alone.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRun {
    pub id: Uuid,
    pub title: String,
    pub records: Vec<CheckRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationRun {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn error(&mut self, check: &str, message: impl Into<String>) {
        self.push(Severity::Error, check, message.into());
    }

    pub fn warning(&mut self, check: &str, message: impl Into<String>) {
        self.push(Severity::Warning, check, message.into());
    }

    fn push(&mut self, severity: Severity, check: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            check: check.to_string(),
            message,
        });
    }

    pub fn record(&mut self, name: &str, passed: bool) {
        self.records.push(CheckRecord {
            name: name.to_string(),
            passed,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.of_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.of_severity(Severity::Warning)
    }

    fn of_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    /// True iff no error was recorded, whatever the warning count.
    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_never_fail_the_run() {
        let mut run = ValidationRun::new("t");
        run.record("a", true);
        run.warning("a", "placeholder present");
        run.warning("a", "tool missing");
        assert!(run.is_success());
        assert_eq!(run.exit_code(), 0);
        assert_eq!(run.warning_count(), 2);
    }

    #[test]
    fn any_error_fails_the_run() {
        let mut run = ValidationRun::new("t");
        run.record("a", true);
        run.record("b", false);
        run.error("b", "missing");
        assert!(!run.is_success());
        assert_eq!(run.exit_code(), 1);
        assert_eq!(run.passed(), 1);
        assert_eq!(run.failed(), 1);
    }

    #[test]
    fn every_outcome_combination_follows_error_count() {
        for errors in 0..3 {
            for warnings in 0..3 {
                let mut run = ValidationRun::new("t");
                for i in 0..errors {
                    run.error("c", format!("e{i}"));
                }
                for i in 0..warnings {
                    run.warning("c", format!("w{i}"));
                }
                assert_eq!(run.is_success(), errors == 0);
            }
        }
    }
}
