use anyhow::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::builders::reporter::ProgressReporter;
use crate::core::run::ValidationRun;

/// A single named unit of validation.
///
/// A check inspects the environment, records diagnostics through the
/// context and returns whether it passed. Returning `Err` or panicking is
/// allowed: the runner turns either into an error attributed to the check.
pub trait Check {
    fn name(&self) -> &str;

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool>;
}

/// Handle given to a running check for recording what it finds.
pub struct CheckContext<'a> {
    check: &'a str,
    run: &'a mut ValidationRun,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        check: &'a str,
        run: &'a mut ValidationRun,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            check,
            run,
            reporter,
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(check = self.check, %message, "error recorded");
        self.run.error(self.check, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(check = self.check, %message, "warning recorded");
        self.run.warning(self.check, message);
    }

    /// Progress detail shown immediately, without becoming a diagnostic.
    pub fn note(&self, message: &str) {
        self.reporter.check_note(self.check, message);
    }
}

/// Runs `checks` in order, each behind its own fault boundary.
///
/// Every check runs even after earlier ones fail; the run's success is the
/// absence of errors once all of them are done.
pub fn run_checks(
    title: &str,
    checks: &[Box<dyn Check + '_>],
    reporter: &dyn ProgressReporter,
) -> ValidationRun {
    let mut run = ValidationRun::new(title);
    let run_id = run.id.to_string();
    reporter.run_started(&run);

    for check in checks {
        let name = check.name();
        let _span = tracing::info_span!("check", check = name, run_id = %run_id).entered();
        reporter.check_started(name);

        let errors_before = run.error_count();
        let passed = {
            let mut ctx = CheckContext::new(name, &mut run, reporter);
            match panic::catch_unwind(AssertUnwindSafe(|| check.run(&mut ctx))) {
                Ok(Ok(passed)) => passed,
                Ok(Err(err)) => {
                    ctx.error(format!("Check failed with exception: {err:#}"));
                    false
                }
                Err(payload) => {
                    ctx.error(format!("Check panicked: {}", panic_message(payload.as_ref())));
                    false
                }
            }
        };

        // A failure always leaves at least one error behind so the exit
        // status can be derived from the error count alone.
        if !passed && run.error_count() == errors_before {
            run.error(name, format!("{name} failed"));
        }

        tracing::info!(passed, "check finished");
        run.record(name, passed);
        reporter.check_finished(name, passed);
    }

    run
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
