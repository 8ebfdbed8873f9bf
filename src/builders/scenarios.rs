use anyhow::{Context, Result};
use std::path::Path;
use tempfile::TempDir;

use crate::builders::matcher;
use crate::builders::reporter::{ProgressReporter, Remediation};
use crate::core::check::{run_checks, Check, CheckContext};
use crate::core::config::TestPlan;
use crate::core::executor::{CommandExecutor, CommandResult};
use crate::core::git::RepositoryProbe;
use crate::core::run::ValidationRun;

pub const TITLE: &str = "Jujutsu justfile integration tests";

/// Invokes recipes through the configured task runner.
pub struct TaskRunner<'a> {
    plan: &'a TestPlan,
    project_root: &'a Path,
    executor: &'a dyn CommandExecutor,
}

impl<'a> TaskRunner<'a> {
    pub fn new(plan: &'a TestPlan, project_root: &'a Path, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            plan,
            project_root,
            executor,
        }
    }

    /// Runs a recipe from the project root.
    pub fn run(&self, args: &[&str]) -> CommandResult {
        let mut command = vec![self.plan.runner.as_str()];
        command.extend_from_slice(args);
        self.executor.execute(&command, None, self.plan.timeout())
    }

    /// Runs a recipe from `dir`, still resolving recipes from the project.
    pub fn run_in(&self, dir: &Path, args: &[&str]) -> CommandResult {
        let mut owned: Vec<String> = vec![self.plan.runner.clone()];
        if let Some(recipe_file) = &self.plan.recipe_file {
            owned.push("--justfile".to_string());
            owned.push(self.project_root.join(recipe_file).display().to_string());
            owned.push("--working-directory".to_string());
            owned.push(dir.display().to_string());
        }
        owned.extend(args.iter().map(|a| a.to_string()));

        let command: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.executor.execute(&command, Some(dir), self.plan.timeout())
    }

    /// Whether `binary` resolves on the search path.
    pub fn resolvable(&self, binary: &str) -> bool {
        self.executor
            .execute(&["which", binary], None, self.plan.timeout())
            .success()
    }
}

/// Builds the scenario battery in its fixed order.
pub fn scenarios<'a>(
    plan: &'a TestPlan,
    project_root: &'a Path,
    executor: &'a dyn CommandExecutor,
    probe: &'a dyn RepositoryProbe,
) -> Vec<Box<dyn Check + 'a>> {
    let runner = || TaskRunner::new(plan, project_root, executor);
    let mut checks: Vec<Box<dyn Check + 'a>> = Vec::new();

    checks.push(Box::new(HelpScenario { plan, runner: runner() }));
    checks.push(Box::new(AvailabilityScenario { plan, runner: runner() }));
    checks.push(Box::new(OutsideRepositoryScenario {
        plan,
        runner: runner(),
        probe,
    }));
    checks.push(Box::new(InitScenario { plan, runner: runner() }));
    checks.push(Box::new(DeprecationScenario { plan, runner: runner() }));
    checks.push(Box::new(RequiredArgumentScenario { plan, runner: runner() }));

    checks
}

/// Runs every scenario and returns the finished run.
pub fn run_scenarios(
    plan: &TestPlan,
    project_root: &Path,
    executor: &dyn CommandExecutor,
    probe: &dyn RepositoryProbe,
    reporter: &dyn ProgressReporter,
) -> ValidationRun {
    let checks = scenarios(plan, project_root, executor, probe);
    run_checks(TITLE, &checks, reporter)
}

pub fn remediation() -> Remediation {
    Remediation {
        all_clear: "All tests passed!".to_string(),
        next_steps: Vec::new(),
        fix_errors: "Some tests failed".to_string(),
        warnings_only: "All tests passed (environment-dependent warnings above)".to_string(),
    }
}

fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("jj-scenario-")
        .tempdir()
        .context("Failed to create temporary directory")
}

struct HelpScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
}

impl Check for HelpScenario<'_> {
    fn name(&self) -> &str {
        "help text"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let recipe = self.plan.help_recipe.as_str();
        let result = self.runner.run(&[recipe]);
        if !result.success() {
            ctx.error(format!(
                "{recipe} failed (exit {}): {}",
                result.exit_code,
                result.stderr.trim()
            ));
            return Ok(false);
        }

        let output = result.combined_output();
        let missing: Vec<&str> = self
            .plan
            .expected_commands
            .iter()
            .map(String::as_str)
            .filter(|name| !output.contains(name))
            .collect();

        if missing.is_empty() {
            return Ok(true);
        }
        for name in &missing {
            ctx.note(&format!("Missing command in help: {name}"));
        }
        ctx.error(format!("Missing commands in {recipe} output: {}", missing.join(", ")));
        Ok(false)
    }
}

/// A failing install check is expected where the tool is not installed.
struct AvailabilityScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
}

impl Check for AvailabilityScenario<'_> {
    fn name(&self) -> &str {
        "tool availability"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let recipe = self.plan.install_check_recipe.as_str();
        let result = self.runner.run(&[recipe]);
        if result.success() {
            ctx.note(&format!("{} is installed", self.plan.tool_binary));
        } else {
            ctx.warning(format!(
                "{} not installed ({recipe} exited {}) - expected in CI environments",
                self.plan.tool_binary, result.exit_code
            ));
        }
        Ok(true)
    }
}

struct OutsideRepositoryScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
    probe: &'a dyn RepositoryProbe,
}

impl Check for OutsideRepositoryScenario<'_> {
    fn name(&self) -> &str {
        "repository check outside repository"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let scratch = scratch_dir()?;
        if let Some(repo) = self.probe.enclosing_repository(scratch.path()) {
            ctx.warning(format!(
                "Temporary directory {} is inside repository {}; result may be unreliable",
                scratch.path().display(),
                repo.display()
            ));
        }

        let recipe = self.plan.repo_check_recipe.as_str();
        let result = self.runner.run_in(scratch.path(), &[recipe]);
        let phrase = self.plan.outside_repo_phrase.as_str();

        let mut passed = true;
        if result.success() {
            ctx.error(format!("{recipe} should fail outside a repository"));
            passed = false;
        }
        if !result.stdout.contains(phrase) && !result.stderr.contains(phrase) {
            ctx.error(format!(
                "Expected message {phrase:?} not found. Output: {}",
                result.combined_output().trim()
            ));
            passed = false;
        }
        Ok(passed)
    }
}

struct InitScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
}

impl Check for InitScenario<'_> {
    fn name(&self) -> &str {
        "init in temporary directory"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let tool = self.plan.tool_binary.as_str();
        if !self.runner.resolvable(tool) {
            ctx.note(&format!("Skipping {} - {tool} not available", self.plan.init_recipe));
            return Ok(true);
        }

        let scratch = scratch_dir()?;
        let result = self.runner.run_in(scratch.path(), &[self.plan.init_recipe.as_str()]);
        if !result.success() {
            ctx.error(format!(
                "{} failed (exit {}): {}",
                self.plan.init_recipe,
                result.exit_code,
                result.stderr.trim()
            ));
            return Ok(false);
        }

        if !scratch.path().join(&self.plan.marker_dir).is_dir() {
            ctx.error(format!("{} directory not created", self.plan.marker_dir));
            return Ok(false);
        }
        Ok(true)
    }
}

struct DeprecationScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
}

impl Check for DeprecationScenario<'_> {
    fn name(&self) -> &str {
        "legacy command deprecation"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let mut passed = true;
        for command in &self.plan.legacy_commands {
            let result = self.runner.run(&[command.as_str()]);
            if !matcher::contains_ignore_case(&result.combined_output(), "deprecated")? {
                ctx.error(format!("No deprecation warning for legacy command: {command}"));
                passed = false;
            }
        }
        Ok(passed)
    }
}

struct RequiredArgumentScenario<'a> {
    plan: &'a TestPlan,
    runner: TaskRunner<'a>,
}

impl Check for RequiredArgumentScenario<'_> {
    fn name(&self) -> &str {
        "parameter validation"
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let mut passed = true;
        for invocation in &self.plan.missing_argument_invocations {
            let args: Vec<&str> = invocation.iter().map(String::as_str).collect();
            let result = self.runner.run(&args);
            if result.success() {
                ctx.error(format!(
                    "{} should fail without its required argument",
                    args.join(" ")
                ));
                passed = false;
            }
        }
        Ok(passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Recording(std::cell::RefCell<Vec<Vec<String>>>);

    impl CommandExecutor for Recording {
        fn execute(&self, command: &[&str], _: Option<&Path>, _: Duration) -> CommandResult {
            self.0
                .borrow_mut()
                .push(command.iter().map(|s| s.to_string()).collect());
            CommandResult::new(0, "", "")
        }
    }

    #[test]
    fn scenarios_in_scratch_dirs_point_back_at_the_project_recipes() {
        let plan = TestPlan::default();
        let executor = Recording(Default::default());
        let runner = TaskRunner::new(&plan, Path::new("/work/project"), &executor);

        runner.run_in(Path::new("/tmp/scratch"), &["_jj-check-repo"]);

        let calls = executor.0.borrow();
        assert_eq!(
            calls[0],
            vec![
                "just",
                "--justfile",
                "/work/project/justfile",
                "--working-directory",
                "/tmp/scratch",
                "_jj-check-repo"
            ]
        );
    }

    #[test]
    fn root_invocations_use_the_runner_directly() {
        let plan = TestPlan::default();
        let executor = Recording(Default::default());
        let runner = TaskRunner::new(&plan, Path::new("/work/project"), &executor);

        runner.run(&["jj-branch", "create"]);

        assert_eq!(executor.0.borrow()[0], vec!["just", "jj-branch", "create"]);
    }
}
