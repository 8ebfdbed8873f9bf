use anyhow::Result;
use std::collections::HashSet;

use crate::builders::matcher;
use crate::core::config::{ContentRule, HarnessConfig};

/// The `ConfigValidator` trait defines the interface for sanity-checking a
/// loaded `HarnessConfig` before any check runs.
///
/// Problems found here are configuration mistakes, not check results, so
/// they stop the harness instead of becoming diagnostics.
pub trait ConfigValidator {
    /// Performs a full validation of the `HarnessConfig` and returns a list
    /// of issues found.
    ///
    /// # Arguments
    /// * `config`: The `HarnessConfig` to be validated, defaults already
    ///   merged in.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` containing a vector of strings, where each
    /// string describes a specific validation issue. An empty vector means
    /// the configuration can be run.
    fn validate_config(&self, config: &HarnessConfig) -> Result<Vec<String>>;

    /// Validates a single `ContentRule` and returns a list of issues.
    ///
    /// # Arguments
    /// * `owner`: The name of the check the rule belongs to, used to
    ///   attribute each issue.
    /// * `rule`: The `ContentRule` to be validated.
    ///
    /// # Returns
    /// A `Vec<String>` describing each problem with the rule: an empty text,
    /// or a `/regex/` that does not compile.
    fn validate_rule(&self, owner: &str, rule: &ContentRule) -> Vec<String>;
}

/// The `StandardValidator` is a concrete implementation of `ConfigValidator`.
///
/// It checks that check names are present and unique, that content
/// patterns compile, that timeouts are positive and that the task runner
/// program is set.
pub struct StandardValidator;

impl StandardValidator {
    /// Creates a new instance of `StandardValidator`.
    pub fn new() -> Self {
        Self
    }

    /// Checks that every check name is non-empty and used only once.
    ///
    /// Names attribute diagnostics in the summary, so two checks sharing a
    /// name would make the report ambiguous.
    ///
    /// # Arguments
    /// * `names`: Every check name in declaration order.
    ///
    /// # Returns
    /// A `Vec<String>` with one issue per empty or repeated name.
    fn check_names(&self, names: &[&str]) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            if name.trim().is_empty() {
                issues.push("Check name cannot be empty".to_string());
            } else if !seen.insert(*name) {
                issues.push(format!("Duplicate check name: {name}"));
            }
        }
        issues
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &HarnessConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();
        let catalog = &config.catalog;
        let plan = &config.plan;

        let mut names: Vec<&str> = Vec::new();
        names.extend(catalog.files.iter().map(|f| f.name.as_str()));
        names.extend(catalog.scripts.iter().map(|s| s.name.as_str()));
        names.extend(catalog.recipe_files.iter().map(|r| r.name.as_str()));
        names.push(catalog.tools_check_name.as_str());
        issues.extend(self.check_names(&names));

        for file in &catalog.files {
            if file.path.trim().is_empty() {
                issues.push(format!("Empty path for {}", file.name));
            }
            for rule in file.required.iter().chain(&file.placeholders) {
                issues.extend(self.validate_rule(&file.name, rule));
            }
        }

        for recipe_file in &catalog.recipe_files {
            if recipe_file.recipes.iter().any(|r| r.trim().is_empty()) {
                issues.push(format!("Empty recipe name in {}", recipe_file.name));
            }
        }

        if catalog.probe_timeout_secs == 0 {
            issues.push("probe_timeout_secs must be greater than 0".to_string());
        }
        if plan.timeout_secs == 0 {
            issues.push("timeout_secs must be greater than 0".to_string());
        }
        if plan.runner.trim().is_empty() {
            issues.push("Task runner program cannot be empty".to_string());
        }
        if plan.missing_argument_invocations.iter().any(Vec::is_empty) {
            issues.push("Missing-argument invocation cannot be empty".to_string());
        }

        Ok(issues)
    }

    fn validate_rule(&self, owner: &str, rule: &ContentRule) -> Vec<String> {
        let mut issues = Vec::new();

        if rule.text.is_empty() {
            issues.push(format!("Empty content rule in {owner} will match everything"));
        }
        if let Err(e) = matcher::compile(rule) {
            issues.push(format!("{owner}: {e:#}"));
        }
        issues
    }
}
