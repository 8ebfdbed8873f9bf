use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::matcher;
use crate::builders::reporter::{ProgressReporter, Remediation};
use crate::core::check::{run_checks, Check, CheckContext};
use crate::core::config::{Catalog, FileRule, RecipeRule, ScriptRule};
use crate::core::executor::CommandExecutor;
use crate::core::run::ValidationRun;

pub const TITLE: &str = "cache setup validation";

/// Builds the static checks in catalog order: config files, scripts,
/// recipe files and finally the optional-tool probe.
pub fn catalog_checks<'a>(
    catalog: &'a Catalog,
    project_root: &'a Path,
    executor: &'a dyn CommandExecutor,
) -> Vec<Box<dyn Check + 'a>> {
    let mut checks: Vec<Box<dyn Check + 'a>> = Vec::new();

    for rule in &catalog.files {
        checks.push(Box::new(FileContentCheck { project_root, rule }));
    }
    for rule in &catalog.scripts {
        checks.push(Box::new(ScriptCheck { project_root, rule }));
    }
    for rule in &catalog.recipe_files {
        checks.push(Box::new(RecipeCheck { project_root, rule }));
    }
    checks.push(Box::new(ToolsCheck { catalog, executor }));

    checks
}

/// Runs every catalog check and returns the finished run.
pub fn validate_catalog(
    catalog: &Catalog,
    project_root: &Path,
    executor: &dyn CommandExecutor,
    reporter: &dyn ProgressReporter,
) -> ValidationRun {
    let checks = catalog_checks(catalog, project_root, executor);
    run_checks(TITLE, &checks, reporter)
}

pub fn remediation(catalog: &Catalog) -> Remediation {
    Remediation {
        all_clear: "All checks passed! Cache setup looks good.".to_string(),
        next_steps: catalog.next_steps.clone(),
        fix_errors: "Please fix the errors above before proceeding.".to_string(),
        warnings_only: "No critical errors found. Warnings can be addressed as needed."
            .to_string(),
    }
}

/// Resolves `relative` under the root, recording an error when it is absent.
fn locate(ctx: &mut CheckContext<'_>, project_root: &Path, relative: &str) -> Option<PathBuf> {
    let path = project_root.join(relative);
    if !path.exists() {
        ctx.error(format!("{relative} not found"));
        return None;
    }
    if !path.is_file() {
        ctx.error(format!("{relative} is not a file"));
        return None;
    }
    Some(path)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_name(relative: &str) -> &str {
    Path::new(relative)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(relative)
}

struct FileContentCheck<'a> {
    project_root: &'a Path,
    rule: &'a FileRule,
}

impl Check for FileContentCheck<'_> {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let Some(path) = locate(ctx, self.project_root, &self.rule.path) else {
            return Ok(false);
        };
        let content = read(&path)?;
        let shown = file_name(&self.rule.path);

        let mut satisfied = true;
        for required in &self.rule.required {
            if !matcher::matches(required, &content)? {
                ctx.error(format!("{} not found in {shown}", required.display_name()));
                satisfied = false;
            }
        }

        // Placeholders only ever add warnings; they never change the outcome.
        for placeholder in &self.rule.placeholders {
            if matcher::matches(placeholder, &content)? {
                ctx.warning(format!(
                    "Placeholder {} found in {shown} - needs to be replaced with an actual value",
                    placeholder.display_name()
                ));
            }
        }

        Ok(satisfied)
    }
}

struct ScriptCheck<'a> {
    project_root: &'a Path,
    rule: &'a ScriptRule,
}

impl Check for ScriptCheck<'_> {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let Some(path) = locate(ctx, self.project_root, &self.rule.path) else {
            return Ok(false);
        };

        if !is_executable(&path)? {
            ctx.warning(format!("{} is not executable", file_name(&self.rule.path)));
        }
        Ok(true)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions()
        .mode();
    Ok(mode & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool> {
    Ok(true)
}

struct RecipeCheck<'a> {
    project_root: &'a Path,
    rule: &'a RecipeRule,
}

impl Check for RecipeCheck<'_> {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let Some(path) = locate(ctx, self.project_root, &self.rule.path) else {
            return Ok(false);
        };
        let content = read(&path)?;

        let missing: Vec<&str> = self
            .rule
            .recipes
            .iter()
            .map(String::as_str)
            .filter(|recipe| !content.contains(recipe))
            .collect();

        if missing.is_empty() {
            return Ok(true);
        }

        for recipe in &missing {
            ctx.note(&format!("Missing recipe: {recipe}"));
        }
        ctx.error(format!(
            "Missing recipes in {}: {}",
            file_name(&self.rule.path),
            missing.join(", ")
        ));
        Ok(false)
    }
}

/// Probes optional tools. Absence is only ever a warning so the harness
/// stays usable on machines without them.
struct ToolsCheck<'a> {
    catalog: &'a Catalog,
    executor: &'a dyn CommandExecutor,
}

impl Check for ToolsCheck<'_> {
    fn name(&self) -> &str {
        &self.catalog.tools_check_name
    }

    fn run(&self, ctx: &mut CheckContext<'_>) -> Result<bool> {
        let timeout = self.catalog.probe_timeout();
        let mut missing_plain = Vec::new();
        let mut missing_hinted = Vec::new();

        for tool in &self.catalog.tools {
            let found = self
                .executor
                .execute(&["which", tool.name.as_str()], None, timeout)
                .success();
            if found {
                continue;
            }

            match &tool.install_hint {
                Some(hint) => missing_hinted.push((tool.name.as_str(), hint.as_str())),
                None => missing_plain.push(tool.name.as_str()),
            }
        }

        if !missing_plain.is_empty() {
            ctx.warning(format!(
                "Missing optional dependencies: {}",
                missing_plain.join(", ")
            ));
        }
        for (name, hint) in missing_hinted {
            ctx.warning(format!("{name} not installed - install with: {hint}"));
        }
        Ok(true)
    }
}
