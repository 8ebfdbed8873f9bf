use crate::builders::catalog::{validate_catalog, TITLE};
use crate::builders::reporter::SilentReporter;
use crate::core::config::Catalog;
use crate::core::executor::{CommandExecutor, CommandResult};
use crate::core::run::ValidationRun;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Every `which` probe succeeds.
struct AllToolsInstalled;

impl CommandExecutor for AllToolsInstalled {
    fn execute(&self, _: &[&str], _: Option<&Path>, _: Duration) -> CommandResult {
        CommandResult::new(0, "", "")
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[cfg(unix)]
fn make_executable(root: &Path, relative: &str, executable: bool) {
    use std::os::unix::fs::PermissionsExt;
    let path = root.join(relative);
    let mode = if executable { 0o755 } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_root: &Path, _relative: &str, _executable: bool) {}

const JUSTFILE: &str = "\
cache-setup:\n\tcachix use nix-blazar\n\
cache-push-packages:\n\t./scripts/cache-manager.sh packages\n\
cache-push-devshells:\n\t./scripts/cache-manager.sh devshells\n\
cache-push-system:\n\t./scripts/cache-manager.sh system\n\
cache-push-all: cache-push-packages cache-push-devshells cache-push-system\n\
cache-status:\n\t./scripts/cache-manager.sh status\n";

/// A project tree that satisfies the default catalog.
fn setup_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let nix_settings = "extra-substituters = [ \"https://nix-blazar.cachix.org\" ];\n\
        extra-trusted-public-keys = [ \"nix-blazar.cachix.org-1:abc=\" ];\n";

    write(root, "flake.nix", nix_settings);
    write(root, "modules/base/nix.nix", nix_settings);
    write(
        root,
        "secrets/sops/default.nix",
        "sops.secrets.CACHIX_AUTH_TOKEN = {};\nsops.secrets.CACHIX_SIGNING_KEY = {};\n",
    );
    write(
        root,
        ".github/workflows/cache-management.yml",
        "steps:\n  - uses: cachix/cachix-action@v15\n    with:\n      authToken: ${{ secrets.CACHIX_AUTH_TOKEN }}\n",
    );
    write(root, "scripts/cache-manager.sh", "#!/bin/sh\necho ok\n");
    make_executable(root, "scripts/cache-manager.sh", true);
    write(root, "justfile", JUSTFILE);
    dir
}

fn validate(root: &Path) -> ValidationRun {
    validate_catalog(&Catalog::default(), root, &AllToolsInstalled, &SilentReporter)
}

fn failed_checks(run: &ValidationRun) -> Vec<&str> {
    run.records
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.name.as_str())
        .collect()
}

#[test]
fn complete_project_passes_cleanly() {
    let project = setup_project();
    let run = validate(project.path());

    assert_eq!(run.title, TITLE);
    assert!(run.is_success(), "{:?}", run.diagnostics);
    assert_eq!(run.warning_count(), 0);
    assert_eq!(run.records.len(), 7);
    assert_eq!(run.passed(), 7);
}

#[test]
fn checks_run_in_catalog_order() {
    let project = setup_project();
    let names: Vec<_> = validate(project.path())
        .records
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "flake configuration",
            "nix base configuration",
            "secrets configuration",
            "CI workflow",
            "cache management script",
            "justfile recipes",
            "dependencies",
        ]
    );
}

#[test]
fn placeholder_adds_a_warning_without_changing_the_outcome() {
    let project = setup_project();
    let before = validate(project.path());

    write(
        project.path(),
        "flake.nix",
        "extra-substituters = [ \"https://nix-blazar.cachix.org\" ];\n\
         extra-trusted-public-keys = [ \"YOUR_CACHE_PUBLIC_KEY_HERE\" ];\n",
    );
    let after = validate(project.path());

    assert_eq!(before.records[0].passed, after.records[0].passed);
    assert!(after.is_success());
    assert_eq!(after.warning_count(), before.warning_count() + 1);
    let warning = after.warnings().next().unwrap();
    assert_eq!(warning.check, "flake configuration");
    assert!(warning.message.contains("YOUR_CACHE_PUBLIC_KEY_HERE"));
}

#[test]
fn missing_recipe_is_listed_on_its_own() {
    let project = setup_project();
    let trimmed: String = JUSTFILE
        .lines()
        .filter(|l| !l.starts_with("cache-status") && !l.contains("cache-manager.sh status"))
        .map(|l| format!("{l}\n"))
        .collect();
    write(project.path(), "justfile", &trimmed);

    let run = validate(project.path());
    assert!(!run.is_success());
    assert_eq!(failed_checks(&run), vec!["justfile recipes"]);
    let errors: Vec<_> = run.errors().map(|d| d.message.as_str()).collect();
    assert_eq!(errors, vec!["Missing recipes in justfile: cache-status"]);
}

#[test]
fn missing_required_content_reports_each_entry() {
    let project = setup_project();
    write(project.path(), "secrets/sops/default.nix", "sops.secrets = {};\n");

    let run = validate(project.path());
    let errors: Vec<_> = run.errors().map(|d| d.message.as_str()).collect();
    assert_eq!(
        errors,
        vec![
            "CACHIX_AUTH_TOKEN not found in default.nix",
            "CACHIX_SIGNING_KEY not found in default.nix",
        ]
    );
}

#[test]
fn workflow_mentions_cachix_in_any_case() {
    let project = setup_project();
    write(
        project.path(),
        ".github/workflows/cache-management.yml",
        "name: Push to CACHIX\nenv:\n  TOKEN: ${{ secrets.CACHIX_AUTH_TOKEN }}\n",
    );
    assert!(validate(project.path()).is_success());

    write(
        project.path(),
        ".github/workflows/cache-management.yml",
        "name: build\n",
    );
    let run = validate(project.path());
    let errors: Vec<_> = run.errors().map(|d| d.message.as_str()).collect();
    assert_eq!(
        errors,
        vec![
            "Cachix steps not found in cache-management.yml",
            "Cache authentication not found in cache-management.yml",
        ]
    );
}

#[cfg(unix)]
#[test]
fn non_executable_script_is_only_a_warning() {
    let project = setup_project();
    make_executable(project.path(), "scripts/cache-manager.sh", false);

    let run = validate(project.path());
    assert!(run.is_success());
    let warnings: Vec<_> = run.warnings().map(|d| d.message.as_str()).collect();
    assert_eq!(warnings, vec!["cache-manager.sh is not executable"]);
}

#[test]
fn directory_in_place_of_script_is_an_error() {
    let project = setup_project();
    let script = project.path().join("scripts/cache-manager.sh");
    fs::remove_file(&script).unwrap();
    fs::create_dir(&script).unwrap();

    let run = validate(project.path());
    assert_eq!(failed_checks(&run), vec!["cache management script"]);
    assert_eq!(
        run.errors().next().map(|d| d.message.as_str()),
        Some("scripts/cache-manager.sh is not a file")
    );
}

#[test]
fn later_checks_still_run_after_an_early_failure() {
    let project = setup_project();
    fs::remove_file(project.path().join("flake.nix")).unwrap();
    fs::remove_file(project.path().join("justfile")).unwrap();

    let run = validate(project.path());
    assert_eq!(run.records.len(), 7);
    assert_eq!(failed_checks(&run), vec!["flake configuration", "justfile recipes"]);
    assert_eq!(run.error_count(), 2);
    assert_eq!(run.exit_code(), 1);
}
