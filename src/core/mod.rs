// This file is the module declaration file for the `core` module.
// It declares the submodules that hold the harness machinery shared by
// both the static validator and the behavioral test runner.

// `check` module:
// Defines the `Check` capability, the `CheckContext` handed to a running
// check, and `run_checks`, which drives a list of checks in order and wraps
// each one in a fault boundary so a failing or panicking check never stops
// the rest.
pub mod check;

// `config` module:
// The serde data model for the fixed catalogs (`Catalog`, `TestPlan`),
// the `ConfigProvider` trait and `ConfigManager`, which resolves the
// project root and loads an optional TOML/YAML/JSON override file.
pub mod config;

// `executor` module:
// The `CommandExecutor` abstraction over external processes. The real
// implementation enforces a timeout and never fails: faults are folded
// into a `CommandResult`.
pub mod executor;

// `git` module:
// `RepositoryProbe`, used to confirm a scratch directory is not inside a
// Git or Jujutsu repository.
pub mod git;

// `run` module:
// `ValidationRun`, the accumulator of check records and diagnostics for a
// single invocation.
pub mod run;
