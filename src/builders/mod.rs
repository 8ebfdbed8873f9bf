// This file is the module declaration file for the `builders` module.
// It declares the modules that build and report the two harnesses.

// `catalog` module:
// The static config validator. Builds one check per catalog entry (config
// files, helper scripts, recipe files) plus the optional-tool probe.
pub mod catalog;

// `matcher` module:
// Compiles a `ContentRule` into a regex, treating `/.../` as a raw pattern
// and anything else as an escaped literal.
pub mod matcher;

// `reporter` module:
// Progress and summary reporters. `ConsoleReporter` prints interleaved
// pass/fail lines and the final summary; `JsonReporter` emits one JSON
// document per run.
pub mod reporter;

// `scenarios` module:
// The behavioral test runner: a fixed battery of scenarios exercising the
// task runner's jj recipes.
pub mod scenarios;

// `validator` module:
// Sanity checks for a loaded configuration (`ConfigValidator`), run before
// any check executes.
pub mod validator;
