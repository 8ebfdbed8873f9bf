//! Declarative validation harness for the nix-blazar binary cache setup and
//! its Jujutsu task recipes.
//!
//! Two harnesses share one design: a list of independent checks, each behind
//! a fault boundary, feeding a `ValidationRun` that collects errors and
//! warnings and is summarised at the end.
pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;
