//! Command-line entry: argument parsing and wiring of collaborators.

/// CLI arguments.
pub mod args;

/// Builds collaborators from settings and drives one monitoring run.
pub mod run;
