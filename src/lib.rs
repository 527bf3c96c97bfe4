//! railgen creates the directory skeleton of a new web application.
//! It resolves the generator options, derives the values templates need and
//! runs an ordered pipeline of file actions against the target directory.

/// File action primitives applied under the application root
pub mod actions;

/// Named assets the skeleton is built from
pub mod catalog;

/// Command-line interface module for the railgen application
pub mod cli;

/// Options files in JSON or YAML format
pub mod config;

/// Memoized values derived from the options and the environment
pub mod context;

/// Error types and handling for the railgen application
pub mod error;

/// Logger setup
pub mod logger;

/// Option schema and resolution
pub mod options;

/// Ordered, guarded generation steps
pub mod pipeline;

/// Template rendering functionality
pub mod renderer;
