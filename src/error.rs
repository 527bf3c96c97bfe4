//! Error handling for railgen.
//! Defines the error taxonomy and the result type used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving options or generating a skeleton.
///
/// Option-related variants are raised before the pipeline starts. Asset,
/// template and path variants abort the pipeline at the failing step and
/// leave the partially generated tree on disk.
#[derive(Error, Debug)]
pub enum Error {
    /// An option name that is not part of the declared schema was supplied.
    #[error("Unknown option '{name}'.")]
    UnknownOption { name: String },

    /// A supplied value does not match the declared type of the option.
    #[error("Option '{name}' expects a {expected} value, got {found}.")]
    OptionType { name: String, expected: &'static str, found: String },

    /// A supplied value is not one of the option's enumerated choices.
    #[error("Invalid value '{value}' for option '{name}' (options: {choices}).")]
    InvalidChoice { name: String, value: String, choices: String },

    /// The options file could not be interpreted.
    #[error("Configuration error: {0}.")]
    Config(String),

    /// The named asset is not present in the asset catalog.
    #[error("Source asset '{name}' was not found in {catalog}.")]
    SourceAssetMissing { name: String, catalog: String },

    /// Rendering a template failed (undefined reference or syntax error).
    #[error("Failed to render template '{name}': {source}.")]
    TemplateRender {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// A permission change targeted a path that does not exist.
    #[error("Path '{}' does not exist.", path.display())]
    PathNotFound { path: PathBuf },

    /// The target path cannot be used as an application root.
    #[error("Invalid target path '{}': {reason}.", path.display())]
    InvalidTarget { path: PathBuf, reason: String },

    /// The operating system could not provide random bytes.
    #[error("Failed to gather random bytes: {0}.")]
    Entropy(String),

    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
