//! Error handling for the gtml application.
//! Defines custom error types and results used throughout the application.

use std::io;
use thiserror::Error;

/// Custom error types for gtml operations.
///
/// Every variant is an "error" in the interpreter's sense: it is logged,
/// counted, and abandons the current item, but never the whole run.
/// Non-fatal conditions are reported as warnings through
/// [`Diagnostics`](crate::context::Diagnostics) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// A file the interpreter needs could not be opened or read
    #[error("Cannot open '{path}': {source}.")]
    FileOpenError { path: String, source: io::Error },

    /// Aliases and direct file references must be relative
    #[error("Absolute path '{path}' is not allowed.")]
    AbsolutePathError { path: String },

    /// The computed output name of a source file is the source itself
    #[error("Output file of '{path}' would overwrite its source.")]
    OutputIsInputError { path: String },

    #[error("Include file '{path}' not found.")]
    IncludeNotFoundError { path: String },

    /// Usually a file that includes itself
    #[error("Include of '{path}' nests too deeply.")]
    IncludeDepthError { path: String },

    /// `elsif` or `else` outside of any conditional block
    #[error("`{directive}` without preceding `if`.")]
    NoPrecedingIfError { directive: String },

    #[error("`{directive}` after `else` in the same conditional block.")]
    ElseAlreadySeenError { directive: String },

    #[error("`{directive}` without matching `if`.")]
    UnmatchedEndifError { directive: String },

    /// Conditions only support `==` and `!=`
    #[error("Unknown comparison operator in condition `{condition}`.")]
    UnknownComparisonError { condition: String },

    /// A call site left one of the macro's formal arguments unresolved
    #[error("Missing argument {index} in call to `{name}`.")]
    MissingArgumentError { name: String, index: usize },

    #[error("Expansion of `{line}` does not terminate.")]
    RecursionLimitError { line: String },

    #[error("`{name}` is disabled, run with --allow-eval to enable it.")]
    EvaluationDisabledError { name: String },

    #[error("Evaluation error: {0}.")]
    EvaluationError(String),

    #[error("Command error: {0}.")]
    CommandError(String),

    /// Represents errors in `-F` file patterns
    #[error("Invalid file pattern: {0}.")]
    GlobError(#[from] globset::Error),

    #[error("Directory walk error: {0}.")]
    WalkError(#[from] walkdir::Error),
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// Only used for failures that leave nothing to continue with, such as an
/// invalid command line or an unwritable makefile.
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
