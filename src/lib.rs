//! gtml is a macro and directive processor for groups of HTML files.
//! It expands user-defined macros inside source files, evaluates conditional
//! blocks, builds navigation links and tables of contents from a page
//! hierarchy described in project files, and tracks file dependencies.

/// Command-line interface module for the gtml application
pub mod cli;

/// Conditional block stack for `if`/`elsif`/`else`/`endif`
pub mod conditional;

/// Start-up configuration: environment, rc projects and `-D` definitions
pub mod config;

/// Application-wide constants and defaults
pub mod constants;

/// Interpreter context, settings and diagnostics
pub mod context;

/// Dependency tracking and makefile generation
pub mod deps;

/// Line classification for project and source files
pub mod directive;

/// Error types and handling for the gtml application
pub mod error;

/// Expression evaluation and command execution backends
pub mod eval;

/// Page hierarchy, navigation links and tables of contents
pub mod hierarchy;

/// Directive interpreter for project descriptions and source files
pub mod interpreter;

pub mod logger;

/// Macro table, character map and argument markers
pub mod macros;

/// Source file processing and output generation
pub mod processor;

/// Line reader joining backslash continuations
pub mod reader;

/// Macro substitution engine
pub mod substitute;

/// Localized timestamp formatting
pub mod timestamp;
