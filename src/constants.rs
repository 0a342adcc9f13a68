//! Common constants used throughout the gtml application.

/// Pseudo-macro evaluating its argument as an expression
pub const EVAL_MACRO: &str = "__PYTHON__";

/// Pseudo-macro running its argument as a shell command
pub const SYSTEM_MACRO: &str = "__SYSTEM__";

pub const NEWLINE_MACRO: &str = "__NEWLINE__";

pub const TAB_MACRO: &str = "__TAB__";

/// Names that can never be stored in the macro table
pub const RESERVED_MACROS: [&str; 4] = [EVAL_MACRO, SYSTEM_MACRO, NEWLINE_MACRO, TAB_MACRO];

/// Startup files, looked up in the home directory then in the current one
pub const CONFIG_FILES: [&str; 2] = [".gtmlrc", "gtml.conf"];

pub const PROJECT_EXTENSION: &str = "gtp";

pub const SOURCE_EXTENSIONS: [&str; 2] = ["gtm", "gtml"];

pub const DEFAULT_EXTENSION: &str = "html";

pub const DEFAULT_OPEN_DELIMITER: &str = "<<";

pub const DEFAULT_CLOSE_DELIMITER: &str = ">>";

pub const DEFAULT_ARGUMENT_SEPARATOR: &str = ",";

pub const DEFAULT_LANGUAGE: &str = "en";

pub const DEFAULT_MAKEFILE: &str = "GNUmakefile";

/// Substitutions allowed on a single line before it is considered runaway
pub const MAX_EXPANSIONS: usize = 1000;

/// Deepest allowed nesting of included files
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Navigation macros recomputed for every page of the hierarchy
pub const NAVIGATION_MACROS: [&str; 7] = [
    "TITLE_CURRENT",
    "TITLE_UP",
    "LINK_UP",
    "TITLE_NEXT",
    "LINK_NEXT",
    "TITLE_PREV",
    "LINK_PREV",
];
