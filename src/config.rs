//! Start-up configuration for gtml.
//!
//! Before any file named on the command line is read, the environment is
//! imported as macros, then the rc projects are read in a fixed order, then
//! the `-D` definitions are applied. Everything defined here is visible to
//! every file of the run.

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::{Path, PathBuf};

use crate::cli::parse_define;
use crate::constants::CONFIG_FILES;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::interpreter::process_project;

/// Compiles the `-F` patterns. No pattern means no filtering.
///
/// # Errors
/// * `Error::GlobError` if a pattern is invalid
pub fn build_filter(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

/// Defines one macro per environment variable. Variables that are not valid
/// UTF-8 are skipped; system macro names are refused with a warning.
pub fn define_environment<I, K, V>(ctx: &mut Context, vars: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<std::ffi::OsStr>,
    V: AsRef<std::ffi::OsStr>,
{
    for (name, value) in vars {
        let (Some(name), Some(value)) = (name.as_ref().to_str(), value.as_ref().to_str()) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        ctx.define(name, value);
    }
}

/// The rc projects, in reading order: the home directory first, then the
/// root directory.
pub fn config_files(home: Option<&Path>, root: &Path) -> Vec<PathBuf> {
    home.into_iter()
        .chain(std::iter::once(root))
        .flat_map(|dir| CONFIG_FILES.iter().map(move |file| dir.join(file)))
        .collect()
}

/// Reads every existing rc project. Missing ones are skipped, unreadable
/// ones are reported.
pub fn load_config(ctx: &mut Context, home: Option<&Path>) {
    let root = ctx.root.clone();
    for path in config_files(home, &root) {
        if !path.is_file() {
            debug!("No configuration at '{}'", path.display());
            continue;
        }
        let name = path.to_string_lossy().into_owned();
        if let Err(err) = process_project(ctx, &name) {
            match err {
                Error::FileOpenError { .. } => ctx.diagnostics.warn(err),
                _ => ctx.diagnostics.error(&err),
            }
        }
    }
}

/// Applies `-D MACRO[=DEFINITION]` arguments in order.
pub fn apply_defines(ctx: &mut Context, defines: &[String]) {
    for define in defines {
        let (name, value) = parse_define(define);
        let name = name.trim();
        if name.is_empty() {
            ctx.diagnostics.warn(format!("ignoring empty definition `{define}'"));
            continue;
        }
        ctx.define(name, value);
    }
}

/// Runs the whole start-up sequence.
pub fn configure(ctx: &mut Context, defines: &[String]) {
    define_environment(ctx, std::env::vars_os());
    load_config(ctx, dirs::home_dir().as_deref());
    apply_defines(ctx, defines);
}
