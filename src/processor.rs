//! Source file processing.
//!
//! Maps a source file to its output, decides whether it needs to be
//! regenerated, runs the interpreter over it in a file-local scope and
//! writes the result.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{PROJECT_EXTENSION, SOURCE_EXTENSIONS};
use crate::context::{normalize, root_path, Context, Settings};
use crate::deps::is_up_to_date;
use crate::directive::Syntax;
use crate::error::{Error, Result};
use crate::interpreter::{interpret, process_project};

fn extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

pub fn is_source_file(name: &str) -> bool {
    extension(name).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

pub fn is_project_file(name: &str) -> bool {
    extension(name) == Some(PROJECT_EXTENSION)
}

/// Name of the file generated from `source`.
///
/// Returns `None` for files that are neither sources nor outputs, and an
/// error when the result would be the source itself.
pub fn output_name(source: &str, settings: &Settings) -> Result<Option<String>> {
    let Some(ext) = extension(source) else {
        return Ok(None);
    };
    if settings.target_extensions.iter().any(|target| target == ext) {
        return Err(Error::OutputIsInputError { path: source.to_string() });
    }
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return Ok(None);
    }

    let output = normalize(&Path::new(source).with_extension(&settings.extension).to_string_lossy());
    if output == source {
        return Err(Error::OutputIsInputError { path: source.to_string() });
    }
    Ok(Some(output))
}

/// Output path of `output` below the configured output directory.
pub fn target_path(output: &str, settings: &Settings) -> String {
    if settings.output_dir.is_empty() {
        output.to_string()
    } else {
        format!("{}/{}", settings.output_dir, output)
    }
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    fs::write(path, content).map_err(Error::IoError)
}

/// Generated text of one source file.
///
/// While compression is on, lines are held back and flushed as a single
/// line with all whitespace runs collapsed.
#[derive(Debug, Default)]
pub struct Output {
    text: String,
    pending: String,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &str, compress: bool) {
        if compress {
            self.pending.push_str(line);
            self.pending.push('\n');
        } else {
            self.flush();
            self.text.push_str(line);
            self.text.push('\n');
        }
    }

    /// Appends `text` as is, after any pending compressed lines.
    pub fn push_raw(&mut self, text: &str) {
        self.flush();
        self.text.push_str(text);
    }

    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let collapsed = self.pending.split_whitespace().collect::<Vec<_>>().join(" ");
        self.pending.clear();
        if !collapsed.is_empty() {
            self.text.push_str(&collapsed);
            self.text.push('\n');
        }
    }

    pub fn into_string(mut self) -> String {
        self.flush();
        self.text
    }
}

/// Defines the macros describing the source being processed.
fn define_file_macros(ctx: &mut Context, source: &str, output: &str) {
    let path = Path::new(source);
    let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
    let basename = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    let pathname = path.parent().map(|p| normalize(&p.to_string_lossy()));

    ctx.define("ROOT_PATH", &root_path(source));
    ctx.define("BASENAME", &basename.unwrap_or_default());
    ctx.define("FILENAME", &file_name(Path::new(output)).unwrap_or_default());
    ctx.define("SRC_FILENAME", &file_name(path).unwrap_or_default());
    ctx.define("PATHNAME", &pathname.unwrap_or_default());
}

/// Processes one source file, given relative to the context root.
pub fn process_source(ctx: &mut Context, name: &str) -> Result<()> {
    let source = ctx.resolve_alias(name);
    if Path::new(&source).is_absolute() {
        return Err(Error::AbsolutePathError { path: source });
    }

    let Some(output) = output_name(&source, ctx.settings())? else {
        ctx.diagnostics.warn(format!("unknown extension, skipping `{source}'"));
        return Ok(());
    };
    let target = target_path(&output, ctx.settings());
    let project = ctx.project.clone();
    ctx.deps.add_output(&target, &source, project.as_deref());

    let source_path = ctx.root.join(&source);
    let target_path: PathBuf = ctx.root.join(&target);
    if ctx.options.fast && is_up_to_date(&source_path, &target_path) {
        ctx.diagnostics.warn(format!("`{target}' is up to date, skipping `{source}'"));
        return Ok(());
    }

    info!("Processing '{source}'");
    let saved = ctx.scope.clone();
    let previous = ctx.source.replace(source.clone());
    define_file_macros(ctx, &source, &output);
    ctx.refresh_timestamps();

    let mut generated = Output::new();
    let result = interpret(ctx, &source_path, Syntax::Source, Some(&mut generated));

    ctx.scope = saved;
    ctx.source = previous;
    result?;

    if ctx.options.makefile {
        debug!("Not writing '{target}' while generating a makefile");
        return Ok(());
    }
    info!("Writing '{target}'");
    write_file(&target_path, &generated.into_string())
}

/// Processes a file named on the command line: projects are read as project
/// descriptions, anything else as a single source file.
pub fn process_file(ctx: &mut Context, name: &str) -> Result<()> {
    if is_project_file(name) {
        process_project(ctx, name)
    } else {
        process_source(ctx, name)
    }
}
