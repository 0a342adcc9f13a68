//! Directive interpreter.
//!
//! Reads a project description or a source file line by line, keeps the
//! file's conditional stack, and dispatches every emitted line to the
//! handler of its directive. Includes recurse into [`interpret`] with a
//! fresh conditional stack.

use log::{debug, info};
use regex::Regex;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::conditional::ConditionalStack;
use crate::constants::{MAX_INCLUDE_DEPTH, NAVIGATION_MACROS};
use crate::context::{normalize, Context};
use crate::directive::{parse, DefineKind, Directive, Syntax};
use crate::error::{Error, Result};
use crate::hierarchy::{add_page, set_links, sitemap, toc, PageEntry};
use crate::macros::{declared_name, markup, split_definition};
use crate::processor::{is_source_file, process_source, Output};
use crate::reader::LineReader;
use crate::substitute::{expand, substitute};

/// `LEFT == RIGHT` or `LEFT != RIGHT`.
static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*?)\s*(==|!=)\s*(.*)$").expect("comparison pattern is valid")
});

/// Per-file interpreter state.
struct FileState<'a> {
    path: &'a Path,
    display: String,
    syntax: Syntax,
    stack: ConditionalStack,
    literal: bool,
}

impl FileState<'_> {
    /// Directive spelling used in messages.
    fn keyword(&self, name: &str) -> String {
        match self.syntax {
            Syntax::Source => format!("#{name}"),
            Syntax::Project => name.to_string(),
        }
    }
}

/// Splits `word rest` on the first run of whitespace.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

/// Evaluates `VAR == VALUE` or `VAR != VALUE`. Both operands are expanded;
/// a bare left operand naming a defined macro is compared by value.
fn condition(ctx: &mut Context, text: &str) -> Result<bool> {
    let caps = COMPARISON_RE.captures(text).ok_or_else(|| {
        Error::UnknownComparisonError { condition: text.trim().to_string() }
    })?;
    let left = caps.get(1).map_or("", |m| m.as_str().trim());
    let right = caps.get(3).map_or("", |m| m.as_str().trim());
    let equal = caps.get(2).is_some_and(|m| m.as_str() == "==");

    let bare = !left.contains(ctx.settings().open_delimiter.as_str());
    let value = if bare { ctx.lookup(left).map(String::from) } else { None };
    let left = match value {
        Some(value) => value,
        None => expand(ctx, left),
    };
    let right = expand(ctx, right);

    Ok((left.trim() == right.trim()) == equal)
}

fn is_defined(ctx: &mut Context, name: &str) -> bool {
    let name = expand(ctx, name);
    ctx.lookup(name.trim()).is_some()
}

fn conditional(ctx: &mut Context, state: &mut FileState, directive: Directive) -> Result<()> {
    match directive {
        Directive::If(text) => state.stack.push_if(|| condition(ctx, text)),
        Directive::Ifdef(name) => state.stack.push_if(|| Ok(is_defined(ctx, name))),
        Directive::Ifndef(name) => state.stack.push_if(|| Ok(!is_defined(ctx, name))),
        Directive::Elsif(text) => {
            let keyword = state.keyword("elsif");
            state.stack.elsif(&keyword, || condition(ctx, text))
        }
        Directive::Else => {
            let keyword = state.keyword("else");
            state.stack.otherwise(&keyword)
        }
        Directive::Endif => {
            let keyword = state.keyword("endif");
            state.stack.endif(&keyword)
        }
        _ => Ok(()),
    }
}

/// Handles the five define variants.
fn define(ctx: &mut Context, kind: DefineKind, text: &str) {
    let text = if kind.expands() { expand(ctx, text) } else { text.to_string() };
    let (declaration, value) = split_definition(&text);
    if declaration.is_empty() {
        ctx.diagnostics.warn("definition without a name");
        return;
    }

    let name = declared_name(declaration);
    if kind.keeps_existing() && ctx.lookup(name).is_some() {
        debug!("Keeping existing definition of `{name}'");
        return;
    }
    // A new formal list starts its markers from scratch.
    if declaration.contains('(') && kind != DefineKind::Append {
        ctx.undefine(name);
    }

    let separator = ctx.settings().separator.clone();
    let current = ctx.lookup(name).map(String::from);
    let marked = markup(declaration, value, current.as_deref(), &separator);
    let value = match kind {
        DefineKind::Append => format!("{}{}", current.unwrap_or_default(), marked),
        _ => marked,
    };
    ctx.define(name, &value);
}

/// Finds an included file: next to the including file, then along
/// `INCLUDE_PATH`, then in the root directory.
fn resolve_include(ctx: &Context, from: &Path, name: &str) -> Result<PathBuf> {
    let not_found = || Error::IncludeNotFoundError { path: name.to_string() };
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf()).ok_or_else(not_found);
    }

    let mut directories: Vec<PathBuf> = from.parent().map(Path::to_path_buf).into_iter().collect();
    directories.extend(ctx.settings().include_path.iter().map(|dir| ctx.root.join(dir)));
    directories.push(ctx.root.clone());

    directories
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(not_found)
}

fn include(
    ctx: &mut Context,
    state: &FileState,
    name: &str,
    literal: bool,
    output: Option<&mut Output>,
) -> Result<()> {
    let name = expand(ctx, name);
    let name = ctx.resolve_alias(&name);
    let path = resolve_include(ctx, state.path, &name)?;
    let included = ctx.relative(&path);
    ctx.deps.add_edge(state.display.as_str(), included.as_str());

    if ctx.diagnostics.depth() >= MAX_INCLUDE_DEPTH {
        return Err(Error::IncludeDepthError { path: included });
    }
    if !literal {
        return interpret(ctx, &path, state.syntax, output);
    }

    let text = fs::read_to_string(&path)
        .map_err(|source| Error::FileOpenError { path: included, source })?;
    if let Some(output) = output {
        output.push_raw(&text);
        if !text.is_empty() && !text.ends_with('\n') {
            output.push_raw("\n");
        }
    }
    Ok(())
}

/// Processes a source named by a project, unless `-F` filters it out.
fn process_filtered(ctx: &mut Context, name: &str) -> Result<()> {
    if let Some(filter) = &ctx.options.filter {
        if !filter.is_match(name) {
            debug!("Skipping '{name}', not selected with -F");
            return Ok(());
        }
    }
    process_source(ctx, name)
}

/// Handles a file reference of a project: `file [level title]`.
fn file_entry(ctx: &mut Context, text: &str) -> Result<()> {
    let entry = expand(ctx, text);
    let (name, rest) = split_word(&entry);
    let path = ctx.resolve_alias(name);
    if Path::new(&path).is_absolute() {
        return Err(Error::AbsolutePathError { path });
    }
    if rest.is_empty() {
        return process_filtered(ctx, &path);
    }

    let (level, title) = split_word(rest);
    match level.parse::<usize>() {
        Ok(level) if level >= 1 => {
            debug!("Adding page '{path}' at level {level}");
            add_page(ctx, PageEntry::new(path, level, title));
            Ok(())
        }
        _ => {
            ctx.diagnostics.warn(format!("invalid level `{level}' for `{path}', processing it alone"));
            process_filtered(ctx, &path)
        }
    }
}

/// Processes every source file below the directory of the current project.
fn all_source(ctx: &mut Context) -> Result<()> {
    let project = ctx.project.clone().unwrap_or_default();
    let base = Path::new(&project).parent().unwrap_or(Path::new(""));
    let directory = ctx.root.join(base);

    for entry in WalkDir::new(&directory).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                ctx.diagnostics.error(&err.into());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = ctx.relative(entry.path());
        if is_source_file(&name) {
            if let Err(err) = process_filtered(ctx, &name) {
                ctx.diagnostics.error(&err);
            }
        }
    }
    Ok(())
}

/// Processes every registered page, in order, with its navigation macros set.
pub fn build_hierarchy(ctx: &mut Context) {
    for index in 0..ctx.site.len() {
        let Some(page) = ctx.site.get(index).cloned() else {
            continue;
        };
        ctx.page = Some(index);
        set_links(ctx, index);
        if let Err(err) = process_filtered(ctx, &page.path) {
            ctx.diagnostics.error(&err);
        }
    }
    ctx.page = None;
    for name in NAVIGATION_MACROS {
        ctx.undefine(name);
    }
}

fn text_line(
    ctx: &mut Context,
    state: &FileState,
    text: &str,
    output: Option<&mut Output>,
) -> Result<()> {
    match state.syntax {
        Syntax::Project => file_entry(ctx, text),
        Syntax::Source => {
            let line = substitute(ctx, text);
            if let Some(output) = output {
                output.push_line(&line, ctx.settings().compress);
            }
            Ok(())
        }
    }
}

fn interpret_line(
    ctx: &mut Context,
    state: &mut FileState,
    line: &str,
    output: Option<&mut Output>,
) -> Result<()> {
    let directive = parse(line, state.syntax);

    if state.literal {
        if directive == Directive::Literal(Some(false)) {
            state.literal = false;
            return Ok(());
        }
        return text_line(ctx, state, line, output);
    }
    if directive.is_conditional() {
        return conditional(ctx, state, directive);
    }
    if !state.stack.is_emitting() {
        return Ok(());
    }
    if ctx.settings().debug {
        info!("{}: {}", state.display, line);
    }

    match directive {
        Directive::DefineChar { from, to } => {
            if from.is_empty() {
                ctx.diagnostics.warn("character translation without a character");
            } else {
                ctx.scope.chars.insert(from, to);
            }
        }
        Directive::Define { kind, text } => define(ctx, kind, text),
        Directive::Undef(name) => ctx.undefine(name),
        Directive::Compress(Some(on)) => {
            ctx.scope.settings.compress = on;
            if let (false, Some(output)) = (on, output) {
                output.flush();
            }
        }
        Directive::Timestamp(format) => ctx.set_timestamp_format(format),
        Directive::MTimestamp(format) => ctx.set_mtimestamp_format(format),
        Directive::Filename { alias, path } => ctx.add_alias(alias, path)?,
        Directive::Include { path, literal } => include(ctx, state, path, literal, output)?,
        Directive::AllSource => all_source(ctx)?,
        Directive::Hierarchy => {
            build_hierarchy(ctx);
            ctx.hierarchy_built = true;
        }
        Directive::Literal(Some(on)) => state.literal = on,
        Directive::Entities(Some(on)) => ctx.scope.settings.entities = on,
        Directive::Compress(None) | Directive::Literal(None) | Directive::Entities(None) => {
            ctx.diagnostics.warn(format!("expected ON or OFF in `{}'", line.trim()));
        }
        Directive::Toc | Directive::SiteMap => {
            let text = match directive {
                Directive::Toc => toc(ctx),
                _ => sitemap(ctx),
            };
            let text = text.trim_end_matches('\n');
            if let (false, Some(output)) = (text.is_empty(), output) {
                output.push_line(text, ctx.settings().compress);
            }
        }
        Directive::Text(text) => text_line(ctx, state, text, output)?,
        Directive::Comment
        | Directive::If(_)
        | Directive::Ifdef(_)
        | Directive::Ifndef(_)
        | Directive::Elsif(_)
        | Directive::Else
        | Directive::Endif => {}
    }
    Ok(())
}

/// Interprets the file at `path` with the given grammar. Source content is
/// appended to `output`; project descriptions produce none.
///
/// Errors on individual lines are reported and the file goes on; only a
/// file that cannot be opened is returned as an error.
pub fn interpret(
    ctx: &mut Context,
    path: &Path,
    syntax: Syntax,
    mut output: Option<&mut Output>,
) -> Result<()> {
    let display = ctx.relative(path);
    let file = File::open(path)
        .map_err(|source| Error::FileOpenError { path: display.clone(), source })?;
    debug!("Reading '{display}'");

    ctx.diagnostics.enter(&display);
    let mut state = FileState {
        path,
        display,
        syntax,
        stack: ConditionalStack::new(),
        literal: false,
    };

    for item in LineReader::new(BufReader::new(file)) {
        let (number, line) = match item {
            Ok(item) => item,
            Err(source) => {
                let path = state.display.clone();
                ctx.diagnostics.error(&Error::FileOpenError { path, source });
                break;
            }
        };
        ctx.diagnostics.set_line(number);
        if let Err(err) = interpret_line(ctx, &mut state, &line, output.as_deref_mut()) {
            ctx.diagnostics.error(&err);
        }
    }

    if state.stack.depth() > 0 {
        let depth = state.stack.depth();
        ctx.diagnostics.warn(format!("{depth} conditional block(s) left open at end of file"));
    }
    ctx.diagnostics.leave();
    Ok(())
}

/// Reads a top-level project description, then processes the pages it
/// registered unless it already asked for the hierarchy itself.
pub fn process_project(ctx: &mut Context, name: &str) -> Result<()> {
    let project = normalize(name);
    info!("Reading project '{project}'");

    let previous = ctx.project.replace(project.clone());
    let built = std::mem::replace(&mut ctx.hierarchy_built, false);
    let path = ctx.root.join(&project);

    let result = interpret(ctx, &path, Syntax::Project, None);
    if result.is_ok() && !ctx.hierarchy_built && !ctx.site.is_empty() {
        build_hierarchy(ctx);
    }

    ctx.site.clear();
    ctx.project = previous;
    ctx.hierarchy_built = built;
    result
}
