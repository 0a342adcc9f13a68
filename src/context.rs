//! Interpreter context shared by every file of a run.
//!
//! The context owns the macro table, character map and settings (together
//! the [`Scope`]), the page list, file aliases, dependency edges and the
//! diagnostics counters. The scope is snapshotted around each source file so
//! that definitions made while processing one file never leak into another.

use chrono::{DateTime, Local};
use globset::GlobSet;
use indexmap::IndexMap;
use log::{debug, error, warn};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_ARGUMENT_SEPARATOR, DEFAULT_CLOSE_DELIMITER, DEFAULT_EXTENSION, DEFAULT_LANGUAGE,
    DEFAULT_OPEN_DELIMITER,
};
use crate::deps::DependencyTracker;
use crate::error::{Error, Result};
use crate::eval::{DisabledEvaluator, Evaluator};
use crate::hierarchy::Site;
use crate::macros::{is_reserved, CharacterMap, MacroTable};
use crate::timestamp::format_time;

/// Interpreter-wide settings driven by configuration macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub include_path: Vec<String>,
    pub output_dir: String,
    pub open_delimiter: String,
    pub close_delimiter: String,
    pub separator: String,
    /// Extension given to generated files
    pub extension: String,
    /// Every extension ever used for generated files
    pub target_extensions: Vec<String>,
    pub debug: bool,
    pub entities: bool,
    pub compress: bool,
    pub language: String,
    pub timestamp_format: Option<String>,
    pub mtimestamp_format: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_path: Vec::new(),
            output_dir: String::new(),
            open_delimiter: DEFAULT_OPEN_DELIMITER.to_string(),
            close_delimiter: DEFAULT_CLOSE_DELIMITER.to_string(),
            separator: DEFAULT_ARGUMENT_SEPARATOR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            target_extensions: vec![DEFAULT_EXTENSION.to_string()],
            debug: false,
            entities: false,
            compress: false,
            language: DEFAULT_LANGUAGE.to_string(),
            timestamp_format: None,
            mtimestamp_format: None,
        }
    }
}

/// The file-local part of the context, saved and restored around each source file.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub macros: MacroTable,
    pub chars: CharacterMap,
    pub settings: Settings,
}

/// Run-wide switches coming from the command line.
#[derive(Debug, Default)]
pub struct Options {
    /// Skip sources whose output is not older than them
    pub fast: bool,
    /// Collect dependencies without writing any output
    pub makefile: bool,
    /// Only process matching sources from project files
    pub filter: Option<GlobSet>,
}

/// Warning and error sink.
///
/// Warnings are logged and counted. Errors are logged, counted and make the
/// run fail, without stopping it.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: usize,
    errors: usize,
    locations: Vec<(String, usize)>,
}

impl Diagnostics {
    /// Starts reporting against `file`.
    pub fn enter(&mut self, file: &str) {
        self.locations.push((file.to_string(), 0));
    }

    /// Stops reporting against the current file.
    pub fn leave(&mut self) {
        self.locations.pop();
    }

    /// Number of files currently being read.
    pub fn depth(&self) -> usize {
        self.locations.len()
    }

    pub fn set_line(&mut self, line: usize) {
        if let Some(location) = self.locations.last_mut() {
            location.1 = line;
        }
    }

    fn prefix(&self) -> String {
        match self.locations.last() {
            Some((file, line)) if *line > 0 => format!("{file}:{line}: "),
            Some((file, _)) => format!("{file}: "),
            None => String::new(),
        }
    }

    pub fn warn<M: Display>(&mut self, message: M) {
        self.warnings += 1;
        warn!("{}{}", self.prefix(), message);
    }

    pub fn error(&mut self, err: &Error) {
        self.errors += 1;
        error!("{}{}", self.prefix(), err);
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// True once any error has been reported.
    pub fn failed(&self) -> bool {
        self.errors > 0
    }
}

/// Explicit state of a whole run.
pub struct Context {
    /// Directory relative file names are resolved against
    pub root: PathBuf,
    pub scope: Scope,
    pub site: Site,
    pub aliases: IndexMap<String, String>,
    pub deps: DependencyTracker,
    pub diagnostics: Diagnostics,
    pub options: Options,
    pub evaluator: Box<dyn Evaluator>,
    /// Project file currently being read
    pub project: Option<String>,
    /// Source file currently being processed
    pub source: Option<String>,
    /// Index of the page being processed when walking the hierarchy
    pub page: Option<usize>,
    /// Set when a project asked for the hierarchy explicitly
    pub hierarchy_built: bool,
}

impl Context {
    /// Creates a context resolving relative names against `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            scope: Scope::default(),
            site: Site::default(),
            aliases: IndexMap::new(),
            deps: DependencyTracker::new(),
            diagnostics: Diagnostics::default(),
            options: Options::default(),
            evaluator: Box::new(DisabledEvaluator),
            project: None,
            source: None,
            page: None,
            hierarchy_built: false,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.scope.settings
    }

    pub fn macros(&self) -> &MacroTable {
        &self.scope.macros
    }

    /// Returns the value of `name` if it is defined.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.scope.macros.get(name)
    }

    /// Defines a macro, applying the side effects of configuration keys.
    ///
    /// Reserved names are refused with a warning.
    pub fn define(&mut self, name: &str, value: &str) {
        if is_reserved(name) {
            self.diagnostics.warn(format!("system macros unmodifiable `{name}'"));
            return;
        }

        let settings = &mut self.scope.settings;
        match name {
            "INCLUDE_PATH" => {
                settings.include_path = value
                    .split(':')
                    .filter(|entry| !entry.is_empty())
                    .map(String::from)
                    .collect();
            }
            "OUTPUT_DIR" => settings.output_dir = value.trim_end_matches('/').to_string(),
            "OPEN_DELIMITER" | "CLOSE_DELIMITER" | "ARGUMENT_SEPARATOR" if value.is_empty() => {
                self.diagnostics.warn(format!("`{name}' cannot be empty"));
                return;
            }
            "OPEN_DELIMITER" => settings.open_delimiter = value.to_string(),
            "CLOSE_DELIMITER" => settings.close_delimiter = value.to_string(),
            "ARGUMENT_SEPARATOR" => settings.separator = value.to_string(),
            "EXTENSION" => {
                let extension = value.trim_start_matches('.').to_string();
                if !settings.target_extensions.contains(&extension) {
                    settings.target_extensions.push(extension.clone());
                }
                settings.extension = extension;
            }
            "DEBUG" => settings.debug = true,
            "LANGUAGE" => settings.language = value.to_string(),
            _ => {}
        }

        debug!("Defining `{name}'");
        self.scope.macros.insert(name, value);

        if name == "LANGUAGE" {
            self.refresh_timestamps();
        }
    }

    /// Removes a macro and the character translation of the same name.
    pub fn undefine(&mut self, name: &str) {
        self.scope.macros.remove(name);
        self.scope.chars.remove(name);
    }

    /// Registers a file alias. Targets must be relative.
    pub fn add_alias(&mut self, alias: &str, path: &str) -> Result<()> {
        let path = normalize(path);
        if Path::new(&path).is_absolute() {
            return Err(Error::AbsolutePathError { path });
        }
        self.aliases.insert(alias.to_string(), path);
        Ok(())
    }

    /// Resolves an alias, returning `name` itself when it is not one.
    pub fn resolve_alias(&self, name: &str) -> String {
        match self.aliases.get(name) {
            Some(path) => path.clone(),
            None => normalize(name),
        }
    }

    pub fn set_timestamp_format(&mut self, format: &str) {
        self.scope.settings.timestamp_format = Some(format.to_string());
        self.refresh_timestamps();
    }

    pub fn set_mtimestamp_format(&mut self, format: &str) {
        self.scope.settings.mtimestamp_format = Some(format.to_string());
        self.refresh_timestamps();
    }

    /// Recomputes `TIMESTAMP` from now and `MTIMESTAMP` from the modification
    /// time of the current source file.
    pub fn refresh_timestamps(&mut self) {
        let language = self.scope.settings.language.clone();
        if let Some(format) = self.scope.settings.timestamp_format.clone() {
            let value = format_time(&Local::now(), &format, &language);
            self.scope.macros.insert("TIMESTAMP", value);
        }
        if let Some(format) = self.scope.settings.mtimestamp_format.clone() {
            let modified = self
                .source
                .as_ref()
                .and_then(|source| self.root.join(source).metadata().ok())
                .and_then(|metadata| metadata.modified().ok());
            if let Some(modified) = modified {
                let value = format_time(&DateTime::<Local>::from(modified), &format, &language);
                self.scope.macros.insert("MTIMESTAMP", value);
            }
        }
    }

    /// Path relative to the root, as used in messages and dependency edges.
    pub fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        normalize(&relative.to_string_lossy())
    }
}

/// Converts back-slashes to forward slashes and drops a leading `./`.
pub fn normalize(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// `../` repeated once per directory level of `path`.
pub fn root_path(path: &str) -> String {
    "../".repeat(normalize(path).matches('/').count())
}
