//! Line tokenizer for project descriptions and source files.
//!
//! Both grammars share one directive set. Source files spell directives
//! with a leading `#`; project descriptions use bare keywords and treat any
//! other line as a file reference.

/// Which grammar a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Project,
    Source,
}

/// The five ways of defining a macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    /// `define`: always (re)defines
    Define,
    /// `newdefine`: only if not already defined
    NewDefine,
    /// `define!`: expands the line before parsing it
    DefineExpanded,
    /// `newdefine!`: expands the line, only if not already defined
    NewDefineExpanded,
    /// `define+`: appends to the current value
    Append,
}

impl DefineKind {
    pub fn expands(self) -> bool {
        matches!(self, Self::DefineExpanded | Self::NewDefineExpanded)
    }

    pub fn keeps_existing(self) -> bool {
        matches!(self, Self::NewDefine | Self::NewDefineExpanded)
    }
}

/// One classified input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    DefineChar { from: &'a str, to: &'a str },
    Define { kind: DefineKind, text: &'a str },
    Undef(&'a str),
    Compress(Option<bool>),
    Timestamp(&'a str),
    MTimestamp(&'a str),
    Filename { alias: &'a str, path: &'a str },
    Include { path: &'a str, literal: bool },
    AllSource,
    Hierarchy,
    Literal(Option<bool>),
    Entities(Option<bool>),
    Toc,
    SiteMap,
    If(&'a str),
    Ifdef(&'a str),
    Ifndef(&'a str),
    Elsif(&'a str),
    Else,
    Endif,
    Comment,
    /// Content line of a source file, or a file reference in a project
    Text(&'a str),
}

impl Directive<'_> {
    /// Conditional directives are tracked even inside suppressed blocks.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Self::If(_) | Self::Ifdef(_) | Self::Ifndef(_) | Self::Elsif(_) | Self::Else | Self::Endif
        )
    }
}

/// Parses `ON`/`OFF`, case-insensitively.
fn switch(argument: &str) -> Option<bool> {
    match argument.trim().to_ascii_uppercase().as_str() {
        "ON" => Some(true),
        "OFF" => Some(false),
        _ => None,
    }
}

/// Strips surrounding double quotes or angle brackets from a path argument.
fn path_argument(argument: &str) -> &str {
    let argument = argument.trim();
    argument
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| argument.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')))
        .unwrap_or(argument)
}

/// Splits `word rest` on the first run of whitespace.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

/// Classifies `line` under the given grammar.
pub fn parse(line: &str, syntax: Syntax) -> Directive<'_> {
    let body = match syntax {
        Syntax::Source => match line.strip_prefix('#') {
            Some(body) => body,
            None => return Directive::Text(line),
        },
        Syntax::Project => {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                return Directive::Comment;
            }
            trimmed
        }
    };

    let (keyword, rest) = split_word(body);
    let source = syntax == Syntax::Source;
    let project = syntax == Syntax::Project;

    match keyword {
        "definechar" => {
            let (from, to) = split_word(rest);
            Directive::DefineChar { from, to: to.trim_end() }
        }
        "define" => Directive::Define { kind: DefineKind::Define, text: rest },
        "newdefine" => Directive::Define { kind: DefineKind::NewDefine, text: rest },
        "define!" => Directive::Define { kind: DefineKind::DefineExpanded, text: rest },
        "newdefine!" => Directive::Define { kind: DefineKind::NewDefineExpanded, text: rest },
        "define+" => Directive::Define { kind: DefineKind::Append, text: rest },
        "undef" => Directive::Undef(rest.trim()),
        "compress" => Directive::Compress(switch(rest)),
        "timestamp" => Directive::Timestamp(rest.trim_end()),
        "mtimestamp" => Directive::MTimestamp(rest.trim_end()),
        "filename" => {
            let (alias, path) = split_word(rest);
            Directive::Filename { alias, path: path.trim_end() }
        }
        "include" => Directive::Include { path: path_argument(rest), literal: false },
        "includeliteral" if source => Directive::Include { path: path_argument(rest), literal: true },
        "literal" => Directive::Literal(switch(rest)),
        "entities" if source => Directive::Entities(switch(rest)),
        "toc" if source => Directive::Toc,
        "sitemap" if source => Directive::SiteMap,
        "allsource" if project => Directive::AllSource,
        "hierarchy" if project => Directive::Hierarchy,
        "if" => Directive::If(rest.trim_end()),
        "ifdef" => Directive::Ifdef(rest.trim()),
        "ifndef" => Directive::Ifndef(rest.trim()),
        "elsif" => Directive::Elsif(rest.trim_end()),
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        _ => Directive::Text(if source { line } else { body }),
    }
}
