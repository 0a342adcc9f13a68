//! Macro table, character map and argument markers.
//!
//! A macro declared with formal arguments, `NAME(a, b)`, is stored with each
//! occurrence of a formal replaced by a positional marker. Call sites later
//! swap the markers for their actual arguments.

use indexmap::IndexMap;

use crate::constants::RESERVED_MACROS;

/// Leading character of every marker. Private use area, never typed by hand.
const MARKER_LEAD: char = '\u{E000}';

/// Marker indices are encoded as a single character starting at this code point.
const MARKER_BASE: u32 = 0xF0000;

/// Returns the marker standing for the `index`-th formal argument.
pub fn marker(index: usize) -> String {
    let code = MARKER_BASE + index as u32;
    let encoded = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
    format!("{MARKER_LEAD}{encoded}")
}

/// Iterates over the indices of all markers present in `value`, in order of appearance.
pub fn marker_indices(value: &str) -> impl Iterator<Item = usize> + '_ {
    let mut chars = value.chars();
    std::iter::from_fn(move || loop {
        let c = chars.next()?;
        if c == MARKER_LEAD {
            if let Some(encoded) = chars.next() {
                let code = encoded as u32;
                if code >= MARKER_BASE {
                    return Some((code - MARKER_BASE) as usize);
                }
            }
        }
    })
}

/// First free marker index of a stored value: one past the highest marker.
pub fn next_marker_index(value: &str) -> usize {
    marker_indices(value).max().map_or(0, |highest| highest + 1)
}

/// Removes every marker from `value`.
pub fn strip_markers(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == MARKER_LEAD {
            chars.next();
        } else {
            result.push(c);
        }
    }
    result
}

/// Returns true if `name` is one of the pseudo or formatting macros.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_MACROS.contains(&name)
}

/// Ordered mapping of macro names to their stored values.
///
/// An empty value means "defined but empty"; absence from the table means
/// undefined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    entries: IndexMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`. Returns false, leaving the table untouched,
    /// when `name` is reserved.
    pub fn insert<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> bool {
        let name = name.into();
        if is_reserved(&name) {
            return false;
        }
        self.entries.insert(name, value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes `name`. Removing an undefined macro is a no-op.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Character sequences replaced in every content line before expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterMap {
    entries: IndexMap<String, String>,
}

impl CharacterMap {
    pub fn insert<F: Into<String>, T: Into<String>>(&mut self, from: F, to: T) {
        self.entries.insert(from.into(), to.into());
    }

    pub fn remove(&mut self, from: &str) -> Option<String> {
        self.entries.shift_remove(from)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies every translation to `line`, in definition order.
    pub fn apply(&self, line: &str) -> String {
        self.entries
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .fold(line.to_string(), |text, (from, to)| text.replace(from.as_str(), to))
    }
}

/// Splits a declaration of the form `NAME(a, b)` into its name and formals.
///
/// Returns `None` for plain names.
pub fn parse_declaration<'a>(declaration: &'a str, separator: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let declaration = declaration.trim();
    let open = declaration.find('(')?;
    let inner = declaration[open + 1..].strip_suffix(')')?;
    let name = declaration[..open].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let formals = inner
        .split(separator)
        .map(str::trim)
        .filter(|formal| !formal.is_empty())
        .collect();
    Some((name, formals))
}

/// Returns the macro name of a declaration, with any formal list removed.
pub fn declared_name(declaration: &str) -> &str {
    let declaration = declaration.trim();
    match declaration.find('(') {
        Some(open) => declaration[..open].trim(),
        None => declaration,
    }
}

/// Splits the argument text of a define directive into declaration and value.
///
/// The declaration ends at the first whitespace, unless it opens a formal
/// list, in which case it runs to the closing parenthesis.
pub fn split_definition(text: &str) -> (&str, &str) {
    let text = text.trim();
    let name_end = text.find(char::is_whitespace).unwrap_or(text.len());
    let end = match text[..name_end].find('(') {
        Some(open) if !text[..name_end].ends_with(')') => text[open..]
            .find(')')
            .map_or(text.len(), |close| open + close + 1),
        _ => name_end,
    };
    (&text[..end], text[end..].trim())
}

/// Rewrites `value` so that each formal argument of `declaration` becomes a
/// positional marker.
///
/// Numbering starts past the highest marker already held by `current`, so an
/// accumulating definition appends new arguments after the existing ones.
/// Plain declarations return `value` unchanged.
pub fn markup(declaration: &str, value: &str, current: Option<&str>, separator: &str) -> String {
    let Some((_, formals)) = parse_declaration(declaration, separator) else {
        return value.to_string();
    };
    let first = current.map_or(0, next_marker_index);
    formals
        .iter()
        .enumerate()
        .fold(value.to_string(), |text, (offset, formal)| {
            text.replace(formal, &marker(first + offset))
        })
}
