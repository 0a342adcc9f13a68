//! Macro substitution engine.
//!
//! Invocations are delimited (`<<NAME>>`, `<<NAME(a, b)>>`) and expanded
//! innermost first: the leftmost closing delimiter is paired with the
//! nearest opening delimiter before it, the enclosed token is resolved, and
//! the scan restarts over the rewritten text until nothing is left to expand.

use regex::Regex;
use std::sync::LazyLock;

use crate::constants::{EVAL_MACRO, MAX_EXPANSIONS, NEWLINE_MACRO, SYSTEM_MACRO, TAB_MACRO};
use crate::context::Context;
use crate::error::Error;
use crate::macros::{marker, marker_indices, strip_markers};

/// Stand-ins for `__NEWLINE__` and `__TAB__` while a line is being scanned.
const NEWLINE_SENTINEL: char = '\u{E001}';
const TAB_SENTINEL: char = '\u{E002}';

/// `NAME(arguments)`: a name without whitespace followed by a parenthesized list.
static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([^\s(]+)\((.*)\)\s*$").expect("call pattern is valid")
});

/// Escapes `&`, `<` and `>`, leaving the delimiter strings intact.
pub fn escape_entities(line: &str, open: &str, close: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        if let Some(delimiter) = [open, close].into_iter().find(|d| rest.starts_with(*d)) {
            result.push_str(delimiter);
            rest = &rest[delimiter.len()..];
            continue;
        }
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    result
}

/// Removes surrounding quotes from a complete quoted argument.
fn unquote(argument: &str) -> &str {
    for quote in ['"', '\''] {
        if argument.len() >= 2 && argument.starts_with(quote) && argument.ends_with(quote) {
            return &argument[1..argument.len() - 1];
        }
    }
    argument
}

/// True when `piece` ends with `quote` that is not escaped by a backslash.
fn ends_with_quote(piece: &str, quote: char) -> bool {
    piece.ends_with(quote) && !piece[..piece.len() - quote.len_utf8()].ends_with('\\')
}

/// Splits call arguments on `separator`, keeping quoted arguments whole.
/// Unquoted arguments are trimmed; quotes preserve surrounding spaces.
///
/// A piece starting with a quote is joined with the following pieces,
/// separator restored, until one ends with the same quote; the quotes are
/// then stripped.
pub fn split_args(arguments: &str, separator: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut pieces = arguments.split(separator);
    while let Some(piece) = pieces.next() {
        let trimmed = piece.trim_start();
        let quote = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'');
        let Some(quote) = quote else {
            result.push(piece.trim().to_string());
            continue;
        };

        let mut joined = trimmed.trim_end().to_string();
        while joined.len() < 2 || !ends_with_quote(&joined, quote) {
            match pieces.next() {
                Some(next) => {
                    joined.push_str(separator);
                    joined.push_str(next.trim_end());
                }
                None => break,
            }
        }
        result.push(unquote(&joined).to_string());
    }
    result
}

/// Resolves `name` called with `args`: every marker of the stored value is
/// replaced by the argument of the same position.
///
/// Undefined names yield an empty string and a warning; markers left without
/// an argument are reported as an error and removed.
pub fn call(ctx: &mut Context, name: &str, args: &[String]) -> String {
    let Some(stored) = ctx.lookup(name) else {
        ctx.diagnostics.warn(format!("undefined name `{name}'"));
        return String::new();
    };

    let value = args
        .iter()
        .enumerate()
        .fold(stored.to_string(), |value, (index, arg)| value.replace(&marker(index), arg));

    if let Some(index) = marker_indices(&value).min() {
        let err = Error::MissingArgumentError { name: name.to_string(), index: index + 1 };
        ctx.diagnostics.error(&err);
        return strip_markers(&value);
    }
    value
}

/// Runs one of the evaluation pseudo-macros on its whole argument text.
fn evaluate(ctx: &mut Context, name: &str, argument: &str) -> String {
    let argument = unquote(argument.trim());
    let result = if name == EVAL_MACRO {
        ctx.evaluator.evaluate(argument)
    } else {
        ctx.evaluator.execute(argument)
    };
    result.unwrap_or_else(|err| {
        ctx.diagnostics.error(&err);
        String::new()
    })
}

/// Resolves the text found between a pair of delimiters.
fn resolve(ctx: &mut Context, token: &str) -> String {
    let (name, arguments) = match CALL_RE.captures(token) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let arguments = caps.get(2).map_or("", |m| m.as_str()).to_string();
            (name, Some(arguments))
        }
        None => (token.trim().to_string(), None),
    };

    match name.as_str() {
        NEWLINE_MACRO => NEWLINE_SENTINEL.to_string(),
        TAB_MACRO => TAB_SENTINEL.to_string(),
        EVAL_MACRO | SYSTEM_MACRO => evaluate(ctx, &name, arguments.as_deref().unwrap_or("")),
        _ => {
            let separator = ctx.settings().separator.clone();
            let args = arguments.map_or_else(Vec::new, |a| split_args(&a, &separator));
            call(ctx, &name, &args)
        }
    }
}

/// Expands every macro invocation in `line`.
pub fn expand(ctx: &mut Context, line: &str) -> String {
    let open = ctx.settings().open_delimiter.clone();
    let close = ctx.settings().close_delimiter.clone();

    let mut text = line
        .replace(&format!("{open}{NEWLINE_MACRO}{close}"), &NEWLINE_SENTINEL.to_string())
        .replace(&format!("{open}{TAB_MACRO}{close}"), &TAB_SENTINEL.to_string());

    let mut from = 0;
    let mut expansions = 0;
    while let Some(found) = text[from..].find(&close) {
        let close_at = from + found;
        let Some(open_at) = text[..close_at].rfind(&open) else {
            // Nothing can ever open this one, keep scanning after it.
            from = close_at + close.len();
            continue;
        };

        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            ctx.diagnostics.error(&Error::RecursionLimitError { line: line.to_string() });
            break;
        }

        let token = text[open_at + open.len()..close_at].to_string();
        let value = resolve(ctx, &token);
        text.replace_range(open_at..close_at + close.len(), &value);
        from = from.min(open_at);
    }

    text.replace(NEWLINE_SENTINEL, "\n").replace(TAB_SENTINEL, "\t")
}

/// Substitutes a content line: entity escaping, character translations,
/// then macro expansion.
pub fn substitute(ctx: &mut Context, line: &str) -> String {
    let settings = ctx.settings();
    let escaped = if settings.entities {
        escape_entities(line, &settings.open_delimiter, &settings.close_delimiter)
    } else {
        line.to_string()
    };
    let translated = ctx.scope.chars.apply(&escaped);
    expand(ctx, &translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::markup;
    use rstest::rstest;

    fn context() -> Context {
        let mut ctx = Context::new(".");
        ctx.define("NAME", "world");
        ctx.define("EMPTY", "");
        ctx
    }

    #[rstest]
    #[case::plain("hello <<NAME>>", "hello world")]
    #[case::twice("<<NAME>>, <<NAME>>!", "world, world!")]
    #[case::empty("[<<EMPTY>>]", "[]")]
    #[case::unbalanced_close("a >> b <<NAME>>", "a >> b world")]
    #[case::unbalanced_open("<< <<NAME>>", "<< world")]
    #[case::newline("a<<__NEWLINE__>>b<<__TAB__>>c", "a\nb\tc")]
    #[case::no_macro("plain text", "plain text")]
    fn test_expand(#[case] line: &str, #[case] expected: &str) {
        let mut ctx = context();
        assert_eq!(expand(&mut ctx, line), expected);
        assert_eq!(ctx.diagnostics.warnings(), 0);
    }

    #[test]
    fn test_nested_expansion() {
        let mut ctx = context();
        ctx.define("INNER", "NAME");
        ctx.define("OUTER", "<<NAME>>!");
        assert_eq!(expand(&mut ctx, "<<<<INNER>>>>"), "world");
        assert_eq!(expand(&mut ctx, "<<OUTER>>"), "world!");
    }

    #[test]
    fn test_undefined_name_warns() {
        let mut ctx = context();
        assert_eq!(expand(&mut ctx, "a<<MISSING>>b"), "ab");
        assert_eq!(ctx.diagnostics.warnings(), 1);
    }

    #[test]
    fn test_call_arguments() {
        let mut ctx = context();
        let value = markup("M(x,y)", "..x..y..", None, ",");
        ctx.define("M", &value);
        assert_eq!(expand(&mut ctx, "<<M(1,2)>>"), "..1..2..");
        assert_eq!(expand(&mut ctx, "<<M(<<NAME>>,\"a,b\")>>"), "..world..a,b..");
        assert!(!ctx.diagnostics.failed());
    }

    #[test]
    fn test_missing_argument_is_error() {
        let mut ctx = context();
        let value = markup("M(x,y)", "x-y", None, ",");
        ctx.define("M", &value);
        assert_eq!(expand(&mut ctx, "<<M(1)>>"), "1-");
        assert_eq!(ctx.diagnostics.errors(), 1);
    }

    #[test]
    fn test_self_reference_stops() {
        let mut ctx = context();
        ctx.define("LOOP", "<<LOOP>>");
        expand(&mut ctx, "<<LOOP>>");
        assert_eq!(ctx.diagnostics.errors(), 1);
    }

    #[test]
    fn test_pseudo_macros_disabled() {
        let mut ctx = context();
        assert_eq!(expand(&mut ctx, "<<__SYSTEM__(echo hi)>>"), "");
        assert_eq!(ctx.diagnostics.errors(), 1);
        assert_eq!(ctx.diagnostics.warnings(), 0);
    }

    #[test]
    fn test_pseudo_macros_enabled() {
        let mut ctx = context().with_evaluator(Box::new(crate::eval::HostEvaluator::new()));
        assert_eq!(expand(&mut ctx, "<<__PYTHON__(2 * 21)>>"), "42");
        assert!(!ctx.diagnostics.failed());
    }

    #[test]
    fn test_custom_delimiters() {
        let mut ctx = context();
        ctx.define("OPEN_DELIMITER", "%%");
        ctx.define("CLOSE_DELIMITER", "%%");
        assert_eq!(expand(&mut ctx, "hi %%NAME%% <<NAME>>"), "hi world <<NAME>>");
    }

    #[rstest]
    #[case::simple("a,b,c", vec!["a", "b", "c"])]
    #[case::double_quoted("\"a,b\",c", vec!["a,b", "c"])]
    #[case::spaced("a, b ,c", vec!["a", "b", "c"])]
    #[case::single_quoted("'x, y', z", vec!["x, y", "z"])]
    #[case::quoted_spaces("' padded '", vec![" padded "])]
    #[case::escaped_quote("\"a\\\",b\",c", vec!["a\\\",b", "c"])]
    #[case::unterminated("\"a,b", vec!["\"a,b"])]
    fn test_split_args(#[case] arguments: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_args(arguments, ","), expected);
    }

    #[test]
    fn test_escape_entities_keeps_delimiters() {
        assert_eq!(escape_entities("a < b && <<X>>", "<<", ">>"), "a &lt; b &amp;&amp; <<X>>");
    }

    #[test]
    fn test_substitute_applies_character_map() {
        let mut ctx = context();
        ctx.scope.chars.insert("é", "&eacute;");
        ctx.scope.settings.entities = true;
        assert_eq!(substitute(&mut ctx, "é <<NAME>> & co"), "&eacute; world &amp; co");
    }
}
