//! Timestamp formatting for the `TIMESTAMP` and `MTIMESTAMP` macros.
//!
//! Formats use `$` tokens (`$dd/$MM/$yyyy at $hh:$mm`) which are translated to
//! chrono's strftime syntax and rendered in the locale named by `LANGUAGE`.

use chrono::{DateTime, Datelike, Locale, TimeZone};
use std::fmt::Display;

/// Tokens and their strftime equivalents, longest first so that `$yyyy`
/// wins over `$yy`.
const TOKENS: [(&str, &str); 11] = [
    ("$yyyy", "%Y"),
    ("$yy", "%y"),
    ("$Mmmm", "%B"),
    ("$Mmm", "%b"),
    ("$MM", "%m"),
    ("$Dddd", "%A"),
    ("$Ddd", "%a"),
    ("$dd", "%d"),
    ("$hh", "%H"),
    ("$mm", "%M"),
    ("$ss", "%S"),
];

/// Day of month with its English ordinal suffix, used by `$ddth`.
fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

/// Translates a `$` token format into a strftime format string.
pub fn translate(format: &str, day: u32) -> String {
    let mut result = String::with_capacity(format.len());
    let mut rest = format;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '$' {
            if let Some(tail) = rest.strip_prefix("$ddth") {
                result.push_str(&ordinal(day));
                rest = tail;
                continue;
            }
            for (token, spec) in TOKENS {
                if let Some(tail) = rest.strip_prefix(token) {
                    result.push_str(spec);
                    rest = tail;
                    continue 'outer;
                }
            }
        }
        if c == '%' {
            result.push_str("%%");
        } else {
            result.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    result
}

/// Resolves a `LANGUAGE` value such as `fr`, `de_DE` or `en` to a locale.
pub fn locale(language: &str) -> Locale {
    let language = language.trim();
    if let Ok(locale) = Locale::try_from(language) {
        return locale;
    }
    if language.len() == 2 {
        let lower = language.to_lowercase();
        let country = if lower == "en" { "US".to_string() } else { lower.to_uppercase() };
        if let Ok(locale) = Locale::try_from(format!("{lower}_{country}").as_str()) {
            return locale;
        }
    }
    log::debug!("Unknown language '{language}', using en_US");
    Locale::en_US
}

/// Renders `time` with a `$` token format in the given language.
pub fn format_time<Tz>(time: &DateTime<Tz>, format: &str, language: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let spec = translate(format, time.day());
    time.format_localized(&spec, locale(language)).to_string()
}
