//! Display heuristics for report keys and values
//!
//! Pure functions; nothing here touches the report it is shown.

use crate::value::ReportValue;
use serde::Serialize;

/// Display category of a report value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Null,
    Array,
    Object,
    /// A number, or a string that is entirely a number (`"42"`, `"-3.5"`).
    NumericLike,
    Boolean,
    Text,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Null => "null",
            Category::Array => "array",
            Category::Object => "object",
            Category::NumericLike => "numeric",
            Category::Boolean => "boolean",
            Category::Text => "text",
        }
    }
}

/// `"parking_spot_count"` → `"Parking Spot Count"`, `"availableSpots"` → `"Available Spots"`.
///
/// Runs of `_` and `-` become one space, a lowercase→uppercase boundary gets a
/// space, then every word is lowercased and capitalised. ASCII case rules only.
pub fn format_key(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;

    for c in raw.chars() {
        if c == '_' || c == '-' {
            if prev != Some(' ') {
                spaced.push(' ');
            }
            prev = Some(' ');
            continue;
        }
        if let Some(p) = prev {
            if p.is_ascii_lowercase() && c.is_ascii_uppercase() {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    spaced
        .to_ascii_lowercase()
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(word.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

pub fn classify(value: &ReportValue) -> Category {
    match value {
        ReportValue::Null => Category::Null,
        ReportValue::Bool(_) => Category::Boolean,
        ReportValue::Number(_) => Category::NumericLike,
        ReportValue::Text(s) if parse_numeric(s).is_some() => Category::NumericLike,
        ReportValue::Text(_) => Category::Text,
        ReportValue::Sequence(_) => Category::Array,
        ReportValue::Mapping(_) => Category::Object,
    }
}

/// Finite number spelled by the whole string, surrounding whitespace allowed.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    // f64's parser also takes "inf" / "NaN"; those are words, not measurements
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Inline text for a scalar, or the summary a collapsed container shows.
pub fn display_value(value: &ReportValue) -> String {
    match value {
        ReportValue::Null => "null".to_string(),
        ReportValue::Bool(b) => b.to_string(),
        ReportValue::Number(n) => n.to_string(),
        ReportValue::Text(s) if parse_numeric(s).is_some() => s.trim().to_string(),
        ReportValue::Text(s) => format!("\"{}\"", s),
        ReportValue::Sequence(items) if items.is_empty() => "[]".to_string(),
        ReportValue::Sequence(items) => format!("[Array({})]", items.len()),
        ReportValue::Mapping(entries) if entries.is_empty() => "{}".to_string(),
        ReportValue::Mapping(entries) => format!("{{Object: {} properties}}", entries.len()),
    }
}
