use crate::rows::Row;
use std::sync::Arc;

/// Column-name casing applied to every row of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCaseFormat {
    #[default]
    Default,
    CamelCase,
    SnakeCase,
}

impl KeyCaseFormat {
    /// Lenient parse: any name containing "camel" or "snake"
    /// (case-insensitive) selects that format, anything else is Default.
    pub fn by_name(name: Option<&str>) -> KeyCaseFormat {
        match name {
            None => KeyCaseFormat::Default,
            Some(s) => {
                let lower = s.to_lowercase();
                if lower.contains("camel") {
                    KeyCaseFormat::CamelCase
                } else if lower.contains("snake") {
                    KeyCaseFormat::SnakeCase
                } else {
                    KeyCaseFormat::Default
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KeyCaseFormat::Default => "default",
            KeyCaseFormat::CamelCase => "camel_case",
            KeyCaseFormat::SnakeCase => "snake_case",
        }
    }
}

/// Lower-cases and inserts an underscore before each upper-case letter
/// and at each space. A separator is never doubled, which makes the
/// conversion idempotent.
pub fn to_snake_case(value: &str) -> String {
    let underscore = '_';
    let mut result = String::with_capacity(value.len() + 10);
    let mut underscore_written = true;
    for ch in value.chars() {
        if ch.is_ascii_uppercase() && !underscore_written {
            result.push(underscore);
        }
        if ch == ' ' {
            result.push(underscore);
            underscore_written = true;
        } else {
            result.extend(ch.to_lowercase());
            underscore_written = ch == underscore;
        }
    }
    result
}

/// Normalizes through snake form, then upper-cases the letter following
/// each underscore and drops the separators. The first character stays
/// lower-case. Idempotent for the same reason to_snake_case is.
pub fn to_camel_case(value: &str) -> String {
    let snake = to_snake_case(value);
    let mut result = String::with_capacity(snake.len());
    let mut capitalize_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

pub fn key_format_fn(format: KeyCaseFormat) -> fn(&str) -> String {
    match format {
        KeyCaseFormat::CamelCase => to_camel_case,
        KeyCaseFormat::SnakeCase => to_snake_case,
        KeyCaseFormat::Default => |s| s.to_string(),
    }
}

/// Produces a new row with every key rewritten per the format. Pure and
/// row-at-a-time; Default mode returns the row untouched.
pub fn format_row_keys(row: Row, format: KeyCaseFormat) -> Row {
    if format == KeyCaseFormat::Default {
        return row;
    }
    let f = key_format_fn(format);
    Row::new(
        row.into_data()
            .into_iter()
            .map(|(k, v)| (Arc::from(f(&k).as_str()), v))
            .collect(),
    )
}
