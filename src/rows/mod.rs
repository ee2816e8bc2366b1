// Copyright 2026 Marin Kolev

use crate::DynError;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// A single column value as produced by the database driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    NullVal,
    BoolVal(bool),
    LongVal(i64),
    DoubleVal(f64),
    TimeVal(NaiveDateTime),
    StrVal(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::NullVal)
    }

    /// String form used by the tabular writers. NULL renders as the
    /// empty string.
    pub fn to_field_str(&self) -> String {
        match self {
            SqlValue::NullVal => String::new(),
            SqlValue::BoolVal(x) => x.to_string(),
            SqlValue::LongVal(x) => x.to_string(),
            SqlValue::DoubleVal(x) => x.to_string(),
            SqlValue::TimeVal(x) => x.to_string(),
            SqlValue::StrVal(x) => x.clone(),
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            SqlValue::NullVal => serde_json::Value::Null,
            SqlValue::BoolVal(x) => serde_json::Value::Bool(*x),
            SqlValue::LongVal(x) => serde_json::Value::from(*x),
            SqlValue::DoubleVal(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(x.to_string())),
            SqlValue::TimeVal(x) => serde_json::Value::String(x.to_string()),
            SqlValue::StrVal(x) => serde_json::Value::String(x.clone()),
        }
    }
}

/// One result row: an ordered mapping from column name to value.
/// Key order is the result set's column order and is the same for every
/// row of one query execution.
#[derive(Debug, Clone)]
pub struct Row {
    data: Vec<(Arc<str>, SqlValue)>,
}

impl Row {
    pub fn new(data: Vec<(Arc<str>, SqlValue)>) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    pub fn push(&mut self, key: Arc<str>, value: SqlValue) {
        self.data.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.data
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.data.iter().map(|(k, _)| k)
    }

    pub fn data(&self) -> &Vec<(Arc<str>, SqlValue)> {
        &self.data
    }

    pub fn into_data(self) -> Vec<(Arc<str>, SqlValue)> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Forward-only, single-pass stream of rows. May be consumed exactly
/// once; dropping the cursor releases the underlying statement and
/// connection resources.
pub trait RowCursor {
    fn next_row(&mut self) -> Result<Option<Row>, DynError>;
}

/// In-memory cursor, mostly useful for tests and for feeding
/// pre-materialized row sets through the pipeline.
pub struct VecRowCursor {
    rows: std::vec::IntoIter<Row>,
}

impl VecRowCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowCursor for VecRowCursor {
    fn next_row(&mut self) -> Result<Option<Row>, DynError> {
        Ok(self.rows.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_abc() -> Row {
        Row::new(vec![
            (Arc::from("a"), SqlValue::StrVal("abc".to_string())),
            (Arc::from("b"), SqlValue::LongVal(1)),
            (Arc::from("c"), SqlValue::NullVal),
        ])
    }

    #[test]
    fn get_preserves_order_and_lookups() {
        let row = row_abc();
        let keys = row.keys().map(|k| k.to_string()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(row.get("b"), Some(&SqlValue::LongVal(1)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn field_str_renders_null_as_empty() {
        assert_eq!(SqlValue::NullVal.to_field_str(), "");
        assert_eq!(SqlValue::LongVal(42).to_field_str(), "42");
        assert_eq!(SqlValue::BoolVal(true).to_field_str(), "true");
    }

    #[test]
    fn json_value_keeps_null() {
        assert_eq!(SqlValue::NullVal.to_json_value(), serde_json::Value::Null);
        assert_eq!(
            SqlValue::DoubleVal(1.5).to_json_value(),
            serde_json::json!(1.5)
        );
    }

    #[test]
    fn vec_cursor_is_single_pass() {
        let mut cur = VecRowCursor::new(vec![row_abc(), row_abc()]);
        assert!(cur.next_row().unwrap().is_some());
        assert!(cur.next_row().unwrap().is_some());
        assert!(cur.next_row().unwrap().is_none());
    }
}
