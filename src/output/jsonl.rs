use crate::output::{RowWriter, WriterError};
use crate::rows::Row;
use crate::{DynBoxWrite, DynError};
use log::info;
use std::fs;
use std::io::{BufWriter, Write};

/// Writes each row as one JSON object per line, keys in row order,
/// NULL values emitted explicitly. No enclosing array.
pub struct JsonlRowWriter {
    wr: Option<DynBoxWrite>,
}

impl JsonlRowWriter {
    pub fn new() -> Self {
        Self { wr: None }
    }

    /// Truncates/creates the destination file.
    pub fn open(&mut self, filename: &str) -> Result<(), DynError> {
        info!("Opening file: {}", filename);
        self.open_writer(Box::new(BufWriter::new(fs::File::create(filename)?)));
        Ok(())
    }

    pub fn open_writer(&mut self, outp: DynBoxWrite) {
        self.wr = Some(outp);
    }

    fn to_json(row: &Row) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in row.data() {
            map.insert(k.to_string(), v.to_json_value());
        }
        serde_json::Value::Object(map)
    }
}

impl Default for JsonlRowWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowWriter for JsonlRowWriter {
    fn write_row(&mut self, row: Row) -> Result<(), DynError> {
        let wr = match self.wr.as_mut() {
            Some(wr) => wr,
            None => return Err(Box::new(WriterError::new("JSONL writer is not open"))),
        };
        let line = serde_json::to_string(&Self::to_json(&row))?;
        wr.write_all(line.as_bytes())?;
        wr.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DynError> {
        if let Some(mut wr) = self.wr.take() {
            wr.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_util::SharedBuf;
    use crate::rows::SqlValue;
    use std::sync::Arc;

    fn row(pairs: Vec<(&str, SqlValue)>) -> Row {
        Row::new(
            pairs
                .into_iter()
                .map(|(k, v)| (Arc::from(k), v))
                .collect(),
        )
    }

    #[test]
    fn one_object_per_line_in_key_order() {
        let buf = SharedBuf::new();
        let mut wr = JsonlRowWriter::new();
        wr.open_writer(Box::new(buf.clone()));
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("abc".to_string())),
            ("b", SqlValue::LongVal(1)),
        ]))
        .unwrap();
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("jkl".to_string())),
            ("b", SqlValue::LongVal(2)),
        ]))
        .unwrap();
        wr.close().unwrap();
        assert_eq!(
            buf.contents(),
            "{\"a\":\"abc\",\"b\":1}\n{\"a\":\"jkl\",\"b\":2}\n"
        );
    }

    #[test]
    fn nulls_are_emitted_not_dropped() {
        let buf = SharedBuf::new();
        let mut wr = JsonlRowWriter::new();
        wr.open_writer(Box::new(buf.clone()));
        wr.write_row(row(vec![
            ("a", SqlValue::NullVal),
            ("b", SqlValue::BoolVal(false)),
        ]))
        .unwrap();
        wr.close().unwrap();
        assert_eq!(buf.contents(), "{\"a\":null,\"b\":false}\n");
    }

    #[test]
    fn close_is_idempotent_and_safe_without_open() {
        let mut wr = JsonlRowWriter::new();
        wr.close().unwrap();
        wr.close().unwrap();
    }
}
