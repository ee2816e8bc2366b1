use crate::output::{RowWriter, WriterError};
use crate::rows::Row;
use crate::{DynBoxWrite, DynError};
use log::info;
use std::fs;
use std::io::BufWriter;
use std::sync::Arc;

/// Writes rows as delimiter-separated values.
///
/// The key order of the first row written after open becomes the fixed
/// column order for the whole file. Later rows are serialized by looking
/// up each fixed key, so a row missing a key yields an empty field.
/// Quoting follows the usual CSV convention: a field is quoted, with
/// interior quotes doubled, iff it contains the delimiter, a quote or a
/// line break.
pub struct CsvRowWriter {
    delimiter: u8,
    should_write_headers: bool,
    wr: Option<csv::Writer<DynBoxWrite>>,
    ordered_keys: Vec<Arc<str>>,
}

impl CsvRowWriter {
    pub fn new() -> Self {
        Self::with_options(b',', true)
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self::with_options(delimiter, true)
    }

    pub fn with_options(delimiter: u8, should_write_headers: bool) -> Self {
        Self {
            delimiter,
            should_write_headers,
            wr: None,
            ordered_keys: Vec::new(),
        }
    }

    /// Truncates/creates the destination file and resets header state.
    pub fn open(&mut self, filename: &str) -> Result<(), DynError> {
        info!("Opening file: {}", filename);
        let outp: DynBoxWrite = Box::new(BufWriter::new(fs::File::create(filename)?));
        self.open_writer(outp);
        Ok(())
    }

    pub fn open_writer(&mut self, outp: DynBoxWrite) {
        self.wr = Some(
            csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .from_writer(outp),
        );
        self.ordered_keys.clear();
    }
}

impl Default for CsvRowWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowWriter for CsvRowWriter {
    fn write_row(&mut self, row: Row) -> Result<(), DynError> {
        let wr = match self.wr.as_mut() {
            Some(wr) => wr,
            None => return Err(Box::new(WriterError::new("CSV writer is not open"))),
        };
        if self.ordered_keys.is_empty() {
            self.ordered_keys = row.keys().cloned().collect();
            if self.should_write_headers {
                wr.write_record(self.ordered_keys.iter().map(|k| k.as_bytes()))?;
            }
        }
        let record = self.ordered_keys.iter().map(|k| {
            row.get(k)
                .map(|v| v.to_field_str())
                .unwrap_or_default()
                .into_bytes()
        });
        wr.write_record(record)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DynError> {
        if let Some(mut wr) = self.wr.take() {
            wr.flush()?;
        }
        self.ordered_keys.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_util::SharedBuf;
    use crate::rows::SqlValue;

    fn writer_over(buf: &SharedBuf, delimiter: u8, headers: bool) -> CsvRowWriter {
        let mut wr = CsvRowWriter::with_options(delimiter, headers);
        wr.open_writer(Box::new(buf.clone()));
        wr
    }

    fn row(pairs: Vec<(&str, SqlValue)>) -> Row {
        Row::new(
            pairs
                .into_iter()
                .map(|(k, v)| (Arc::from(k), v))
                .collect(),
        )
    }

    #[test]
    fn plain_rows_with_headers() {
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
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
        assert_eq!(buf.contents(), "a,b\nabc,1\njkl,2\n");
    }

    #[test]
    fn quoting_only_where_needed() {
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("abc,def,ghi".to_string())),
            ("b", SqlValue::LongVal(1)),
        ]))
        .unwrap();
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("the rain\nin Spain".to_string())),
            ("b", SqlValue::LongVal(2)),
        ]))
        .unwrap();
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("\"sarcasm\"".to_string())),
            ("b", SqlValue::LongVal(3)),
        ]))
        .unwrap();
        wr.write_row(row(vec![("a", SqlValue::NullVal), ("b", SqlValue::LongVal(4))]))
            .unwrap();
        wr.close().unwrap();
        assert_eq!(
            buf.contents(),
            "a,b\n\"abc,def,ghi\",1\n\"the rain\nin Spain\",2\n\"\"\"sarcasm\"\"\",3\n,4\n"
        );
    }

    #[test]
    fn headers_can_be_disabled() {
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b'|', false);
        wr.write_row(row(vec![
            ("x", SqlValue::LongVal(1)),
            ("y", SqlValue::LongVal(2)),
        ]))
        .unwrap();
        wr.close().unwrap();
        assert_eq!(buf.contents(), "1|2\n");
    }

    #[test]
    fn missing_key_is_written_empty() {
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
        wr.write_row(row(vec![
            ("a", SqlValue::StrVal("1".to_string())),
            ("b", SqlValue::StrVal("2".to_string())),
        ]))
        .unwrap();
        wr.write_row(row(vec![("a", SqlValue::StrVal("3".to_string()))]))
            .unwrap();
        wr.close().unwrap();
        assert_eq!(buf.contents(), "a,b\n1,2\n3,\n");
    }

    #[test]
    fn output_reparses_to_the_original_values() {
        let values = vec![
            "plain",
            "with,delimiter",
            "with \"quotes\"",
            "multi\nline",
            "trailing space ",
        ];
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
        for v in &values {
            wr.write_row(row(vec![
                ("a", SqlValue::StrVal(v.to_string())),
                ("b", SqlValue::LongVal(1)),
            ]))
            .unwrap();
        }
        wr.close().unwrap();

        let binding = buf.contents().into_bytes();
        let mut rdr = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(binding.as_slice());
        let parsed = rdr
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(parsed, values);
    }

    #[test]
    fn close_is_idempotent_and_safe_without_open() {
        let mut wr = CsvRowWriter::new();
        wr.close().unwrap();
        wr.close().unwrap();

        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
        wr.write_row(row(vec![("a", SqlValue::LongVal(1))])).unwrap();
        wr.close().unwrap();
        wr.close().unwrap();
        assert_eq!(buf.contents(), "a\n1\n");
    }

    #[test]
    fn write_after_close_is_an_error() {
        let buf = SharedBuf::new();
        let mut wr = writer_over(&buf, b',', true);
        wr.close().unwrap();
        assert!(wr.write_row(row(vec![("a", SqlValue::LongVal(1))])).is_err());
    }
}
