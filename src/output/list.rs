use crate::output::RowWriter;
use crate::rows::Row;
use crate::DynError;

/// Accumulates rows in memory, for callers that want the entire result
/// materialized. No streaming guarantee.
pub struct ListRowWriter {
    rows: Vec<Row>,
}

impl ListRowWriter {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for ListRowWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowWriter for ListRowWriter {
    fn write_row(&mut self, row: Row) -> Result<(), DynError> {
        self.rows.push(row);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DynError> {
        Ok(())
    }
}
