use crate::extract::{format_row_keys, ExtractionError, KeyCaseFormat};
use crate::output::RowWriter;
use crate::rows::RowCursor;
use log::info;

/// Consumes a row cursor: applies the key transform, forwards each row
/// to the writer, counts, and emits a progress notice every
/// `log_frequency` rows. Rows are written in the exact order the cursor
/// yields them.
pub struct RowHandler<'a> {
    writer: &'a mut dyn RowWriter,
    log_frequency: usize,
    key_format: KeyCaseFormat,
}

impl<'a> RowHandler<'a> {
    pub fn new(
        writer: &'a mut dyn RowWriter,
        log_frequency: usize,
        key_format: KeyCaseFormat,
    ) -> Self {
        Self {
            writer,
            log_frequency,
            key_format,
        }
    }

    /// Returns the number of rows handled. On failure the error carries
    /// the count written before it, and whatever was written stays in
    /// the writer's destination.
    pub fn handle(&mut self, cursor: &mut dyn RowCursor) -> Result<usize, ExtractionError> {
        let mut count = 0usize;
        loop {
            let row = match cursor.next_row() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(ExtractionError::new(count, e)),
            };
            let row = format_row_keys(row, self.key_format);
            if let Err(e) = self.writer.write_row(row) {
                return Err(ExtractionError::new(count, e));
            }
            count += 1;
            if self.log_frequency > 0 && count % self.log_frequency == 0 {
                info!("Handling {} rows...", count);
            }
        }
        Ok(count)
    }
}
