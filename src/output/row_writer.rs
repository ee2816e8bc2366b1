use crate::rows::Row;
use crate::DynError;

/// Destination for a stream of rows.
///
/// Lifecycle is open -> zero or more write_row -> close. Implementations
/// bound to a file must make close idempotent and safe to call even if
/// the writer was never opened.
pub trait RowWriter {
    fn write_row(&mut self, row: Row) -> Result<(), DynError>;

    /// Bulk convenience: writes the rows in the given order and returns
    /// the number written.
    fn write_rows(&mut self, rows: Vec<Row>) -> Result<usize, DynError> {
        let mut count = 0usize;
        for row in rows {
            self.write_row(row)?;
            count += 1;
        }
        Ok(count)
    }

    fn close(&mut self) -> Result<(), DynError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ListRowWriter;
    use crate::rows::SqlValue;
    use std::sync::Arc;

    fn row(n: i64) -> Row {
        Row::new(vec![(Arc::from("n"), SqlValue::LongVal(n))])
    }

    #[test]
    fn write_rows_returns_count_in_order() {
        let mut wr = ListRowWriter::new();
        let count = wr.write_rows(vec![row(1), row(2), row(3)]).unwrap();
        assert_eq!(count, 3);
        let seen = wr
            .rows()
            .iter()
            .map(|r| r.get("n").cloned().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            seen,
            vec![
                SqlValue::LongVal(1),
                SqlValue::LongVal(2),
                SqlValue::LongVal(3)
            ]
        );
    }
}
