use crate::output::RowWriter;
use crate::rows::Row;
use crate::DynError;

/// Forwards each row to a caller-supplied function instead of a file.
/// Any value the callback computes is discarded; close is a no-op.
pub struct CallbackRowWriter<'a> {
    callback: Box<dyn FnMut(&Row) + 'a>,
}

impl<'a> CallbackRowWriter<'a> {
    pub fn new(callback: impl FnMut(&Row) + 'a) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl<'a> RowWriter for CallbackRowWriter<'a> {
    fn write_row(&mut self, row: Row) -> Result<(), DynError> {
        (self.callback)(&row);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DynError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::SqlValue;
    use std::cell::RefCell;
    use std::sync::Arc;

    #[test]
    fn invokes_callback_once_per_row_in_order() {
        let seen: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let mut wr = CallbackRowWriter::new(|row: &Row| {
            seen.borrow_mut()
                .push(row.get("a").map(|v| v.to_field_str()).unwrap_or_default());
        });
        let rows = vec![
            Row::new(vec![(Arc::from("a"), SqlValue::StrVal("x".to_string()))]),
            Row::new(vec![(Arc::from("a"), SqlValue::StrVal("y".to_string()))]),
        ];
        let count = wr.write_rows(rows).unwrap();
        wr.close().unwrap();
        assert_eq!(count, 2);
        assert_eq!(*seen.borrow(), vec!["x".to_string(), "y".to_string()]);
    }
}
