// Copyright 2026 Marin Kolev

mod extractor;
mod row_handler;
mod text_format;

pub use crate::extract::extractor::*;
pub use crate::extract::row_handler::*;
pub use crate::extract::text_format::*;

use crate::DynError;
use std::error::Error;
use std::fmt;

/// Failure partway through an extraction. Rows already written stay in
/// the destination; the count says how many.
#[derive(Debug)]
pub struct ExtractionError {
    rows_written: usize,
    source: DynError,
}

impl ExtractionError {
    pub fn new(rows_written: usize, source: DynError) -> Self {
        Self {
            rows_written,
            source,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Extraction failed after {} rows: {}",
            self.rows_written, self.source
        )
    }
}

impl Error for ExtractionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}
