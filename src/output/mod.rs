// Copyright 2026 Marin Kolev

mod callback;
mod csv;
mod jsonl;
mod list;
mod row_writer;

pub use crate::output::callback::*;
pub use crate::output::csv::*;
pub use crate::output::jsonl::*;
pub use crate::output::list::*;
pub use crate::output::row_writer::*;

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub struct WriterError(String);

impl WriterError {
    pub fn new(s: &str) -> WriterError {
        WriterError(s.to_string())
    }
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Row writer error: {}", self.0)
    }
}

impl Error for WriterError {}
