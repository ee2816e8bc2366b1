use crate::client::{QueryParams, SqlEngine, SqlParams};
use crate::extract::RowHandler;
use crate::rows::{Row, RowCursor, SqlValue};
use crate::DynError;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use odbc_api::buffers::TextRowSet;
use odbc_api::{Cursor, DataType, Environment, ResultSetMetadata, RowSetCursor};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on the bytes buffered for a single text cell, applied
/// when the driver reports no usable display size.
const MAX_CELL_BYTES: usize = 32_768;

#[derive(Debug)]
pub struct ConnectionError {
    message: String,
    source: Option<DynError>,
}

impl ConnectionError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn with_source(message: &str, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Connection error: {}: {}", self.message, source),
            None => write!(f, "Connection error: {}", self.message),
        }
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

#[derive(Debug)]
pub struct QueryExecutionError {
    message: String,
    source: Option<DynError>,
}

impl QueryExecutionError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn with_source(message: &str, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for QueryExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Query error: {}: {}", self.message, source),
            None => write!(f, "Query error: {}", self.message),
        }
    }
}

impl Error for QueryExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryTimeoutError {
    limit_secs: u64,
    elapsed: Duration,
}

impl QueryTimeoutError {
    pub fn new(limit_secs: u64, elapsed: Duration) -> Self {
        Self {
            limit_secs,
            elapsed,
        }
    }
}

impl fmt::Display for QueryTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Query timeout: no rows within {} seconds (first fetch took {:.1} seconds)",
            self.limit_secs,
            self.elapsed.as_secs_f64()
        )
    }
}

impl Error for QueryTimeoutError {}

/// Executes one query against one engine and feeds the resulting row
/// stream to a handler. Connection, statement and fetch buffers live
/// only for the duration of the call, so teardown happens on every exit
/// path.
pub struct SqlClient {
    engine: SqlEngine,
    params: SqlParams,
}

impl SqlClient {
    pub fn new(engine: SqlEngine, params: SqlParams) -> Self {
        Self { engine, params }
    }

    pub fn engine(&self) -> SqlEngine {
        self.engine
    }

    /// Runs `sql` and hands the produced cursor to `handler`. Returns
    /// the number of rows handled.
    pub fn query_with_handler(
        &self,
        sql: &str,
        query_params: &QueryParams,
        handler: &mut RowHandler,
    ) -> Result<usize, DynError> {
        debug!("Querying for: {}", sql);
        let connection_string = self.engine.connection_string(&self.params);
        let env = Environment::new()
            .map_err(|e| ConnectionError::with_source("could not initialize ODBC", e))?;
        let conn = env
            .connect_with_connection_string(&connection_string)
            .map_err(|e| {
                ConnectionError::with_source(
                    &format!(
                        "could not connect to {} at {}",
                        self.engine.name(),
                        self.params.host_or("localhost")
                    ),
                    e,
                )
            })?;
        let started = Instant::now();
        let maybe_cursor = conn
            .execute(sql, ())
            .map_err(|e| QueryExecutionError::with_source("execution failed", e))?;
        let mut cursor = match maybe_cursor {
            // statement produced no result set (e.g. DDL); nothing to stream
            None => return Ok(0),
            Some(cursor) => cursor,
        };

        let keys = column_keys(&mut cursor)?;
        let col_types = column_types(&mut cursor, keys.len())?;
        let mut buffers =
            TextRowSet::for_cursor(query_params.fetch_size(), &mut cursor, Some(MAX_CELL_BYTES))
                .map_err(|e| {
                    QueryExecutionError::with_source("could not allocate fetch buffers", e)
                })?;
        let row_set_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(|e| QueryExecutionError::with_source("could not bind fetch buffers", e))?;
        let mut stream = OdbcRowCursor::new(row_set_cursor, keys, col_types, query_params, started);
        let count = handler.handle(&mut stream)?;
        Ok(count)
    }
}

fn column_keys(cursor: &mut impl ResultSetMetadata) -> Result<Vec<Arc<str>>, DynError> {
    let names = cursor
        .column_names()
        .map_err(|e| QueryExecutionError::with_source("could not read result set metadata", e))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| QueryExecutionError::with_source("could not read column names", e))?;
    Ok(names.iter().map(|n| Arc::from(n.as_str())).collect())
}

fn column_types(
    cursor: &mut impl ResultSetMetadata,
    num_cols: usize,
) -> Result<Vec<DataType>, DynError> {
    let mut types = Vec::with_capacity(num_cols);
    for col in 1..=num_cols as u16 {
        let dt = cursor
            .col_data_type(col)
            .map_err(|e| QueryExecutionError::with_source("could not read column types", e))?;
        types.push(dt);
    }
    Ok(types)
}

/// Streaming cursor over an ODBC result set. Rows are pulled in
/// fetch-size batches and converted one batch at a time, so memory use
/// is bounded by the fetch size, never by the total row count.
struct OdbcRowCursor<'b, C: Cursor> {
    cursor: RowSetCursor<C, &'b mut TextRowSet>,
    keys: Vec<Arc<str>>,
    col_types: Vec<DataType>,
    max_rows: Option<usize>,
    timeout: Option<u64>,
    started: Instant,
    produced: usize,
    fetched_first: bool,
    pending: VecDeque<Row>,
    done: bool,
}

impl<'b, C: Cursor> OdbcRowCursor<'b, C> {
    fn new(
        cursor: RowSetCursor<C, &'b mut TextRowSet>,
        keys: Vec<Arc<str>>,
        col_types: Vec<DataType>,
        query_params: &QueryParams,
        started: Instant,
    ) -> Self {
        Self {
            cursor,
            keys,
            col_types,
            max_rows: query_params.max_rows(),
            timeout: query_params.timeout(),
            started,
            produced: 0,
            fetched_first: false,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Pulls the next batch into `pending`. Returns false once the data
    /// source is exhausted.
    fn fill_pending(&mut self) -> Result<bool, DynError> {
        let batch = self
            .cursor
            .fetch()
            .map_err(|e| QueryExecutionError::with_source("fetching rows failed", e))?;
        if !self.fetched_first {
            self.fetched_first = true;
            if let Some(limit) = self.timeout {
                let elapsed = self.started.elapsed();
                if elapsed > Duration::from_secs(limit) {
                    return Err(Box::new(QueryTimeoutError::new(limit, elapsed)));
                }
            }
        }
        let batch = match batch {
            None => return Ok(false),
            Some(batch) => batch,
        };
        if batch.num_rows() == 0 {
            return Ok(false);
        }
        for row_index in 0..batch.num_rows() {
            let mut data = Vec::with_capacity(self.keys.len());
            for (col_index, key) in self.keys.iter().enumerate() {
                let value = cell_to_value(batch.at(col_index, row_index), &self.col_types[col_index]);
                data.push((Arc::clone(key), value));
            }
            self.pending.push_back(Row::new(data));
        }
        Ok(true)
    }
}

impl<'b, C: Cursor> RowCursor for OdbcRowCursor<'b, C> {
    fn next_row(&mut self) -> Result<Option<Row>, DynError> {
        if let Some(max) = self.max_rows {
            if self.produced >= max {
                return Ok(None);
            }
        }
        if self.pending.is_empty() {
            if self.done {
                return Ok(None);
            }
            if !self.fill_pending()? {
                self.done = true;
                return Ok(None);
            }
        }
        match self.pending.pop_front() {
            Some(row) => {
                self.produced += 1;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}

/// Converts one text-form cell into a typed value based on the column's
/// reported SQL type. Anything that fails to parse degrades to a plain
/// string rather than dropping data.
fn cell_to_value(bytes: Option<&[u8]>, data_type: &DataType) -> SqlValue {
    let bytes = match bytes {
        None => return SqlValue::NullVal,
        Some(bytes) => bytes,
    };
    let text = String::from_utf8_lossy(bytes);
    match data_type {
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => text
            .trim()
            .parse::<i64>()
            .map(SqlValue::LongVal)
            .unwrap_or_else(|_| SqlValue::StrVal(text.into_owned())),
        DataType::Real | DataType::Double | DataType::Float { .. } => text
            .trim()
            .parse::<f64>()
            .map(SqlValue::DoubleVal)
            .unwrap_or_else(|_| SqlValue::StrVal(text.into_owned())),
        DataType::Numeric { scale: 0, .. } | DataType::Decimal { scale: 0, .. } => text
            .trim()
            .parse::<i64>()
            .map(SqlValue::LongVal)
            .unwrap_or_else(|_| SqlValue::StrVal(text.into_owned())),
        DataType::Numeric { .. } | DataType::Decimal { .. } => text
            .trim()
            .parse::<f64>()
            .map(SqlValue::DoubleVal)
            .unwrap_or_else(|_| SqlValue::StrVal(text.into_owned())),
        DataType::Bit => match text.trim() {
            "1" => SqlValue::BoolVal(true),
            "0" => SqlValue::BoolVal(false),
            _ => SqlValue::StrVal(text.into_owned()),
        },
        DataType::Timestamp { .. } => {
            NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S%.f")
                .map(SqlValue::TimeVal)
                .unwrap_or_else(|_| SqlValue::StrVal(text.into_owned()))
        }
        DataType::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(SqlValue::TimeVal)
            .unwrap_or_else(|| SqlValue::StrVal(text.into_owned())),
        _ => SqlValue::StrVal(text.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_to_value_null() {
        assert_eq!(cell_to_value(None, &DataType::Integer), SqlValue::NullVal);
    }

    #[test]
    fn cell_to_value_typed() {
        assert_eq!(
            cell_to_value(Some(b"42"), &DataType::BigInt),
            SqlValue::LongVal(42)
        );
        assert_eq!(
            cell_to_value(Some(b"1.5"), &DataType::Double),
            SqlValue::DoubleVal(1.5)
        );
        assert_eq!(
            cell_to_value(Some(b"1"), &DataType::Bit),
            SqlValue::BoolVal(true)
        );
        assert_eq!(
            cell_to_value(
                Some(b"hello"),
                &DataType::Varchar { length: 32 }
            ),
            SqlValue::StrVal("hello".to_string())
        );
    }

    #[test]
    fn cell_to_value_timestamp() {
        let v = cell_to_value(
            Some(b"2023-04-05 06:07:08.125"),
            &DataType::Timestamp { precision: 3 },
        );
        match v {
            SqlValue::TimeVal(ts) => assert_eq!(ts.to_string(), "2023-04-05 06:07:08.125"),
            other => panic!("expected TimeVal, got {:?}", other),
        }
    }

    #[test]
    fn cell_to_value_degrades_to_string() {
        assert_eq!(
            cell_to_value(Some(b"not a number"), &DataType::Integer),
            SqlValue::StrVal("not a number".to_string())
        );
    }

    #[test]
    fn numeric_scale_selects_integer_or_double() {
        assert_eq!(
            cell_to_value(
                Some(b"7"),
                &DataType::Numeric {
                    precision: 10,
                    scale: 0
                }
            ),
            SqlValue::LongVal(7)
        );
        assert_eq!(
            cell_to_value(
                Some(b"7.25"),
                &DataType::Decimal {
                    precision: 10,
                    scale: 2
                }
            ),
            SqlValue::DoubleVal(7.25)
        );
    }
}
