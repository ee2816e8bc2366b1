use crate::client::{
    ConnectionParams, FormattingParams, LogPercentDone, QueryParams, SftpClient, SftpParams,
    SqlClient, SqlEngine, SqlParams,
};
use crate::conf::FileOutputFormat;
use crate::extract::RowHandler;
use crate::output::{CallbackRowWriter, CsvRowWriter, JsonlRowWriter, ListRowWriter, RowWriter};
use crate::rows::Row;
use crate::DynError;

/// Primary entry point for database extractions: wires engine, client,
/// row handler and writer together for one query.
pub struct SqlExtractor {
    client: SqlClient,
    formatting_params: FormattingParams,
}

impl SqlExtractor {
    pub fn new(engine: SqlEngine, params: SqlParams, formatting_params: FormattingParams) -> Self {
        Self {
            client: SqlClient::new(engine, params),
            formatting_params,
        }
    }

    /// Executes a query and returns all rows materialized in memory.
    pub fn query_as_list(
        &self,
        sql: &str,
        query_params: &QueryParams,
    ) -> Result<Vec<Row>, DynError> {
        let mut writer = ListRowWriter::new();
        self.run_query(sql, query_params, &mut writer)?;
        Ok(writer.into_rows())
    }

    /// Executes a query, invoking `callback` once per row. Returns the
    /// number of rows in the result set.
    pub fn query_with_callback(
        &self,
        sql: &str,
        callback: impl FnMut(&Row),
        query_params: &QueryParams,
    ) -> Result<usize, DynError> {
        let mut writer = CallbackRowWriter::new(callback);
        self.run_query(sql, query_params, &mut writer)
    }

    /// Executes a query and streams the output to a file. The writer is
    /// closed exactly once, whether the query succeeds or fails, and
    /// rows written before a failure stay in the file.
    pub fn query_to_file(
        &self,
        sql: &str,
        filename: &str,
        output_format: FileOutputFormat,
        query_params: &QueryParams,
    ) -> Result<usize, DynError> {
        let mut writer: Box<dyn RowWriter> = match output_format {
            FileOutputFormat::Json => {
                let mut wr = JsonlRowWriter::new();
                wr.open(filename)?;
                Box::new(wr)
            }
            FileOutputFormat::Csv => {
                let mut wr = CsvRowWriter::new();
                wr.open(filename)?;
                Box::new(wr)
            }
        };
        let result = self.run_query(sql, query_params, writer.as_mut());
        let close_result = writer.close();
        let count = result?;
        close_result?;
        Ok(count)
    }

    fn run_query(
        &self,
        sql: &str,
        query_params: &QueryParams,
        writer: &mut dyn RowWriter,
    ) -> Result<usize, DynError> {
        let mut handler = RowHandler::new(
            writer,
            query_params.log_frequency(),
            self.formatting_params.key_case_format(),
        );
        self.client.query_with_handler(sql, query_params, &mut handler)
    }
}

/// Entry point for the SFTP path: downloads exactly one remote file to
/// one local destination.
pub struct SftpExtractor {
    client: SftpClient,
}

impl SftpExtractor {
    pub fn new(params: ConnectionParams, sftp_params: SftpParams) -> Self {
        Self {
            client: SftpClient::new(params, sftp_params),
        }
    }

    pub fn download(&mut self, remote_path: &str, local_path: &str) -> Result<(), DynError> {
        let mut progress = LogPercentDone::new();
        self.client
            .download_file(remote_path, local_path, &mut progress)?;
        Ok(())
    }
}
