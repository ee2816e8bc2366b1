use crate::conf::external::ExternalConfig;
use crate::DynError;
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "sqlpour")]
#[clap(author = "Marin Kolev <marin.t.kolev@gmail.com>")]
#[clap(version = "0.1")]
#[clap(about = "Pour SQL query results into CSV or JSONL files", long_about = None)]
pub struct MyArgs {
    /// User to connect as
    #[clap(short, long)]
    pub user: Option<String>,

    /// Server to connect to, defaults to localhost
    #[clap(short = 'H', long)]
    pub host: Option<String>,

    /// Server port, defaults to the engine's default port
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Database to run the query against
    #[clap(short, long)]
    pub database: Option<String>,

    /// Engine type. One of:
    ///     sqlserver | mysql | postgres | redshift | snowflake | athena | informix
    /// (common aliases such as mssql or mariadb work too)
    #[clap(short = 't', long = "type")]
    pub engine: Option<String>,

    /// SQL file to read, "-" for stdin
    #[clap(short, long)]
    pub sql: Option<String>,

    /// File to write to. Defaults to query_result.json
    #[clap(short = 'f', long)]
    pub file: Option<String>,

    /// Output format (json | csv), defaults to json
    #[clap(long)]
    pub format: Option<String>,

    /// Key case format (default | snake | camel)
    #[clap(short = 'c', long = "case")]
    pub key_case: Option<String>,

    /// Rows to fetch per round-trip
    #[clap(long)]
    pub fetch_size: Option<usize>,

    /// Query timeout in seconds
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Maximum rows to retrieve
    #[clap(long)]
    pub max_rows: Option<usize>,

    /// Rows between progress log lines
    #[clap(long)]
    pub log_frequency: Option<usize>,

    /// Download a file over SFTP instead of querying a database
    #[clap(long)]
    pub sftp: bool,

    /// Remote file to download when using --sftp
    #[clap(long)]
    pub input_file: Option<String>,

    /// Compress SFTP traffic
    #[clap(long)]
    pub compress: bool,

    /// Use strict host key checking for the SFTP connection
    #[clap(long)]
    pub check_host: bool,

    /// Custom engine properties, can be multiple. E.g. --custom sslmode=require
    #[clap(long)]
    pub custom: Vec<String>,

    /// Yaml config file to use for default values
    /// command line options still override conf values
    #[clap(long)]
    pub(crate) conf: Option<String>,

    /// Log the resolved parameters and exit without connecting
    #[clap(long)]
    pub dry_run: bool,
}

impl MyArgs {
    pub fn get_external_conf(&self) -> Result<ExternalConfig, DynError> {
        match &self.conf {
            Some(path) => ExternalConfig::from_yaml_file(path.as_str()),
            None => Ok(ExternalConfig::empty()),
        }
    }
}
