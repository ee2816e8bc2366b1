use crate::extract::KeyCaseFormat;
use log::info;
use std::collections::BTreeMap;

/// Parameters used to set up an initial connection. Immutable once
/// built; every invocation constructs its own.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    custom: BTreeMap<String, String>,
}

impl ConnectionParams {
    pub fn new(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            host,
            port,
            user,
            password,
            custom: BTreeMap::new(),
        }
    }

    pub fn with_custom(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        password: Option<String>,
        custom: BTreeMap<String, String>,
    ) -> Self {
        Self {
            host,
            port,
            user,
            password,
            custom,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn host_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.host.as_deref().unwrap_or(default)
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.custom.get(name).map(|v| v.as_str())
    }

    pub fn property_as_bool(&self, name: &str) -> Option<bool> {
        self.property(name).and_then(|v| {
            match v.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            }
        })
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(|k| k.as_str())
    }

    pub fn custom_properties(&self) -> &BTreeMap<String, String> {
        &self.custom
    }

    pub fn log_values(&self) {
        info!("User: {}", self.user.as_deref().unwrap_or(""));
        info!("Password: <not shown>");
        info!("Host: {}", self.host.as_deref().unwrap_or(""));
        info!(
            "Port: {}",
            self.port.map(|p| p.to_string()).unwrap_or_default()
        );
        for (name, value) in &self.custom {
            info!("{}: {}", name, value);
        }
    }
}

/// Connection parameters plus the database to run queries against.
#[derive(Debug, Clone)]
pub struct SqlParams {
    connection: ConnectionParams,
    database: Option<String>,
}

impl SqlParams {
    pub fn new(connection: ConnectionParams, database: Option<String>) -> Self {
        Self {
            connection,
            database,
        }
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn host_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.connection.host_or(default)
    }

    pub fn port_or(&self, default: u16) -> u16 {
        self.connection.port_or(default)
    }

    pub fn user(&self) -> Option<&str> {
        self.connection.user()
    }

    pub fn password(&self) -> Option<&str> {
        self.connection.password()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.connection.property(name)
    }

    pub fn custom_properties(&self) -> &BTreeMap<String, String> {
        self.connection.custom_properties()
    }

    pub fn log_values(&self) {
        self.connection.log_values();
        info!("Database: {}", self.database.as_deref().unwrap_or(""));
    }
}

const DEFAULT_FETCH_SIZE: usize = 10_000;
const DEFAULT_LOG_FREQUENCY: usize = 100_000;

/// Parameters passed at query time. They control the querying mechanism
/// itself, such as the number of rows retrieved per round-trip.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    fetch_size: Option<usize>,
    max_rows: Option<usize>,
    timeout: Option<u64>,
    log_frequency: Option<usize>,
}

impl QueryParams {
    pub fn new(
        fetch_size: Option<usize>,
        max_rows: Option<usize>,
        timeout: Option<u64>,
        log_frequency: Option<usize>,
    ) -> Self {
        Self {
            fetch_size,
            max_rows,
            timeout,
            log_frequency,
        }
    }

    pub fn default_params() -> Self {
        Self::default()
    }

    /// Rows fetched per round-trip. A streaming hint, not a result
    /// limiter.
    pub fn fetch_size(&self) -> usize {
        self.fetch_size.unwrap_or(DEFAULT_FETCH_SIZE)
    }

    /// Hard cap on the number of rows produced, if any.
    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    /// Maximum time in seconds to wait for the query to start returning
    /// rows, if any.
    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn log_frequency(&self) -> usize {
        self.log_frequency.unwrap_or(DEFAULT_LOG_FREQUENCY)
    }

    pub fn log_values(&self) {
        info!(
            "Query Max Rows: {}",
            self.max_rows.map(|v| v.to_string()).unwrap_or_default()
        );
        info!(
            "Query Timeout: {}",
            self.timeout.map(|v| v.to_string()).unwrap_or_default()
        );
        info!("Query Fetch Size: {}", self.fetch_size());
    }
}

/// How to format the output of a query. Currently only the key case
/// may be changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormattingParams {
    key_case_format: KeyCaseFormat,
}

impl FormattingParams {
    pub fn new(key_case_format: KeyCaseFormat) -> Self {
        Self { key_case_format }
    }

    pub fn key_case_format(&self) -> KeyCaseFormat {
        self.key_case_format
    }

    pub fn log_values(&self) {
        info!("Key Case Format: {}", self.key_case_format.name());
    }
}

/// Transport toggles for the SFTP path. Neither is correctness
/// critical.
#[derive(Debug, Clone, Copy, Default)]
pub struct SftpParams {
    compress: bool,
    check_host_key: bool,
}

impl SftpParams {
    pub fn new(compress: bool, check_host_key: bool) -> Self {
        Self {
            compress,
            check_host_key,
        }
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn check_host_key(&self) -> bool {
        self.check_host_key
    }
}
