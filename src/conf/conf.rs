use crate::client::{
    ConnectionParams, FormattingParams, QueryParams, SftpParams, SqlEngine, SqlParams,
};
use crate::conf::{ConfigError, ExternalConfig, MyArgs};
use crate::extract::KeyCaseFormat;
use crate::DynError;
use log::{debug, info};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Read, Write};

pub const ENV_VAR_PASSWORD_KEY: &str = "SQLPOUR_DB_PASSWORD";
const DEFAULT_OUTPUT_FILENAME: &str = "query_result.json";

macro_rules! args_or_external {
    ($a:expr, $b:expr, $prop:ident) => {
        if $a.$prop.is_some() {
            $a.$prop.clone()
        } else {
            $b.$prop.clone()
        }
    };
}

macro_rules! args_or_external_default {
    ($a:expr, $b:expr, $prop:ident, $def:expr) => {
        args_or_external!($a, $b, $prop).unwrap_or_else(|| $def.into())
    };
}

macro_rules! args_or_external_bool {
    ($a:expr, $b:expr, $prop:ident, $def:expr) => {
        if $a.$prop {
            true
        } else {
            $b.$prop.unwrap_or($def)
        }
    };
}

/// The output serialization for database extractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutputFormat {
    Json,
    Csv,
}

impl FileOutputFormat {
    pub fn by_name(name: &str) -> Result<FileOutputFormat, ConfigError> {
        match name.to_lowercase().as_str() {
            "json" | "jsonl" => Ok(FileOutputFormat::Json),
            "csv" => Ok(FileOutputFormat::Csv),
            other => Err(ConfigError::new(&format!(
                "Unknown output format: {}",
                other
            ))),
        }
    }
}

/// Resolved runtime configuration: command-line arguments merged over
/// the optional YAML defaults file.
#[derive(Debug, Clone)]
pub struct SqlPourConfig {
    user: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    engine: Option<String>,

    sql: String,
    file: String,
    format: String,
    key_case: Option<String>,

    fetch_size: Option<usize>,
    timeout: Option<u64>,
    max_rows: Option<usize>,
    log_frequency: Option<usize>,

    custom: BTreeMap<String, String>,

    sftp: bool,
    input_file: Option<String>,
    compress: bool,
    check_host: bool,

    dry_run: bool,
}

impl SqlPourConfig {
    pub fn new(args: MyArgs) -> Result<SqlPourConfig, DynError> {
        let external_conf = args.get_external_conf()?;
        let mut custom: BTreeMap<String, String> =
            external_conf.custom.clone().unwrap_or_default();
        for entry in &args.custom {
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    custom.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(Box::new(ConfigError::new(&format!(
                        "Invalid custom property '{}', expected key=value",
                        entry
                    ))))
                }
            }
        }
        Ok(Self {
            user: args_or_external!(&args, &external_conf, user),
            host: args_or_external!(&args, &external_conf, host),
            port: args_or_external!(&args, &external_conf, port),
            database: args_or_external!(&args, &external_conf, database),
            engine: args_or_external!(&args, &external_conf, engine),
            sql: args_or_external_default!(&args, &external_conf, sql, "-"),
            file: args_or_external_default!(&args, &external_conf, file, DEFAULT_OUTPUT_FILENAME),
            format: args_or_external_default!(&args, &external_conf, format, "json"),
            key_case: args_or_external!(&args, &external_conf, key_case),
            fetch_size: args_or_external!(&args, &external_conf, fetch_size),
            timeout: args_or_external!(&args, &external_conf, timeout),
            max_rows: args_or_external!(&args, &external_conf, max_rows),
            log_frequency: args_or_external!(&args, &external_conf, log_frequency),
            custom,
            sftp: args_or_external_bool!(&args, &external_conf, sftp, false),
            input_file: args_or_external!(&args, &external_conf, input_file),
            compress: args_or_external_bool!(&args, &external_conf, compress, false),
            check_host: args_or_external_bool!(&args, &external_conf, check_host, false),
            dry_run: args.dry_run,
        })
    }

    pub fn is_sftp(&self) -> bool {
        self.sftp
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn sql_engine(&self) -> Result<SqlEngine, DynError> {
        let name = self
            .engine
            .as_deref()
            .ok_or_else(|| ConfigError::new("An engine type is required"))?;
        Ok(SqlEngine::by_name(name)?)
    }

    pub fn output_format(&self) -> Result<FileOutputFormat, ConfigError> {
        FileOutputFormat::by_name(&self.format)
    }

    pub fn key_case_format(&self) -> KeyCaseFormat {
        KeyCaseFormat::by_name(self.key_case.as_deref())
    }

    pub fn formatting_params(&self) -> FormattingParams {
        FormattingParams::new(self.key_case_format())
    }

    pub fn query_params(&self) -> QueryParams {
        QueryParams::new(self.fetch_size, self.max_rows, self.timeout, self.log_frequency)
    }

    pub fn connection_params(&self) -> Result<ConnectionParams, DynError> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| ConfigError::new("A user is required"))?;
        let password = get_password()?;
        Ok(ConnectionParams::with_custom(
            self.host.clone(),
            self.port,
            Some(user),
            Some(password),
            self.custom.clone(),
        ))
    }

    pub fn sql_params(&self) -> Result<SqlParams, DynError> {
        Ok(SqlParams::new(
            self.connection_params()?,
            self.database.clone(),
        ))
    }

    pub fn sftp_params(&self) -> SftpParams {
        SftpParams::new(self.compress, self.check_host)
    }

    pub fn input_file(&self) -> Result<&str, ConfigError> {
        self.input_file
            .as_deref()
            .ok_or_else(|| ConfigError::new("--input-file is required with --sftp"))
    }

    pub fn output_file(&self) -> &str {
        &self.file
    }

    /// Reads the SQL text from the configured file, or stdin for "-".
    pub fn read_sql(&self) -> Result<String, DynError> {
        if self.sql == "-" {
            info!("Reading SQL from stdin");
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        } else {
            debug!("Reading {}", self.sql);
            Ok(fs::read_to_string(&self.sql)?)
        }
    }

    pub fn log_values(&self) {
        info!("Engine: {}", self.engine.as_deref().unwrap_or(""));
        info!("User: {}", self.user.as_deref().unwrap_or(""));
        info!("Password: <not shown>");
        info!("Host: {}", self.host.as_deref().unwrap_or(""));
        info!(
            "Port: {}",
            self.port.map(|p| p.to_string()).unwrap_or_default()
        );
        info!("Database: {}", self.database.as_deref().unwrap_or(""));
        info!("SQL input: {}", self.sql);
        info!("Output file: {}", self.file);
        info!("Output format: {}", self.format);
        info!("Key case: {}", self.key_case_format().name());
        self.query_params().log_values();
        for (name, value) in &self.custom {
            info!("{}: {}", name, value);
        }
        if self.sftp {
            info!("SFTP input file: {}", self.input_file.as_deref().unwrap_or(""));
            info!("SFTP compression: {}", self.compress);
            info!("SFTP strict host key checking: {}", self.check_host);
        }
    }
}

/// Try to get the password from the environment, prompt on the console
/// if it is not set.
fn get_password() -> Result<String, DynError> {
    if let Ok(value) = env::var(ENV_VAR_PASSWORD_KEY) {
        return Ok(value);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}
