use crate::client::SqlParams;
use std::error::Error;
use std::fmt;

/// The type of database to connect to. Each variant knows its ODBC
/// driver name, default port and the engine-specific connection-string
/// extensions it honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlEngine {
    SqlServer,
    MySql,
    PostgreSql,
    Redshift,
    Snowflake,
    Athena,
    Informix,
}

#[derive(Debug, Clone)]
pub struct UnsupportedEngineError(String);

impl UnsupportedEngineError {
    pub fn new(name: &str) -> UnsupportedEngineError {
        UnsupportedEngineError(name.to_string())
    }
}

impl fmt::Display for UnsupportedEngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unsupported SQL engine: {}", self.0)
    }
}

impl Error for UnsupportedEngineError {}

impl SqlEngine {
    /// Resilient against differences in common names (MySQL vs MariaDB,
    /// Postgres vs PostgreSQL). Case insensitive, spaces count as
    /// underscores.
    pub fn by_name(name: &str) -> Result<SqlEngine, UnsupportedEngineError> {
        let cleaned = name.to_lowercase().replace(' ', "_");
        match cleaned.as_str() {
            "sqlserver" | "sql_server" | "mssql" | "ms_sql" | "ms_sql_server"
            | "microsoft_sql_server" | "azure" => Ok(SqlEngine::SqlServer),
            "mysql" | "mariadb" | "maria" => Ok(SqlEngine::MySql),
            "postgresql" | "postgres" => Ok(SqlEngine::PostgreSql),
            "redshift" => Ok(SqlEngine::Redshift),
            "snowflake" => Ok(SqlEngine::Snowflake),
            "athena" | "aws_athena" | "awsathena" => Ok(SqlEngine::Athena),
            "informix" | "ibm_informix" => Ok(SqlEngine::Informix),
            _ => Err(UnsupportedEngineError::new(name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SqlEngine::SqlServer => "sqlserver",
            SqlEngine::MySql => "mysql",
            SqlEngine::PostgreSql => "postgresql",
            SqlEngine::Redshift => "redshift",
            SqlEngine::Snowflake => "snowflake",
            SqlEngine::Athena => "athena",
            SqlEngine::Informix => "informix",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            SqlEngine::SqlServer => 1433,
            SqlEngine::MySql => 3306,
            SqlEngine::PostgreSql => 5432,
            SqlEngine::Redshift => 5439,
            SqlEngine::Snowflake => 443,
            SqlEngine::Athena => 443,
            SqlEngine::Informix => 9088,
        }
    }

    pub fn default_driver(&self) -> &'static str {
        match self {
            SqlEngine::SqlServer => "ODBC Driver 18 for SQL Server",
            SqlEngine::MySql => "MySQL ODBC 8.0 Unicode Driver",
            SqlEngine::PostgreSql => "PostgreSQL Unicode",
            SqlEngine::Redshift => "Amazon Redshift (x64)",
            SqlEngine::Snowflake => "SnowflakeDSIIDriver",
            SqlEngine::Athena => "Simba Athena ODBC Driver",
            SqlEngine::Informix => "IBM INFORMIX ODBC DRIVER",
        }
    }

    /// The driver actually used for a connection: the `driver` custom
    /// property when present, the engine default otherwise.
    pub fn driver_name<'a>(&self, params: &'a SqlParams) -> &'a str {
        params.property("driver").unwrap_or_else(|| self.default_driver())
    }

    /// Maps the connection profile to an ODBC connection string.
    /// Recognized engine extensions are renamed to their driver
    /// keywords; any other custom property is passed through verbatim.
    pub fn connection_string(&self, params: &SqlParams) -> String {
        let mut cs = ConnStringBuilder::new();
        cs.push_raw("Driver", &format!("{{{}}}", self.driver_name(params)));
        match self {
            SqlEngine::SqlServer => self.build_sqlserver(params, &mut cs),
            SqlEngine::MySql => self.build_mysql(params, &mut cs),
            SqlEngine::PostgreSql => self.build_postgresql(params, &mut cs),
            SqlEngine::Redshift => self.build_redshift(params, &mut cs),
            SqlEngine::Snowflake => self.build_snowflake(params, &mut cs),
            SqlEngine::Athena => self.build_athena(params, &mut cs),
            SqlEngine::Informix => self.build_informix(params, &mut cs),
        }
        cs.push_passthrough(params);
        cs.into_string()
    }

    fn build_sqlserver(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push(
            "Server",
            &format!(
                "{},{}",
                params.host_or("localhost"),
                params.port_or(self.default_port())
            ),
        );
        cs.push_opt("Database", params.database());
        cs.push_opt("UID", params.user());
        cs.push_opt("PWD", params.password());
        cs.push_renamed(params, "encrypt", "Encrypt");
        cs.push_renamed(params, "trust_server_certificate", "TrustServerCertificate");
        cs.push_renamed(params, "authentication", "Authentication");
        cs.push_renamed(params, "hostname_in_certificate", "HostNameInCertificate");
        cs.push_renamed(params, "failover_partner", "Failover_Partner");
        cs.push_renamed(params, "column_encryption", "ColumnEncryption");
        if params.connection().property_as_bool("integrated_security") == Some(true) {
            cs.push("Trusted_Connection", "yes");
        }
        cs.consume("integrated_security");
    }

    fn build_mysql(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push("Server", params.host_or("localhost"));
        cs.push("Port", &params.port_or(self.default_port()).to_string());
        cs.push_opt("Database", params.database());
        cs.push_opt("User", params.user());
        cs.push_opt("Password", params.password());
        cs.push_renamed(params, "ssl_mode", "SslMode");
        cs.push_renamed(params, "ssl_ca", "SslCa");
        cs.push_renamed(params, "charset", "Charset");
    }

    fn build_postgresql(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push("Server", params.host_or("localhost"));
        cs.push("Port", &params.port_or(self.default_port()).to_string());
        cs.push_opt("Database", params.database());
        cs.push_opt("Uid", params.user());
        cs.push_opt("Pwd", params.password());
        cs.push_renamed(params, "ssl_mode", "SSLmode");
        cs.push_renamed(params, "ssl_root_cert", "SSLRootCert");
        cs.push_renamed(params, "kerberos_server_name", "KrbSrvName");
    }

    fn build_redshift(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push("Server", params.host_or("localhost"));
        cs.push("Port", &params.port_or(self.default_port()).to_string());
        cs.push_opt("Database", params.database());
        cs.push_opt("UID", params.user());
        cs.push_opt("PWD", params.password());
        cs.push_renamed(params, "ssl", "SSL");
        cs.push_renamed(params, "ssl_mode", "SSLMode");
    }

    fn build_snowflake(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push("Server", params.host_or("localhost"));
        cs.push("Port", &params.port_or(self.default_port()).to_string());
        cs.push_opt("Database", params.database());
        cs.push_opt("UID", params.user());
        cs.push_opt("PWD", params.password());
        cs.push_renamed(params, "account", "Account");
        cs.push_renamed(params, "warehouse", "Warehouse");
        cs.push_renamed(params, "role", "Role");
        cs.push_renamed(params, "schema", "Schema");
        cs.push_renamed(params, "tracing", "Tracing");
    }

    fn build_athena(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        // Athena has no host/port; the region and result bucket select
        // the endpoint.
        cs.push_renamed(params, "region", "AwsRegion");
        cs.push_renamed(params, "s3_output_location", "S3OutputLocation");
        cs.push_renamed(params, "workgroup", "Workgroup");
        cs.push_opt("Schema", params.database());
        cs.push("AuthenticationType", "IAM Credentials");
        cs.push_opt("UID", params.user());
        cs.push_opt("PWD", params.password());
    }

    fn build_informix(&self, params: &SqlParams, cs: &mut ConnStringBuilder) {
        cs.push("Host", params.host_or("localhost"));
        cs.push("Service", &params.port_or(self.default_port()).to_string());
        cs.push_renamed_or(params, "server", "Server", "");
        cs.push_opt("Database", params.database());
        cs.push_opt("Uid", params.user());
        cs.push_opt("Pwd", params.password());
        cs.push_renamed_or(params, "protocol", "Protocol", "onsoctcp");
        cs.push_renamed(params, "client_locale", "CLIENT_LOCALE");
    }
}

/// Escapes a connection-string value per ODBC convention: brace the
/// value when it contains a separator or brace, doubling any closing
/// brace inside.
fn odbc_escape(value: &str) -> String {
    if value.contains(';') || value.contains('{') || value.contains('}') {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

struct ConnStringBuilder {
    parts: String,
    consumed: Vec<&'static str>,
}

impl ConnStringBuilder {
    fn new() -> Self {
        Self {
            parts: String::new(),
            consumed: vec!["driver"],
        }
    }

    fn push(&mut self, key: &str, value: &str) {
        self.push_raw(key, &odbc_escape(value));
    }

    /// For values that are already in driver syntax, like the braced
    /// driver name.
    fn push_raw(&mut self, key: &str, value: &str) {
        self.parts.push_str(key);
        self.parts.push('=');
        self.parts.push_str(value);
        self.parts.push(';');
    }

    fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Emits a recognized custom property under its driver keyword.
    fn push_renamed(&mut self, params: &SqlParams, property: &'static str, key: &str) {
        self.push_opt(key, params.property(property));
        self.consume(property);
    }

    fn push_renamed_or(
        &mut self,
        params: &SqlParams,
        property: &'static str,
        key: &str,
        default: &str,
    ) {
        match params.property(property) {
            Some(value) => self.push(key, value),
            None if !default.is_empty() => self.push(key, default),
            None => {}
        }
        self.consume(property);
    }

    fn consume(&mut self, property: &'static str) {
        self.consumed.push(property);
    }

    /// Appends every custom property no engine rule claimed, verbatim.
    fn push_passthrough(&mut self, params: &SqlParams) {
        let leftover = params
            .custom_properties()
            .iter()
            .filter(|(k, _)| !self.consumed.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>();
        for (key, value) in leftover {
            self.push(&key, &value);
        }
    }

    fn into_string(self) -> String {
        self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnectionParams;
    use std::collections::BTreeMap;

    fn sql_params(custom: Vec<(&str, &str)>) -> SqlParams {
        let custom: BTreeMap<String, String> = custom
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SqlParams::new(
            ConnectionParams::with_custom(
                Some("db.example.com".to_string()),
                None,
                Some("alice".to_string()),
                Some("secret".to_string()),
                custom,
            ),
            Some("warehouse".to_string()),
        )
    }

    #[test]
    fn by_name_works() {
        assert_eq!(SqlEngine::by_name("mssql").unwrap(), SqlEngine::SqlServer);
        assert_eq!(SqlEngine::by_name("sqlserver").unwrap(), SqlEngine::SqlServer);
        assert_eq!(SqlEngine::by_name("sqlServer").unwrap(), SqlEngine::SqlServer);
    }

    #[test]
    fn by_name_each_engine() {
        assert_eq!(SqlEngine::by_name("athena").unwrap(), SqlEngine::Athena);
        assert_eq!(SqlEngine::by_name("mysql").unwrap(), SqlEngine::MySql);
        assert_eq!(
            SqlEngine::by_name("postgresql").unwrap(),
            SqlEngine::PostgreSql
        );
        assert_eq!(SqlEngine::by_name("postgres").unwrap(), SqlEngine::PostgreSql);
        assert_eq!(SqlEngine::by_name("mariadb").unwrap(), SqlEngine::MySql);
        assert_eq!(SqlEngine::by_name("redshift").unwrap(), SqlEngine::Redshift);
        assert_eq!(SqlEngine::by_name("snowflake").unwrap(), SqlEngine::Snowflake);
        assert_eq!(SqlEngine::by_name("informix").unwrap(), SqlEngine::Informix);
    }

    #[test]
    fn by_name_ignores_spaces() {
        assert_eq!(SqlEngine::by_name("ms sql").unwrap(), SqlEngine::SqlServer);
        assert_eq!(
            SqlEngine::by_name("SQL Server").unwrap(),
            SqlEngine::SqlServer
        );
        assert_eq!(
            SqlEngine::by_name("ibm informix").unwrap(),
            SqlEngine::Informix
        );
        assert_eq!(SqlEngine::by_name("aws athena").unwrap(), SqlEngine::Athena);
    }

    #[test]
    fn unknown_engine_is_an_error() {
        let err = SqlEngine::by_name("made_up_db").unwrap_err();
        assert!(err.to_string().contains("made_up_db"));
    }

    #[test]
    fn sqlserver_connection_string() {
        let params = sql_params(vec![("encrypt", "yes")]);
        let cs = SqlEngine::SqlServer.connection_string(&params);
        assert!(cs.starts_with("Driver={ODBC Driver 18 for SQL Server};"));
        assert!(cs.contains("Server=db.example.com,1433;"));
        assert!(cs.contains("Database=warehouse;"));
        assert!(cs.contains("UID=alice;"));
        assert!(cs.contains("PWD=secret;"));
        assert!(cs.contains("Encrypt=yes;"));
        assert!(!cs.contains("encrypt=yes;"));
    }

    #[test]
    fn postgres_connection_string_with_ssl() {
        let params = sql_params(vec![("ssl_mode", "require")]);
        let cs = SqlEngine::PostgreSql.connection_string(&params);
        assert!(cs.contains("Server=db.example.com;"));
        assert!(cs.contains("Port=5432;"));
        assert!(cs.contains("SSLmode=require;"));
    }

    #[test]
    fn unrecognized_properties_pass_through() {
        let params = sql_params(vec![("application_name", "sqlpour")]);
        let cs = SqlEngine::MySql.connection_string(&params);
        assert!(cs.contains("application_name=sqlpour;"));
    }

    #[test]
    fn driver_override() {
        let params = sql_params(vec![("driver", "PostgreSQL ANSI")]);
        let cs = SqlEngine::PostgreSql.connection_string(&params);
        assert!(cs.starts_with("Driver={PostgreSQL ANSI};"));
        // the override must not leak as a passthrough property
        assert!(!cs.contains("driver=PostgreSQL"));
    }

    #[test]
    fn values_with_separators_are_braced() {
        let custom = BTreeMap::new();
        let params = SqlParams::new(
            ConnectionParams::with_custom(
                Some("localhost".to_string()),
                Some(5432),
                Some("alice".to_string()),
                Some("p;ss{wo}rd".to_string()),
                custom,
            ),
            Some("db".to_string()),
        );
        let cs = SqlEngine::PostgreSql.connection_string(&params);
        assert!(cs.contains("Pwd={p;ss{wo}}rd};"));
    }

    #[test]
    fn informix_defaults_protocol() {
        let params = sql_params(vec![("server", "ifxserver")]);
        let cs = SqlEngine::Informix.connection_string(&params);
        assert!(cs.contains("Service=9088;"));
        assert!(cs.contains("Server=ifxserver;"));
        assert!(cs.contains("Protocol=onsoctcp;"));
    }
}
