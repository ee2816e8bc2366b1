use crate::DynError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::BufReader;

#[derive(Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub engine: Option<String>,

    pub sql: Option<String>,
    pub file: Option<String>,
    pub format: Option<String>,
    pub key_case: Option<String>,

    pub fetch_size: Option<usize>,
    pub timeout: Option<u64>,
    pub max_rows: Option<usize>,
    pub log_frequency: Option<usize>,

    pub custom: Option<BTreeMap<String, String>>,

    pub sftp: Option<bool>,
    pub input_file: Option<String>,
    pub compress: Option<bool>,
    pub check_host: Option<bool>,
}

impl ExternalConfig {
    pub fn from_yaml_file(fname: &str) -> Result<ExternalConfig, DynError> {
        let rdr = BufReader::new(fs::File::open(fname)?);
        match serde_yaml::from_reader(rdr) {
            Ok(pc) => Ok(pc),
            Err(e) => Err(Box::new(e)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::conf::external::ExternalConfig;
    use std::path::PathBuf;

    #[test]
    fn test_example_config() {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("config_examples/postgres_extract.yml");

        let pc = ExternalConfig::from_yaml_file(d.to_str().unwrap()).unwrap();
        assert_eq!(pc.engine.as_deref(), Some("postgres"));
        assert_eq!(pc.format.as_deref(), Some("csv"));
        assert_eq!(pc.fetch_size, Some(20000));
    }

    #[test]
    fn test_empty_deser() {
        let yaml = ":";
        let pc: ExternalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pc, ExternalConfig::empty());
    }

    #[test]
    fn test_deser() {
        let yaml = "engine: postgres\nhost: db.example.com\nfetch_size: 500\ncustom:\n  sslmode: require\n";
        let pc: ExternalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pc.engine.as_deref(), Some("postgres"));
        assert_eq!(pc.host.as_deref(), Some("db.example.com"));
        assert_eq!(pc.fetch_size, Some(500));
        assert_eq!(
            pc.custom.unwrap().get("sslmode").map(|s| s.as_str()),
            Some("require")
        );
    }
}
