// Copyright 2026 Marin Kolev

use std::error::Error;
use std::io::Write;

use clap::Parser;
use log::{error, info};

use conf::*;

mod client;
mod conf;
mod extract;
mod output;
mod rows;

use crate::extract::{SftpExtractor, SqlExtractor};

pub type DynError = Box<dyn Error + Send + Sync>;
pub type DynBoxWrite = Box<dyn Write + Send + Sync>;

fn run_transfer(conf: &SqlPourConfig) -> Result<(), DynError> {
    let remote = conf.input_file()?.to_string();
    let mut extractor = SftpExtractor::new(conf.connection_params()?, conf.sftp_params());
    extractor.download(&remote, conf.output_file())
}

fn run_extraction(conf: &SqlPourConfig) -> Result<(), DynError> {
    let engine = conf.sql_engine()?;
    let output_format = conf.output_format()?;
    let sql = conf.read_sql()?;
    let extractor = SqlExtractor::new(engine, conf.sql_params()?, conf.formatting_params());
    let count = extractor.query_to_file(&sql, conf.output_file(), output_format, &conf.query_params())?;
    info!("Wrote {} rows to {}", count, conf.output_file());
    Ok(())
}

fn run(args: MyArgs) -> Result<(), DynError> {
    let conf = SqlPourConfig::new(args)?;
    if conf.dry_run() {
        conf.log_values();
        return Ok(());
    }
    if conf.is_sftp() {
        run_transfer(&conf)
    } else {
        run_extraction(&conf)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: MyArgs = MyArgs::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[test]
fn verify_app() {
    use clap::CommandFactory;
    MyArgs::command().debug_assert()
}
