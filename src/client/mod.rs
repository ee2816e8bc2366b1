// Copyright 2026 Marin Kolev

mod engine;
mod params;
mod sftp;
mod sql_client;

pub use crate::client::engine::*;
pub use crate::client::params::*;
pub use crate::client::sftp::*;
pub use crate::client::sql_client::*;
