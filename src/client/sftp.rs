use crate::client::{ConnectionParams, SftpParams};
use crate::DynError;
use log::{debug, info};
use ssh2::{CheckResult, KnownHostFileKind, Session};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SFTP_PORT: u16 = 22;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const TRANSFER_CHUNK: usize = 32 * 1024;

#[derive(Debug)]
pub struct TransferError {
    message: String,
    source: Option<DynError>,
}

impl TransferError {
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

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "SFTP transfer error: {}: {}", self.message, source),
            None => write!(f, "SFTP transfer error: {}", self.message),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

/// Lifecycle of one transfer. Failed absorbs from any non-terminal
/// state; teardown still runs channel-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    SessionOpening,
    Connected,
    Transferring,
    Closed,
    Failed,
}

/// Byte-level progress callbacks for one transfer.
pub trait TransferProgress {
    fn init(&mut self, src: &str, dest: &str, total: Option<u64>);
    fn count(&mut self, bytes: u64);
    fn end(&mut self);
}

/// Logs a line per whole percent completed, or per chunk when the
/// remote size is unknown.
pub struct LogPercentDone {
    total: Option<u64>,
    completed: u64,
    percent: u64,
}

impl LogPercentDone {
    pub fn new() -> Self {
        Self {
            total: None,
            completed: 0,
            percent: 0,
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn percent(&self) -> u64 {
        self.percent
    }
}

impl Default for LogPercentDone {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferProgress for LogPercentDone {
    fn init(&mut self, src: &str, dest: &str, total: Option<u64>) {
        self.total = total;
        self.completed = 0;
        self.percent = 0;
        match total {
            Some(total) => info!("Starting download of {} to {} -- 0 of {} bytes", src, dest, total),
            None => info!("Starting download of {} to {} -- unknown size", src, dest),
        }
    }

    fn count(&mut self, bytes: u64) {
        self.completed += bytes;
        if let Some(total) = self.total {
            if total > 0 {
                let new_percent = self.completed * 100 / total;
                if new_percent > self.percent {
                    self.percent = new_percent;
                    info!("Loading... {}%", self.percent);
                }
                return;
            }
        }
        debug!("Loaded {} bytes so far", self.completed);
    }

    fn end(&mut self) {
        info!("Finished download ({} bytes)", self.completed);
    }
}

/// Downloads one remote file to one local path over SFTP.
///
/// State machine: Idle -> SessionOpening -> Connected -> Transferring
/// -> Closed, with Failed absorbing from any non-terminal state. The
/// channel is torn down before the session in every case.
pub struct SftpClient {
    params: ConnectionParams,
    sftp_params: SftpParams,
    state: TransferState,
}

impl SftpClient {
    pub fn new(params: ConnectionParams, sftp_params: SftpParams) -> Self {
        Self {
            params,
            sftp_params,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn download_file(
        &mut self,
        remote_path: &str,
        local_path: &str,
        progress: &mut dyn TransferProgress,
    ) -> Result<(), TransferError> {
        self.state = TransferState::SessionOpening;
        let session = match self.open_session() {
            Ok(session) => session,
            Err(e) => {
                self.state = TransferState::Failed;
                return Err(e);
            }
        };
        self.state = TransferState::Connected;
        let sftp = match session.sftp() {
            Ok(sftp) => sftp,
            Err(e) => {
                self.state = TransferState::Failed;
                let _ = session.disconnect(None, "teardown after channel failure", None);
                return Err(TransferError::with_source("could not open the SFTP channel", e));
            }
        };
        debug!("SFTP channel open to {}", self.params.host_or("localhost"));
        self.state = TransferState::Transferring;
        let result = transfer_one(&sftp, remote_path, local_path, progress);
        // channel before session, success or failure
        drop(sftp);
        let _ = session.disconnect(None, "transfer finished", None);
        match result {
            Ok(bytes) => {
                self.state = TransferState::Closed;
                info!(
                    "Downloaded the file from {} to {} ({} bytes)",
                    remote_path, local_path, bytes
                );
                Ok(())
            }
            Err(e) => {
                self.state = TransferState::Failed;
                Err(e)
            }
        }
    }

    fn open_session(&self) -> Result<Session, TransferError> {
        let host = self.params.host_or("localhost");
        let port = self.params.port_or(DEFAULT_SFTP_PORT);
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransferError::with_source(&format!("could not resolve {}:{}", host, port), e))?
            .next()
            .ok_or_else(|| TransferError::new(&format!("no address found for {}:{}", host, port)))?;
        let tcp = TcpStream::connect_timeout(&addr, Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .map_err(|e| TransferError::with_source(&format!("could not reach {}:{}", host, port), e))?;
        let mut session = Session::new()
            .map_err(|e| TransferError::with_source("could not create the SSH session", e))?;
        session.set_compress(self.sftp_params.compress());
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| TransferError::with_source("SSH handshake failed", e))?;
        if self.sftp_params.check_host_key() {
            self.verify_host_key(&session, host)?;
        }
        let user = self
            .params
            .user()
            .ok_or_else(|| TransferError::new("an SFTP user is required"))?;
        session
            .userauth_password(user, self.params.password().unwrap_or(""))
            .map_err(|e| TransferError::with_source("SSH authentication failed", e))?;
        if !session.authenticated() {
            return Err(TransferError::new("SSH authentication failed"));
        }
        Ok(session)
    }

    fn verify_host_key(&self, session: &Session, host: &str) -> Result<(), TransferError> {
        let mut known_hosts = session
            .known_hosts()
            .map_err(|e| TransferError::with_source("could not initialize known hosts", e))?;
        let path = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
            .ok_or_else(|| TransferError::new("cannot locate known_hosts: HOME is not set"))?;
        known_hosts
            .read_file(&path, KnownHostFileKind::OpenSSH)
            .map_err(|e| {
                TransferError::with_source(&format!("could not read {}", path.display()), e)
            })?;
        let (key, _key_type) = session
            .host_key()
            .ok_or_else(|| TransferError::new("server offered no host key"))?;
        match known_hosts.check(host, key) {
            CheckResult::Match => Ok(()),
            CheckResult::NotFound => Err(TransferError::new(&format!(
                "host key for {} not found in known_hosts",
                host
            ))),
            CheckResult::Mismatch => Err(TransferError::new(&format!(
                "host key for {} does not match known_hosts",
                host
            ))),
            CheckResult::Failure => Err(TransferError::new("host key check failed")),
        }
    }
}

fn transfer_one(
    sftp: &ssh2::Sftp,
    remote_path: &str,
    local_path: &str,
    progress: &mut dyn TransferProgress,
) -> Result<u64, TransferError> {
    let remote = Path::new(remote_path);
    let total = sftp.stat(remote).ok().and_then(|stat| stat.size);
    let mut remote_file = sftp.open(remote).map_err(|e| {
        TransferError::with_source(&format!("could not open remote file {}", remote_path), e)
    })?;
    let mut local_file = fs::File::create(local_path).map_err(|e| {
        TransferError::with_source(&format!("could not create local file {}", local_path), e)
    })?;
    progress.init(remote_path, local_path, total);
    let mut buf = [0u8; TRANSFER_CHUNK];
    let mut transferred = 0u64;
    loop {
        let n = remote_file
            .read(&mut buf)
            .map_err(|e| TransferError::with_source("reading the remote file failed", e))?;
        if n == 0 {
            break;
        }
        local_file
            .write_all(&buf[..n])
            .map_err(|e| TransferError::with_source("writing the local file failed", e))?;
        transferred += n as u64;
        progress.count(n as u64);
    }
    local_file
        .flush()
        .map_err(|e| TransferError::with_source("flushing the local file failed", e))?;
    progress.end();
    Ok(transferred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_starts_idle() {
        let client = SftpClient::new(
            ConnectionParams::new(Some("example.com".to_string()), None, None, None),
            SftpParams::default(),
        );
        assert_eq!(client.state(), TransferState::Idle);
    }

    #[test]
    fn percent_done_logs_whole_percent_steps() {
        let mut monitor = LogPercentDone::new();
        monitor.init("remote.csv", "local.csv", Some(200));
        monitor.count(50);
        assert_eq!(monitor.percent(), 25);
        monitor.count(1);
        // 51/200 rounds down, still 25%
        assert_eq!(monitor.percent(), 25);
        monitor.count(149);
        assert_eq!(monitor.percent(), 100);
        assert_eq!(monitor.completed(), 200);
        monitor.end();
    }

    #[test]
    fn percent_done_handles_unknown_size() {
        let mut monitor = LogPercentDone::new();
        monitor.init("remote.bin", "local.bin", None);
        monitor.count(1024);
        assert_eq!(monitor.percent(), 0);
        assert_eq!(monitor.completed(), 1024);
    }
}
