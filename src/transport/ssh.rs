//! Transport variant for remote hosts, over SSH.
//!
//! Each `run`/`fetch` establishes its own session, mirroring how drivers
//! issue a handful of independent operations per object. The connect phase
//! has a short dedicated timeout so a dead host fails a pass quickly; the
//! session timeout covering command execution is the (much longer)
//! per-object command timeout.

use std::fs;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, warn};
use ssh2::{Channel, Session, Sftp};

use crate::constants::{CONNECT_TIMEOUT_SECS, SSH_DEFAULT_PORT};
use crate::error::{DumpError, Result};
use crate::models::CommandOut;
use crate::transport::Transport;

/// SSH transport bound to one host.
pub struct SshTransport {
    host: String,
    username: String,
    ssh_key: Option<PathBuf>,
    /// Command completion ceiling, in seconds.
    timeout: u64,
}

impl SshTransport {
    pub fn new(host: &str, username: &str, ssh_key: Option<PathBuf>, timeout: u64) -> Self {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            ssh_key,
            timeout,
        }
    }

    fn unreachable(&self, reason: &str) -> DumpError {
        warn!("Cannot reach {}: {}", self.host, reason);
        DumpError::UnreachableHost {
            host: self.host.clone(),
        }
    }

    /// Dial out and authenticate. Every failure in this phase means the host
    /// is unreachable for retry purposes.
    fn connect(&self) -> Result<Session> {
        let mut addrs = (self.host.as_str(), SSH_DEFAULT_PORT)
            .to_socket_addrs()
            .map_err(|err| self.unreachable(&format!("address lookup failed: {}", err)))?;
        let addr = addrs
            .next()
            .ok_or_else(|| self.unreachable("address lookup returned no addresses"))?;

        let tcp = TcpStream::connect_timeout(&addr, Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .map_err(|err| self.unreachable(&format!("connect failed: {}", err)))?;

        let mut session = Session::new()
            .map_err(|err| self.unreachable(&format!("session setup failed: {}", err)))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| self.unreachable(&format!("handshake failed: {}", err)))?;

        match &self.ssh_key {
            Some(key) => session.userauth_pubkey_file(&self.username, None, key, None),
            None => session.userauth_agent(&self.username),
        }
        .map_err(|err| self.unreachable(&format!("authentication failed: {}", err)))?;

        let timeout_ms = self.timeout.saturating_mul(1000).min(u32::MAX as u64) as u32;
        session.set_timeout(timeout_ms);
        Ok(session)
    }

    fn fetch_remote(&self, sftp: &Sftp, remote: &Path, dest: &Path) -> io::Result<()> {
        let stat = sftp.stat(remote).map_err(to_io_error)?;
        if stat.is_dir() {
            fs::create_dir_all(dest)?;
            for (entry_path, _) in sftp.readdir(remote).map_err(to_io_error)? {
                let name = match entry_path.file_name() {
                    Some(name) => name.to_owned(),
                    None => continue,
                };
                self.fetch_remote(sftp, &entry_path, &dest.join(name))?;
            }
        } else {
            let mut remote_file = sftp.open(remote).map_err(to_io_error)?;
            let mut local_file = fs::File::create(dest)?;
            io::copy(&mut remote_file, &mut local_file)?;
        }
        Ok(())
    }
}

impl Transport for SshTransport {
    fn run(&self, command: &str) -> Result<CommandOut> {
        let session = self.connect()?;
        debug!(
            "Running remote command: host: {} command: {}",
            self.host, command
        );
        let mut channel = session
            .channel_session()
            .map_err(|err| self.unreachable(&format!("channel open failed: {}", err)))?;
        channel
            .exec(command)
            .map_err(|err| self.unreachable(&format!("exec failed: {}", err)))?;

        let mut out = CommandOut::default();
        if let Err(err) = drain_channel(&mut channel, &mut out) {
            // The command was dispatched but never completed cleanly (most
            // likely the command timeout). Captured as data, not control flow.
            error!(
                "Remote command on {} did not complete cleanly: {}",
                self.host, err
            );
            if !out.stderr.is_empty() {
                out.stderr.push('\n');
            }
            out.stderr.push_str(&format!("transport error: {}", err));
        }
        Ok(out)
    }

    fn fetch(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        let session = self.connect()?;
        debug!(
            "Getting remote path: host: {} path: {} -> {}",
            self.host,
            path.display(),
            dest_dir.display()
        );
        let sftp = session
            .sftp()
            .map_err(|err| self.unreachable(&format!("sftp subsystem failed: {}", err)))?;
        fs::create_dir_all(dest_dir)?;
        let dest = match path.file_name() {
            Some(name) => dest_dir.join(name),
            None => dest_dir.to_path_buf(),
        };
        self.fetch_remote(&sftp, path, &dest)?;
        Ok(())
    }
}

fn drain_channel(channel: &mut Channel, out: &mut CommandOut) -> io::Result<()> {
    channel.read_to_string(&mut out.stdout)?;
    channel.stderr().read_to_string(&mut out.stderr)?;
    channel.wait_close().map_err(to_io_error)?;
    out.return_code = Some(channel.exit_status().map_err(to_io_error)?);
    Ok(())
}

fn to_io_error(err: ssh2::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
