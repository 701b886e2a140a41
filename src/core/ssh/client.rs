use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;

use ssh2::Session;

use crate::config::{Credential, SshParams};
use crate::error::{Error, Result};

use super::{CommandOutput, RemoteSession, SessionFactory};

/// Production session backed by libssh2. Connect and authentication
/// failures are the same fatal kind; this layer performs no retries.
pub struct Ssh2Session {
    session: Session,
}

impl Ssh2Session {
    pub fn connect(params: &SshParams) -> Result<Self> {
        let addr = format!("{}:{}", params.host, params.port);
        let tcp = TcpStream::connect(&addr)
            .map_err(|err| Error::Connection(format!("connect to {} failed: {}", addr, err)))?;

        let mut session =
            Session::new().map_err(|err| Error::Connection(err.to_string()))?;
        if let Some(timeout) = params.timeout {
            // Applies to the handshake and to every later blocking call.
            session.set_timeout(timeout.as_millis() as u32);
        }
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| Error::Connection(format!("handshake with {} failed: {}", addr, err)))?;

        // The credential was classified at configuration time; pick the
        // matching auth call here, nothing is re-inspected.
        let auth = match &params.credential {
            Credential::Password(password) => {
                session.userauth_password(&params.username, password)
            }
            Credential::KeyPath(path) => {
                session.userauth_pubkey_file(&params.username, None, path, None)
            }
            Credential::KeyMaterial(material) => {
                session.userauth_pubkey_memory(&params.username, None, material, None)
            }
        };
        auth.map_err(|err| {
            Error::Connection(format!(
                "authentication failed for {}@{}: {}",
                params.username, params.host, err
            ))
        })?;

        Ok(Self { session })
    }
}

impl RemoteSession for Ssh2Session {
    fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|err| Error::Connection(err.to_string()))?;
        channel
            .exec(command)
            .map_err(|err| Error::Connection(format!("exec failed: {}", err)))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|err| Error::Connection(err.to_string()))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|err| Error::Connection(err.to_string()))?;

        channel
            .wait_close()
            .map_err(|err| Error::Connection(err.to_string()))?;
        let exit_code = channel
            .exit_status()
            .map_err(|err| Error::Connection(err.to_string()))?;

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let mut local = File::open(local_path).map_err(|err| {
            Error::Transfer(format!("cannot open {}: {}", local_path.display(), err))
        })?;
        let size = local
            .metadata()
            .map_err(|err| Error::Transfer(err.to_string()))?
            .len();

        let mut remote = self
            .session
            .scp_send(Path::new(remote_path), 0o644, size, None)
            .map_err(|err| Error::Transfer(format!("upload to {} failed: {}", remote_path, err)))?;
        io::copy(&mut local, &mut remote)
            .map_err(|err| Error::Transfer(format!("upload to {} failed: {}", remote_path, err)))?;

        remote
            .send_eof()
            .and_then(|_| remote.wait_eof())
            .and_then(|_| remote.close())
            .and_then(|_| remote.wait_close())
            .map_err(|err| Error::Transfer(err.to_string()))?;

        Ok(size)
    }
}

impl Drop for Ssh2Session {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "done", None);
    }
}

/// Default factory used by the CLI.
pub struct Ssh2SessionFactory;

impl SessionFactory for Ssh2SessionFactory {
    fn connect(&self, params: &SshParams) -> Result<Box<dyn RemoteSession>> {
        Ok(Box::new(Ssh2Session::connect(params)?))
    }
}
