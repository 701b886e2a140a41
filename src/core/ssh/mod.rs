//! Secure session lifecycle: one authenticated connection per deploy
//! attempt, with guaranteed release on every exit path.

use std::path::Path;

use crate::config::SshParams;
use crate::error::Result;

mod client;

pub use client::{Ssh2Session, Ssh2SessionFactory};

/// Captured output of one remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// One live authenticated remote session.
pub trait RemoteSession {
    /// Run a shell command remotely and capture both output streams.
    fn execute(&self, command: &str) -> Result<CommandOutput>;

    /// Upload a local file to an absolute remote path. Returns bytes sent.
    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<u64>;
}

/// Opens sessions. The pipeline depends on this seam so tests can substitute
/// a scripted session and prove that no network I/O happened.
pub trait SessionFactory {
    fn connect(&self, params: &SshParams) -> Result<Box<dyn RemoteSession>>;
}

/// Scoped session acquisition: connect, run `f`, and release the session on
/// every exit path, including when `f` fails.
pub fn with_session<T>(
    factory: &dyn SessionFactory,
    params: &SshParams,
    f: impl FnOnce(&dyn RemoteSession) -> Result<T>,
) -> Result<T> {
    let session = factory.connect(params)?;
    let result = f(session.as_ref());
    drop(session);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TrackedSession {
        drops: Arc<AtomicUsize>,
    }

    impl RemoteSession for TrackedSession {
        fn execute(&self, _command: &str) -> Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
            })
        }

        fn upload(&self, _local_path: &Path, _remote_path: &str) -> Result<u64> {
            Ok(0)
        }
    }

    impl Drop for TrackedSession {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TrackedFactory {
        drops: Arc<AtomicUsize>,
    }

    impl SessionFactory for TrackedFactory {
        fn connect(&self, _params: &SshParams) -> Result<Box<dyn RemoteSession>> {
            Ok(Box::new(TrackedSession {
                drops: Arc::clone(&self.drops),
            }))
        }
    }

    fn params() -> SshParams {
        SshParams {
            host: "example.com".to_string(),
            port: 22,
            username: "deploy".to_string(),
            credential: Credential::Password("secret".to_string()),
            timeout: None,
        }
    }

    #[test]
    fn session_released_after_success() {
        let drops = Arc::new(AtomicUsize::new(0));
        let factory = TrackedFactory {
            drops: Arc::clone(&drops),
        };

        let result = with_session(&factory, &params(), |session| {
            session.execute("echo hi")
        });

        assert!(result.is_ok());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn session_released_when_body_fails() {
        let drops = Arc::new(AtomicUsize::new(0));
        let factory = TrackedFactory {
            drops: Arc::clone(&drops),
        };

        let result: Result<()> = with_session(&factory, &params(), |_session| {
            Err(Error::Transfer("upload interrupted".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
