//! Deploy execution: transfer the archive, extract it remotely, then run
//! the configured command sequence in order.

use std::path::Path;

use serde::Serialize;

use crate::config::CommandPolicy;
use crate::error::{Error, Result};
use crate::events::{EventSink, PipelineEvent};
use crate::ssh::RemoteSession;
use crate::utils::shell;

/// Outcome of one remote command invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run one deploy attempt against an open session.
///
/// Steps run strictly in order: upload, extraction, then each user command.
/// Command N+1 does not start until command N's output has been observed.
/// There is no rollback of earlier commands when a later one fails.
pub fn deploy(
    session: &dyn RemoteSession,
    local_archive: &Path,
    remote_archive_path: &str,
    remote_extract_dir: &str,
    commands: &[String],
    policy: CommandPolicy,
    events: &dyn EventSink,
) -> Result<Vec<CommandResult>> {
    let bytes = session.upload(local_archive, remote_archive_path)?;
    events.emit(PipelineEvent::Uploaded {
        remote_path: remote_archive_path.to_string(),
        bytes,
    });

    if !remote_extract_dir.is_empty() {
        let extract_command = format!(
            "unzip -o {} -d {}",
            shell::quote_path(remote_archive_path),
            shell::quote_path(remote_extract_dir)
        );
        run_remote(session, &extract_command, policy, events)?;
    }

    let mut results = Vec::with_capacity(commands.len());
    for command in commands {
        results.push(run_remote(session, command, policy, events)?);
    }

    Ok(results)
}

fn run_remote(
    session: &dyn RemoteSession,
    command: &str,
    policy: CommandPolicy,
    events: &dyn EventSink,
) -> Result<CommandResult> {
    events.emit(PipelineEvent::CommandStarted {
        command: command.to_string(),
    });

    let output = session.execute(command)?;

    // stderr alone is a warning: plenty of tools log progress there.
    if !output.stderr.trim().is_empty() {
        events.emit(PipelineEvent::CommandWarning {
            command: command.to_string(),
            stderr: output.stderr.clone(),
        });
    }

    if policy == CommandPolicy::FailOnNonZeroExit && output.exit_code != 0 {
        return Err(Error::Command(format!(
            "'{}' exited with status {}",
            command, output.exit_code
        )));
    }

    events.emit(PipelineEvent::CommandFinished {
        command: command.to_string(),
        exit_code: output.exit_code,
    });

    Ok(CommandResult {
        command: command.to_string(),
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.exit_code,
    })
}
