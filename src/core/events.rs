//! Stage observers and the structured event channel.
//!
//! Callbacks are not stored in the serialized configuration; callers hand
//! observer implementations to the pipeline per invocation. Events are the
//! pipeline's observability channel so tests can assert on what happened
//! instead of scraping console output.

use crate::error::Error;

/// Success/failure notifications for one stage. Both methods are
/// fire-and-forget; the pipeline does not catch observer failures.
pub trait StageObserver {
    fn on_success(&self);
    fn on_error(&self, error: &Error);
}

/// The per-stage observers for one pipeline run.
#[derive(Default)]
pub struct PipelineObservers<'a> {
    pub package: Option<&'a dyn StageObserver>,
    pub deploy: Option<&'a dyn StageObserver>,
}

impl PipelineObservers<'_> {
    pub(crate) fn package_success(&self) {
        if let Some(observer) = self.package {
            observer.on_success();
        }
    }

    pub(crate) fn package_error(&self, error: &Error) {
        if let Some(observer) = self.package {
            observer.on_error(error);
        }
    }

    pub(crate) fn deploy_success(&self) {
        if let Some(observer) = self.deploy {
            observer.on_success();
        }
    }

    pub(crate) fn deploy_error(&self, error: &Error) {
        if let Some(observer) = self.deploy {
            observer.on_error(error);
        }
    }
}

/// Structured progress events emitted while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted {
        stage: &'static str,
    },
    ArchiveWritten {
        path: String,
        bytes: u64,
        entries: usize,
    },
    Uploaded {
        remote_path: String,
        bytes: u64,
    },
    CommandStarted {
        command: String,
    },
    /// A command wrote to its diagnostic stream. Logged, never fatal.
    CommandWarning {
        command: String,
        stderr: String,
    },
    CommandFinished {
        command: String,
        exit_code: i32,
    },
    StageFinished {
        stage: &'static str,
    },
}

pub trait EventSink {
    fn emit(&self, event: PipelineEvent);
}

/// Default sink: renders events through the status log on stderr.
pub struct StatusLog;

impl EventSink for StatusLog {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                log_status!("pipeline", "{} started", stage);
            }
            PipelineEvent::ArchiveWritten { path, bytes, entries } => {
                log_status!(
                    "package",
                    "Wrote {} ({}, {} entries)",
                    path,
                    format_bytes(bytes),
                    entries
                );
            }
            PipelineEvent::Uploaded { remote_path, bytes } => {
                log_status!("deploy", "Uploaded {} ({})", remote_path, format_bytes(bytes));
            }
            PipelineEvent::CommandStarted { command } => {
                log_status!("deploy", "Running: {}", command);
            }
            PipelineEvent::CommandWarning { command, stderr } => {
                log_status!("deploy", "Warning from '{}': {}", command, stderr.trim_end());
            }
            PipelineEvent::CommandFinished { command, exit_code } => {
                log_status!("deploy", "Finished (exit {}): {}", exit_code, command);
            }
            PipelineEvent::StageFinished { stage } => {
                log_status!("pipeline", "{} finished", stage);
            }
        }
    }
}

/// Format bytes into human-readable form.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
