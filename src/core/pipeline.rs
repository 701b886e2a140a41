//! Top-level pipeline driver: validate, package, then deploy when enabled.
//!
//! One run per invocation. Fatal errors abort the current stage, notify that
//! stage's observer, and propagate to the caller; they are never swallowed.

use std::path::PathBuf;

use serde::Serialize;

use crate::archive::{self, ArchiveSummary};
use crate::config::PipelineConfig;
use crate::deploy::{self, CommandResult};
use crate::error::Result;
use crate::events::{EventSink, PipelineEvent, PipelineObservers};
use crate::ssh::{self, SessionFactory};
use crate::validate;

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Validating,
    Packaging,
    Deploying,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Packaging => "packaging",
            Stage::Deploying => "deploying",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub stage: Stage,
    pub archive: Option<ArchiveSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandResult>,
}

/// Drive one full pipeline run.
///
/// Validation failures short-circuit before any archive or network I/O and
/// are reported through both stage observers, since neither stage will get
/// a chance to run.
pub fn run(
    config: &PipelineConfig,
    sessions: &dyn SessionFactory,
    observers: &PipelineObservers<'_>,
    events: &dyn EventSink,
) -> Result<PipelineReport> {
    events.emit(PipelineEvent::StageStarted {
        stage: Stage::Validating.as_str(),
    });

    let issues = validate::validate(&config.package, &config.deploy);
    if !issues.is_empty() {
        let error = validate::aggregate(&issues);
        observers.package_error(&error);
        observers.deploy_error(&error);
        return Err(error);
    }

    // Resolve connection parameters once, while still pre-I/O; the deploy
    // stage consumes the already-classified credential.
    let ssh_params = if config.deploy.enabled {
        match config.deploy.ssh_params() {
            Ok(params) => Some(params),
            Err(error) => {
                observers.package_error(&error);
                observers.deploy_error(&error);
                return Err(error);
            }
        }
    } else {
        None
    };

    events.emit(PipelineEvent::StageFinished {
        stage: Stage::Validating.as_str(),
    });

    if !config.package.enabled {
        // Nothing to do: packaging off and (validation guaranteed) deploy off.
        return Ok(PipelineReport {
            stage: Stage::Done,
            archive: None,
            commands: Vec::new(),
        });
    }

    events.emit(PipelineEvent::StageStarted {
        stage: Stage::Packaging.as_str(),
    });

    let source_dir = PathBuf::from(shellexpand::tilde(&config.package.source_dir).to_string());
    let summary = match archive::build(&source_dir, &config.package.archive_name, events) {
        Ok(summary) => summary,
        Err(error) => {
            observers.package_error(&error);
            return Err(error);
        }
    };
    observers.package_success();

    events.emit(PipelineEvent::StageFinished {
        stage: Stage::Packaging.as_str(),
    });

    let Some(params) = ssh_params else {
        return Ok(PipelineReport {
            stage: Stage::Done,
            archive: Some(summary),
            commands: Vec::new(),
        });
    };

    events.emit(PipelineEvent::StageStarted {
        stage: Stage::Deploying.as_str(),
    });

    let deployed = ssh::with_session(sessions, &params, |session| {
        deploy::deploy(
            session,
            &summary.path,
            &config.deploy.remote_archive_path,
            &config.deploy.remote_extract_dir,
            &config.deploy.commands,
            config.deploy.command_policy,
            events,
        )
    });

    match deployed {
        Ok(commands) => {
            observers.deploy_success();
            events.emit(PipelineEvent::StageFinished {
                stage: Stage::Deploying.as_str(),
            });
            Ok(PipelineReport {
                stage: Stage::Done,
                archive: Some(summary),
                commands,
            })
        }
        Err(error) => {
            observers.deploy_error(&error);
            Err(error)
        }
    }
}
