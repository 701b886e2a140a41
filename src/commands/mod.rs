use clap::Args;

use dropship::events::StageObserver;
use dropship::log_status;
use dropship::Error;

pub mod check;
pub mod package;
pub mod run;

pub type CmdResult<T> = dropship::Result<(T, i32)>;

/// Shared configuration-file argument.
#[derive(Args)]
pub struct ConfigArgs {
    /// Path to the pipeline configuration file
    #[arg(long, default_value = "dropship.json")]
    pub config: String,
}

/// Stage observer used by the CLI: logs outcomes to the status channel.
pub(crate) struct StageLog {
    stage: &'static str,
}

impl StageLog {
    pub(crate) fn new(stage: &'static str) -> Self {
        Self { stage }
    }
}

impl StageObserver for StageLog {
    fn on_success(&self) {
        log_status!("pipeline", "{} stage succeeded", self.stage);
    }

    fn on_error(&self, error: &Error) {
        log_status!("pipeline", "{} stage failed: {}", self.stage, error);
    }
}
