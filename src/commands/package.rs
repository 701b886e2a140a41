use std::path::Path;

use clap::Args;

use dropship::events::{PipelineObservers, StatusLog};
use dropship::pipeline::{self, PipelineReport};
use dropship::ssh::Ssh2SessionFactory;
use dropship::PipelineConfig;

use super::{CmdResult, ConfigArgs, StageLog};

#[derive(Args)]
pub struct PackageArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Build the archive only; the deploy section is ignored for this run.
pub fn run(args: PackageArgs) -> CmdResult<PipelineReport> {
    let mut config = PipelineConfig::load(Path::new(&args.config.config))?;
    config.deploy.enabled = false;

    let package_log = StageLog::new("package");
    let observers = PipelineObservers {
        package: Some(&package_log),
        deploy: None,
    };

    let report = pipeline::run(&config, &Ssh2SessionFactory, &observers, &StatusLog)?;
    Ok((report, 0))
}
