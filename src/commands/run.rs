use std::path::Path;

use clap::Args;

use dropship::events::{PipelineObservers, StatusLog};
use dropship::pipeline::{self, PipelineReport};
use dropship::ssh::Ssh2SessionFactory;
use dropship::PipelineConfig;

use super::{CmdResult, ConfigArgs, StageLog};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn run(args: RunArgs) -> CmdResult<PipelineReport> {
    let config = PipelineConfig::load(Path::new(&args.config.config))?;

    let package_log = StageLog::new("package");
    let deploy_log = StageLog::new("deploy");
    let observers = PipelineObservers {
        package: Some(&package_log),
        deploy: Some(&deploy_log),
    };

    let report = pipeline::run(&config, &Ssh2SessionFactory, &observers, &StatusLog)?;
    Ok((report, 0))
}
