use std::path::Path;

use clap::Args;
use serde::Serialize;

use dropship::validate;
use dropship::PipelineConfig;

use super::{CmdResult, ConfigArgs};

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub valid: bool,
    pub issues: Vec<CheckIssue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIssue {
    pub code: String,
    pub message: String,
}

/// Validate the configuration without running anything.
pub fn run(args: CheckArgs) -> CmdResult<CheckOutput> {
    let config = PipelineConfig::load(Path::new(&args.config.config))?;
    let issues = validate::validate(&config.package, &config.deploy);

    let exit_code = if issues.is_empty() { 0 } else { 1 };
    let output = CheckOutput {
        valid: issues.is_empty(),
        issues: issues
            .iter()
            .map(|issue| CheckIssue {
                code: issue.code().to_string(),
                message: issue.to_string(),
            })
            .collect(),
    };

    Ok((output, exit_code))
}
