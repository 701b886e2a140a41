use clap::{Parser, Subcommand};

mod commands;

use commands::{check, package, run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dropship")]
#[command(version = VERSION)]
#[command(about = "Package build output and deploy it over SSH")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate config, build the archive, and deploy when enabled
    Run(run::RunArgs),
    /// Build the archive without deploying
    Package(package::PackageArgs),
    /// Validate the configuration and report issues
    Check(check::CheckArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run(args) => print_result(run::run(args)),
        Commands::Package(args) => print_result(package::run(args)),
        Commands::Check(args) => print_result(check::run(args)),
    };

    std::process::ExitCode::from(exit_code)
}

fn print_result<T: serde::Serialize>(result: commands::CmdResult<T>) -> u8 {
    match result {
        Ok((value, exit_code)) => {
            if let Ok(json) = serde_json::to_string_pretty(&value) {
                println!("{}", json);
            }
            exit_code_to_u8(exit_code)
        }
        Err(err) => {
            let body = serde_json::json!({
                "error": {
                    "code": err.code(),
                    "message": err.to_string(),
                }
            });
            println!("{}", body);
            1
        }
    }
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
