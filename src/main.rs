use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use moveitright::cli::{commands, Cli};
use moveitright::{config, init_telemetry, MoveItRightConfig};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => {
            let _ = MoveItRightConfig::load_env_file();
            MoveItRightConfig::load_from(Some(path))?
        }
        None => config()?.clone(),
    };
    init_telemetry(&config.observability)?;

    let succeeded = tokio::runtime::Runtime::new()?.block_on(async { commands::execute(cli, config).await })?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
