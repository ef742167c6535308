use std::process::ExitCode;

use clap::Parser;
use rediscan_cli::{Cli, Command, DeleteAction, PrintAction, exit_status_for, logging};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env_loaded = dotenvy::dotenv().map(|_| ()).or_else(|err| match err {
        dotenvy::Error::Io(_) => Ok(()),
        other => Err(other),
    });

    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.log, cli.log_format) {
        eprintln!("failed to initialise logging: {err:#}");
        return ExitCode::from(rediscan_cli::EXIT_CONFIG);
    }

    if let Err(err) = env_loaded {
        error!(error = %err, "failed to parse .env");
        return ExitCode::from(rediscan_cli::EXIT_CONFIG);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "run error");
            eprintln!("run error: {err:#}");
            ExitCode::from(exit_status_for(&err))
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = cli.resolve_options()?;

    match cli.cmd {
        Command::Print => {
            let action = PrintAction::default();
            let summary = rediscan_core::run(&options, &action).await?;
            info!(
                printed = action.printed(),
                keys = summary.keys_scanned,
                rounds = summary.rounds_completed,
                "done"
            );
        }
        Command::Delete => {
            let action = DeleteAction::default();
            let summary = rediscan_core::run(&options, &action).await?;
            info!(
                deleted = action.deleted(),
                failed = action.failed(),
                keys = summary.keys_scanned,
                rounds = summary.rounds_completed,
                "done"
            );
        }
    }

    Ok(())
}
