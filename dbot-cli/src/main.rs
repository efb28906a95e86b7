//! dbot: runs the demo bot. Config from env (`.env` supported) and CLI flags.

use anyhow::Result;
use clap::Parser;
use dbot_cli::{BotApp, BotConfig, Cli, Commands};
use dbot_core::init_tracing;
use dbot_interact::panic_message;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            token,
            channels,
            name,
        } => {
            let config = BotConfig::load(token, channels)?;
            config.validate()?;
            init_tracing(Some(&config.log_file))?;
            info!(name = %name, channels = ?config.channels, "Starting bot");

            let app = BotApp::build(&config, &name);
            let broadcaster = app.broadcaster();

            // A failed or panicked bot is reported to the audience before the process exits.
            let failure = match tokio::spawn(app.run()).await {
                Ok(Ok(())) => {
                    info!("Bot stopped");
                    return Ok(());
                }
                Ok(Err(e)) => format!("Bot stopped on error:\n{}", e),
                Err(join_error) if join_error.is_panic() => {
                    format!("Bot crashed: {}", panic_message(&*join_error.into_panic()))
                }
                Err(join_error) => format!("Bot task was cancelled: {}", join_error),
            };

            error!(reason = %failure, "Fatal error, exiting");
            if let Err(e) =
                tokio::task::spawn_blocking(move || broadcaster.final_broadcast(&failure)).await
            {
                error!(error = %e, "Final broadcast task failed");
            }
            std::process::exit(1);
        }
    }
}
