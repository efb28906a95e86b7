//! Command-line interface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dbot")]
#[command(about = "Interactive Telegram bot with action buttons and monitored polls", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the demo bot (config from env; flags override BOT_TOKEN and BOT_CHANNELS).
    Run {
        #[arg(short, long)]
        token: Option<String>,
        /// Chat id to serve and broadcast to; repeatable.
        #[arg(short, long = "channel", allow_negative_numbers = true)]
        channels: Vec<String>,
        /// Name the bot introduces itself with.
        #[arg(short, long, default_value = "DemoBot")]
        name: String,
    },
}
