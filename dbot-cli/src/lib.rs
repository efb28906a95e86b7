//! # dbot-cli
//!
//! The `dbot` binary's library half: configuration, CLI parsing, application wiring and the
//! demo user bot.

pub mod app;
pub mod cli;
pub mod config;
pub mod demo;

pub use app::BotApp;
pub use cli::{Cli, Commands};
pub use config::BotConfig;
pub use demo::{DemoUserBot, HELP_REACTION};
