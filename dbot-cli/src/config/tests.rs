//! Config tests.

use super::*;
use serial_test::serial;
use std::env;

const VARS: &[&str] = &[
    "BOT_TOKEN",
    "BOT_CHANNELS",
    "LOG_FILE",
    "TELEGRAM_API_URL",
    "TELOXIDE_API_URL",
    "POLL_INTERVAL_SECS",
    "ACTION_REGISTRY_CAPACITY",
    "ACTION_TOKEN_LENGTH",
    "OUTBOUND_DELAY_MS",
    "CONNECT_RETRY_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_load_config_with_defaults() {
    clear_env();
    env::set_var("BOT_TOKEN", "test_token");
    env::set_var("BOT_CHANNELS", "-1001");

    let config = BotConfig::load(None, vec![]).unwrap();

    assert_eq!(config.bot_token, "test_token");
    assert_eq!(config.channels, vec![-1001]);
    assert_eq!(config.log_file, "logs/dbot.log");
    assert!(config.telegram_api_url.is_none());
    assert_eq!(config.poll_interval_secs, 7);
    assert_eq!(config.registry_capacity, 10_000);
    assert_eq!(config.token_length, 26);
    assert_eq!(config.outbound_delay_ms, 0);
    assert_eq!(config.connect_retry().interval, Duration::from_secs(120));
    assert!(config.connect_retry().max_attempts.is_none());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_load_config_with_custom_values() {
    clear_env();
    env::set_var("BOT_TOKEN", "custom_token");
    env::set_var("BOT_CHANNELS", "-1001, -1002,-1001");
    env::set_var("LOG_FILE", "custom.log");
    env::set_var("TELOXIDE_API_URL", "http://localhost:8081");
    env::set_var("POLL_INTERVAL_SECS", "3");
    env::set_var("ACTION_REGISTRY_CAPACITY", "50");
    env::set_var("ACTION_TOKEN_LENGTH", "32");
    env::set_var("OUTBOUND_DELAY_MS", "250");
    env::set_var("CONNECT_RETRY_SECS", "30");

    let config = BotConfig::load(None, vec![]).unwrap();

    assert_eq!(config.channels, vec![-1001, -1002]);
    assert_eq!(config.log_file, "custom.log");
    assert_eq!(config.telegram_api_url.as_deref(), Some("http://localhost:8081"));
    assert_eq!(config.poll_monitor_config().interval, Duration::from_secs(3));
    assert_eq!(config.registry_config().capacity, 50);
    assert_eq!(config.registry_config().token_length, 32);
    assert_eq!(config.outbound_delay(), Duration::from_millis(250));
    assert_eq!(config.connect_retry().interval, Duration::from_secs(30));
    assert!(config.validate().is_ok());
    clear_env();
}

/// **Test: CLI token and channels override the environment.**
///
/// Setup: BOT_TOKEN and BOT_CHANNELS set.
/// Action: load with Some(token) and a channel list.
/// Expected: the CLI values win.
#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var("BOT_TOKEN", "env_token");
    env::set_var("BOT_CHANNELS", "-1");

    let config = BotConfig::load(Some("cli_token".to_string()), vec!["-42".to_string()]).unwrap();

    assert_eq!(config.bot_token, "cli_token");
    assert_eq!(config.channels, vec![-42]);
    clear_env();
}

#[test]
#[serial]
fn test_missing_token_fails() {
    clear_env();
    let result = BotConfig::load(None, vec!["-1".to_string()]);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("BOT_TOKEN"));
}

#[test]
#[serial]
fn test_channel_placeholder_rejected() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    env::set_var("BOT_CHANNELS", "YOUR_CHANNEL_ID");

    let err = BotConfig::load(None, vec![]).unwrap_err();
    assert!(err.to_string().contains("Please set your channel id"));
    clear_env();
}

#[test]
#[serial]
fn test_invalid_channel_rejected() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    assert!(BotConfig::load(None, vec!["general".to_string()]).is_err());
}

#[test]
#[serial]
fn test_validate_requires_channel() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    let config = BotConfig::load(None, vec![]).unwrap();
    assert!(config.channels.is_empty());
    assert!(config.validate().is_err());
    clear_env();
}

#[test]
#[serial]
fn test_validate_telegram_api_url_invalid() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    env::set_var("TELEGRAM_API_URL", "not-a-valid-url");
    let config = BotConfig::load(None, vec!["-1".to_string()]).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("TELEGRAM_API_URL"));
    clear_env();
}

#[test]
#[serial]
fn test_validate_token_length_bounds() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    env::set_var("ACTION_TOKEN_LENGTH", "64");
    let config = BotConfig::load(None, vec!["-1".to_string()]).unwrap();
    assert!(config.validate().is_err());

    env::set_var("ACTION_TOKEN_LENGTH", "16");
    let config = BotConfig::load(None, vec!["-1".to_string()]).unwrap();
    assert!(config.validate().is_ok());
    clear_env();
}

#[test]
fn test_parse_channels_skips_blanks() {
    assert_eq!(parse_channels(&["-1, ,-2,"]).unwrap(), vec![-1, -2]);
    assert!(parse_channels::<&str>(&[]).unwrap().is_empty());
}

#[test]
#[serial]
fn test_validate_rejects_zero_connect_retry() {
    clear_env();
    env::set_var("BOT_TOKEN", "t");
    env::set_var("CONNECT_RETRY_SECS", "0");
    let config = BotConfig::load(None, vec!["-1".to_string()]).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("CONNECT_RETRY_SECS"));
    clear_env();
}
