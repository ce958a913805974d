//! Environment-driven configuration, validated once at startup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use std::env;

use pipeline::StreamSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub stream: StreamSettings,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: String,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Directory the trading terminal reads from and writes to.
    pub dir: PathBuf,
    pub queue_file: String,
    pub ack_file: String,
    pub ack_poll_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let stream = StreamSettings {
            url: var_or("REDIS_URL", "redis://localhost:6379/0"),
            stream: var_or("SIGNAL_STREAM", "signals:parse"),
            group: var_or("SIGNAL_GROUP", "parser"),
            consumer: var_or("SIGNAL_CONSUMER", "local"),
            block_ms: 5000,
        };

        let store = StoreConfig {
            db_path: var_or("GATEWAY_DB", "gateway.db"),
        };

        let queue = QueueConfig {
            dir: PathBuf::from(var_or("TERMINAL_FILES_DIR", "terminal_files")),
            queue_file: var_or("QUEUE_FILENAME", "order_queue.csv"),
            ack_file: var_or("ACK_FILENAME", "fill_reports.csv"),
            ack_poll_secs: var_or("ACK_POLL_SECS", "3")
                .parse()
                .context("ACK_POLL_SECS must be an integer")?,
        };

        // notifications are optional: both variables or none
        let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(bot_token), Ok(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id: chat_id.parse().context("TELEGRAM_CHAT_ID must be a number")?,
            }),
            _ => None,
        };

        Ok(Self {
            stream,
            store,
            queue,
            telegram,
        })
    }
}
