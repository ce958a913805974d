use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::TelegramConfig;

/// Re-publishes formatted actionable signals to a Telegram chat.
pub struct NotifierService {
    bot: Bot,
    chat_id: ChatId,
}

impl NotifierService {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            chat_id: ChatId(config.chat_id),
        }
    }

    pub async fn start(self, mut rx: broadcast::Receiver<String>) {
        info!("starting signal notifier");

        loop {
            match rx.recv().await {
                Ok(text) => {
                    // a failed send must not take the pipeline down
                    if let Err(e) = self.bot.send_message(self.chat_id, text).await {
                        error!("failed to publish signal: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("notifier lagged behind, missed {} signals", n);
                }
                Err(_) => {
                    info!("notifier channel closed, stopping");
                    break;
                }
            }
        }
    }
}
