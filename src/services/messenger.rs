use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::models::message::MAX_CALLBACK_DATA;
use crate::models::OutboundMessage;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), MessagingError>;

    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessagingError>;
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn keyboard(message: &OutboundMessage) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(message.keyboard.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.text.clone(), button.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), MessagingError> {
        if let Some(button) = message
            .buttons()
            .find(|button| button.callback_data.len() > MAX_CALLBACK_DATA)
        {
            return Err(MessagingError::Rejected(format!(
                "callback data {:?} exceeds {} bytes",
                button.callback_data, MAX_CALLBACK_DATA
            )));
        }

        let request = self
            .bot
            .send_message(ChatId(message.chat_id), message.text.clone())
            .parse_mode(ParseMode::MarkdownV2)
            .protect_content(true);

        if message.keyboard.is_empty() {
            request.await?;
        } else {
            request.reply_markup(keyboard(message)).await?;
        }

        log::debug!("📤 Message sent to chat {}", message.chat_id);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessagingError> {
        self.bot.answer_callback_query(callback_id.to_string()).await?;
        Ok(())
    }
}
