use std::collections::HashMap;

use teloxide::types::{Update, UpdateKind};

use crate::error::BotError;

/// Text message sent to the bot, e.g. `/start B1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageUpdate {
    pub chat_id: i64,
    pub first_name: String,
    pub text: String,
}

impl MessageUpdate {
    /// First whitespace-separated token.
    pub fn command(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }

    /// Everything after the command, trimmed.
    pub fn payload(&self) -> &str {
        let text = self.text.trim_start();
        text.find(char::is_whitespace)
            .map(|at| text[at..].trim())
            .unwrap_or("")
    }
}

/// Inline button press.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackUpdate {
    pub id: String,
    pub chat_id: i64,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundUpdate {
    Message(MessageUpdate),
    Callback(CallbackUpdate),
    /// Bot added to or removed from a chat.
    MembershipChange,
    Ignored,
}

impl InboundUpdate {
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            InboundUpdate::Message(msg) => Some(msg.chat_id),
            InboundUpdate::Callback(callback) => Some(callback.chat_id),
            InboundUpdate::MembershipChange | InboundUpdate::Ignored => None,
        }
    }
}

impl From<&Update> for InboundUpdate {
    fn from(update: &Update) -> Self {
        match &update.kind {
            UpdateKind::Message(msg) => match msg.text() {
                Some(text) => InboundUpdate::Message(MessageUpdate {
                    chat_id: msg.chat.id.0,
                    first_name: msg.chat.first_name().unwrap_or_default().to_string(),
                    text: text.to_string(),
                }),
                None => InboundUpdate::Ignored,
            },
            UpdateKind::CallbackQuery(q) => match &q.data {
                Some(data) => InboundUpdate::Callback(CallbackUpdate {
                    id: q.id.clone(),
                    chat_id: q.from.id.0 as i64,
                    data: data.clone(),
                }),
                None => InboundUpdate::Ignored,
            },
            UpdateKind::MyChatMember(_) | UpdateKind::ChatMember(_) => InboundUpdate::MembershipChange,
            _ => InboundUpdate::Ignored,
        }
    }
}

/// Callback data of the form `/path?key=value&...`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackData {
    pub path: String,
    params: HashMap<String, String>,
}

impl CallbackData {
    pub fn parse(data: &str) -> Result<Self, BotError> {
        let (path, query) = match data.split_once('?') {
            Some((path, query)) => (path, query),
            None => (data, ""),
        };

        let valid_path = path.len() > 1
            && path.starts_with('/')
            && path[1..].chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/');
        if !valid_path {
            return Err(BotError::MalformedCallback(data.to_string()));
        }

        let params = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        Ok(Self {
            path: path.to_string(),
            params,
        })
    }

    /// A parameter that must be present and non-empty.
    pub fn require(&self, name: &'static str) -> Result<&str, BotError> {
        match self.params.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(BotError::MissingParameter(name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}
