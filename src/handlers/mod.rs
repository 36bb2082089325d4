use std::error::Error;
use std::fmt;
use std::str::FromStr;

use teloxide::types::Update;
use teloxide::utils::command::BotCommands;

use crate::bot_state::BotState;
use crate::error::BotError;
use crate::models::{CallbackData, InboundUpdate, OutboundMessage};
use crate::services::MessagingError;

pub mod confirmation;
pub mod dates;
pub mod finish;
pub mod hours;
pub mod start;
pub mod utils;

pub use utils::escape_markdown_v2;

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Commands shown in the Telegram menu.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Comandos disponibles:")]
pub enum MenuCommand {
    #[command(description = "empezar una reserva")]
    Start,
}

/// One conversation step per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    PickDate,
    PickHour,
    Confirmation,
    Finish,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Start,
        Command::PickDate,
        Command::PickHour,
        Command::Confirmation,
        Command::Finish,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::PickDate => "/dates",
            Command::PickHour => "/hours",
            Command::Confirmation => "/confirmation",
            Command::Finish => "/book",
        }
    }
}

impl FromStr for Command {
    type Err = BotError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        // `/start@SomeBot` in groups
        let token = token.split('@').next().unwrap_or(token);
        Command::ALL
            .into_iter()
            .find(|command| command.token() == token)
            .ok_or_else(|| BotError::UnknownCommand(token.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Routes one update to its step. Returns the step that ran, `None` for inert updates.
pub async fn handle_update(state: &BotState, update: InboundUpdate) -> Result<Option<Command>, BotError> {
    match update {
        InboundUpdate::Message(msg) => {
            let command: Command = msg.command().parse()?;
            match command {
                Command::Start => start::execute(state, &msg).await?,
                other => return Err(BotError::UnsupportedUpdate(other.token())),
            }
            Ok(Some(command))
        }
        InboundUpdate::Callback(callback) => {
            let data = CallbackData::parse(&callback.data)?;
            let command: Command = data.path.parse()?;
            match command {
                Command::Start => return Err(BotError::UnsupportedUpdate(command.token())),
                Command::PickDate => dates::execute(state, &callback, &data).await?,
                Command::PickHour => hours::execute(state, &callback, &data).await?,
                Command::Confirmation => confirmation::execute(state, &callback, &data).await?,
                Command::Finish => finish::execute(state, &callback, &data).await?,
            }
            Ok(Some(command))
        }
        InboundUpdate::MembershipChange => {
            log::debug!("👥 Membership change ignored");
            Ok(None)
        }
        InboundUpdate::Ignored => Ok(None),
    }
}

/// Handles an update and tells the user when it failed.
pub async fn dispatch(state: &BotState, update: InboundUpdate) -> Result<(), MessagingError> {
    let chat_id = update.chat_id();

    let err = match handle_update(state, update).await {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    if err.is_domain() {
        log::warn!("⚠️ Update rejected: {}", err);
    } else {
        log::error!("❌ Update failed: {}", err);
    }

    let Some(chat_id) = chat_id else {
        return Ok(());
    };

    let text = format!("⚠️ {}", escape_markdown_v2(&err.present()));
    state.messenger.send_message(&OutboundMessage::new(chat_id, text)).await
}

/// Teloxide endpoint.
pub async fn process_update(update: Update, state: BotState) -> HandlerResult {
    dispatch(&state, InboundUpdate::from(&update)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_token_maps_to_its_own_step() {
        let parsed: HashSet<Command> = ["/start", "/dates", "/hours", "/confirmation", "/book"]
            .iter()
            .map(|token| token.parse::<Command>().unwrap())
            .collect();
        assert_eq!(parsed.len(), 5);

        for command in Command::ALL {
            assert_eq!(command.token().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn bot_suffix_is_ignored() {
        assert_eq!("/start@HastypalBot".parse::<Command>().unwrap(), Command::Start);
    }

    #[test]
    fn unknown_token_is_an_error() {
        for token in ["/cancel", "hola", "", "/Dates"] {
            assert!(matches!(token.parse::<Command>(), Err(BotError::UnknownCommand(_))));
        }
    }
}
