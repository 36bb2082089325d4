pub mod bot_state;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod reminders;
pub mod services;

pub use bot_state::BotState;
pub use config::Config;
pub use error::{BotError, DomainError};
