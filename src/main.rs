use std::sync::Arc;

use anyhow::Context;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::update_listeners::webhooks;
use teloxide::{prelude::*, utils::command::BotCommands};

use hastypal_bot::database::Database;
use hastypal_bot::handlers::{process_update, MenuCommand};
use hastypal_bot::reminders;
use hastypal_bot::services::{GoogleCalendar, TelegramMessenger};
use hastypal_bot::{BotState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first, then logging
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting Hastypal booking bot...");

    let config = Config::from_env().context("loading configuration")?;

    let db = Database::new(&config.database_url, config.database_max_connections)
        .await
        .context("connecting to the database")?;
    db.init().await.context("creating database schema")?;
    log::info!("✅ Database initialized");

    let bot = Bot::new(config.telegram_token.clone());
    bot.set_my_commands(MenuCommand::bot_commands())
        .await
        .context("registering bot commands")?;

    let state = BotState::postgres(
        db.pool.clone(),
        Arc::new(TelegramMessenger::new(bot.clone())),
        Arc::new(GoogleCalendar::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        )),
    );

    // Reminder sweep
    let reminder_state = state.clone();
    let period = config.reminder_interval;
    tokio::spawn(async move {
        reminders::reminder_task(reminder_state, period).await;
    });

    let handler = dptree::entry().endpoint(process_update);

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    match config.webhook_url.clone() {
        Some(url) => {
            let addr = config.listen_addr();
            log::info!("🚀 Receiving updates through webhook {} on {}", url, addr);

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url))
                .await
                .context("setting up the webhook")?;

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            log::info!("🚀 Receiving updates with long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
