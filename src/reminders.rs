use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::time;

use crate::bot_state::BotState;
use crate::database::Criteria;
use crate::error::{BotError, Trace};
use crate::handlers::utils::{day_summary, escape_markdown_v2};
use crate::models::notification::BOOKING_DATE_FORMAT;
use crate::models::{OutboundMessage, TelegramNotification};

const STEP: &str = "reminders";

fn reminder_text(notification: &TelegramNotification) -> String {
    let when = match NaiveDateTime::parse_from_str(&notification.booking_date, BOOKING_DATE_FORMAT) {
        Ok(when) => format!("{} a las {}", day_summary(when.date()), when.format("%H:%M")),
        Err(_) => notification.booking_date.clone(),
    };

    let mut text = format!(
        "⏰ Te recordamos tu cita en {}:\n\n",
        escape_markdown_v2(&notification.business_name)
    );
    text.push_str(&format!("🔸 {}\n\n", escape_markdown_v2(&notification.service_name)));
    text.push_str(&format!("📅 {}\n\n", escape_markdown_v2(&when)));
    text.push_str("*¡Te esperamos\\!*");
    text
}

async fn deliver(state: &BotState, mut notification: TelegramNotification, now: DateTime<Utc>) -> Result<(), BotError> {
    state
        .messenger
        .send_message(&OutboundMessage::new(notification.chat_id, reminder_text(&notification)))
        .await
        .trace_with("messenger.send_message", STEP, &[notification.id.as_str()])?;

    notification.mark_as_sent(now);

    state
        .notifications
        .update(&notification)
        .await
        .trace_with("notifications.update", STEP, &[notification.id.as_str()])
}

/// Sends every pending reminder due at `now`. Returns how many went out.
pub async fn send_due_reminders(state: &BotState, now: DateTime<Utc>) -> Result<usize, BotError> {
    let due = state
        .notifications
        .find(
            &Criteria::new()
                .less_than_or_equal("scheduled_at", now)
                .equal("sent", false),
        )
        .await
        .trace("notifications.find", STEP)?;

    let mut sent = 0;
    for notification in due {
        let id = notification.id.clone();
        match deliver(state, notification, now).await {
            Ok(()) => {
                sent += 1;
                log::info!("🔔 Reminder {} delivered", id);
            }
            Err(e) => log::error!("Error delivering reminder {}: {}", id, e),
        }
    }

    Ok(sent)
}

pub async fn reminder_task(state: BotState, period: Duration) {
    let mut interval = time::interval(period);

    loop {
        interval.tick().await;

        if let Err(e) = send_due_reminders(&state, Utc::now()).await {
            log::error!("Error loading due reminders: {}", e);
        }
    }
}
