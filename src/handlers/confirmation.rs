use chrono::{NaiveTime, Utc};

use crate::bot_state::BotState;
use crate::error::{BotError, Trace};
use crate::handlers::hours::ensure_slot_open;
use crate::handlers::utils::{
    acknowledge, advance_session, day_summary, escape_markdown_v2, load_business, load_service, load_valid_session,
};
use crate::models::session::HOUR_FORMAT;
use crate::models::{chunk, Button, CallbackData, CallbackUpdate, OutboundMessage, SessionPatch};

const STEP: &str = "confirmation";

/// `/confirmation?session=..&hour=HH:MM`: stores the hour and asks for confirmation.
pub async fn execute(state: &BotState, callback: &CallbackUpdate, data: &CallbackData) -> Result<(), BotError> {
    acknowledge(state, callback, STEP).await?;

    let session_id = data.require("session").trace("callback.require", STEP)?;
    let raw_hour = data.require("hour").trace("callback.require", STEP)?;
    let hour = NaiveTime::parse_from_str(raw_hour, HOUR_FORMAT)
        .map_err(|_| BotError::InvalidParameter {
            name: "hour",
            value: raw_hour.to_string(),
        })
        .trace_with("NaiveTime::parse_from_str", STEP, &[raw_hour])?;
    let now = Utc::now();

    let session = load_valid_session(state, session_id, STEP, now).await?;
    let day = session
        .selected_date()
        .trace_with("session.selected_date", STEP, &[session_id, session.date.as_str()])?
        .date();

    let business = load_business(state, &session.business_id, STEP).await?;
    let service = load_service(state, &business.id, &session.service_id, STEP).await?;

    // the hours keyboard may be stale or crafted
    ensure_slot_open(state, &business, &session.id, day, hour, now, STEP).await?;

    let session = advance_session(state, &session, SessionPatch::hour(hour), STEP, now).await?;

    let mut text = String::from("🙂 Último paso, te lo prometo\\! Confirma que todo está correcto:\n\n");
    text.push_str(&format!("🏪 {}\n\n", escape_markdown_v2(&business.name)));
    text.push_str(&format!("🟢 {}\n\n", escape_markdown_v2(&service.label())));
    text.push_str(&format!("📅 {}\n\n", escape_markdown_v2(&day_summary(day))));
    text.push_str(&format!("⌚️ {}\n\n", escape_markdown_v2(&session.hour)));
    text.push_str("*Pulsa confirmar si todo es correcto o vuelve atrás para cambiar la hora*\n\n");

    let buttons = vec![
        Button::callback("✅ Confirmar", format!("/book?session={}", session.id)),
        Button::callback(
            "⬅️ Atrás",
            format!("/hours?session={}&date={}", session.id, day.format("%Y-%m-%d")),
        ),
    ];

    let message = OutboundMessage::new(callback.chat_id, text).with_keyboard(chunk(buttons, 1));

    state
        .messenger
        .send_message(&message)
        .await
        .trace_with("messenger.send_message", STEP, &[session.id.as_str()])
}
