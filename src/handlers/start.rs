use chrono::Utc;

use crate::bot_state::BotState;
use crate::database::Criteria;
use crate::error::{BotError, DomainError, Trace};
use crate::handlers::dates::dates_callback;
use crate::handlers::utils::{escape_markdown_v2, load_business};
use crate::models::session::new_session_id;
use crate::models::{chunk, BookingSession, Button, MessageUpdate, OutboundMessage};

const STEP: &str = "start";

/// `/start <business id>`: opens a fresh session and lists the services.
pub async fn execute(state: &BotState, msg: &MessageUpdate) -> Result<(), BotError> {
    let business_id = msg.payload();
    if business_id.is_empty() {
        return Err(DomainError::MissingStartPayload).trace("message.payload", STEP);
    }

    let business = load_business(state, business_id, STEP).await?;

    let services = state
        .services
        .find(&Criteria::new().equal("business_id", business.id.as_str()))
        .await
        .trace_with("services.find", STEP, &[business.id.as_str()])?;

    let session = BookingSession::start(new_session_id(), &business.id, msg.chat_id, Utc::now());
    state
        .sessions
        .save(&session)
        .await
        .trace_with("sessions.save", STEP, &[session.id.as_str()])?;

    log::info!(
        "✅ Session {} created for business {} (chat {})",
        session.id,
        business.id,
        msg.chat_id
    );

    let mut text = format!(
        "Hola {} 👋, soy HastypalBot, el ayudante de {}\\.\n\n",
        escape_markdown_v2(&msg.first_name),
        escape_markdown_v2(&business.name)
    );

    if services.is_empty() {
        text.push_str("*Ahora mismo no hay servicios disponibles\\.*\n");
    } else {
        text.push_str("*Te muestro a continuación los servicios que ofrecemos:*\n\n");
        for service in &services {
            text.push_str(&format!("🔸 {}\n\n", escape_markdown_v2(&service.label())));
        }
    }

    let buttons = services
        .iter()
        .map(|service| {
            Button::callback(
                format!("{} 📅", service.label()),
                dates_callback(&session.id, &service.id),
            )
        })
        .collect();

    let message = OutboundMessage::new(msg.chat_id, text).with_keyboard(chunk(buttons, 1));

    state
        .messenger
        .send_message(&message)
        .await
        .trace_with("messenger.send_message", STEP, &[session.id.as_str()])
}
