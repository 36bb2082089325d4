use chrono::{Days, NaiveDate, Utc};

use crate::bot_state::BotState;
use crate::error::{BotError, Trace};
use crate::handlers::utils::{
    acknowledge, advance_session, day_label, escape_markdown_v2, load_business, load_service, load_valid_session,
};
use crate::models::{chunk, Button, CallbackData, CallbackUpdate, OutboundMessage, SessionPatch};

const STEP: &str = "dates";

pub const DAYS_PER_PAGE: u64 = 15;
pub const LAST_PAGE: u32 = 23;
const DAYS_PER_ROW: usize = 5;

fn page(data: &CallbackData) -> Result<u32, BotError> {
    match data.get("page") {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .map(|page| page.min(LAST_PAGE))
            .map_err(|_| BotError::InvalidParameter {
                name: "page",
                value: raw.to_string(),
            }),
    }
}

/// Callback that opens the date picker for a service.
pub fn dates_callback(session_id: &str, service_id: &str) -> String {
    format!("/dates?session={}&service={}", session_id, service_id)
}

fn page_callback(session_id: &str, service_id: &str, page: u32) -> String {
    format!("{}&page={}", dates_callback(session_id, service_id), page)
}

/// Days shown on `page`, counting from `today`.
pub fn days_for_page(today: NaiveDate, page: u32) -> Vec<NaiveDate> {
    let first = today + Days::new(DAYS_PER_PAGE * u64::from(page));
    (0..DAYS_PER_PAGE).map(|offset| first + Days::new(offset)).collect()
}

/// `/dates?session=..&service=..[&page=n]`: stores the service and offers days.
pub async fn execute(state: &BotState, callback: &CallbackUpdate, data: &CallbackData) -> Result<(), BotError> {
    acknowledge(state, callback, STEP).await?;

    let session_id = data.require("session").trace("callback.require", STEP)?;
    let service_id = data.require("service").trace("callback.require", STEP)?;
    let page = page(data).trace_with("callback.page", STEP, &[session_id])?;
    let now = Utc::now();

    let session = load_valid_session(state, session_id, STEP, now).await?;
    let business = load_business(state, &session.business_id, STEP).await?;
    let service = load_service(state, &business.id, service_id, STEP).await?;
    let zone = business.location().trace_with("business.location", STEP, &[business.id.as_str()])?;

    let session = advance_session(state, &session, SessionPatch::service(&service.id), STEP, now).await?;

    let mut text = format!(
        "📅 A continuación puedes ver las fechas que {} tiene disponibles para:\n\n🔸 {}\n\n",
        escape_markdown_v2(&business.name),
        escape_markdown_v2(&service.label())
    );
    text.push_str("*Selecciona un día para ver las horas disponibles:*\n\n");

    let today = now.with_timezone(&zone).date_naive();
    let buttons = days_for_page(today, page)
        .into_iter()
        .map(|day| {
            Button::callback(
                day_label(day),
                format!("/hours?session={}&date={}", session.id, day.format("%Y-%m-%d")),
            )
        })
        .collect();

    let mut navigation = Vec::new();
    if page > 0 {
        navigation.push(Button::callback(
            "⬅️ Mostrar menos",
            page_callback(&session.id, &service.id, page - 1),
        ));
    }
    if page < LAST_PAGE {
        navigation.push(Button::callback(
            "Mostrar más ➡️",
            page_callback(&session.id, &service.id, page + 1),
        ));
    }

    let message = OutboundMessage::new(callback.chat_id, text)
        .with_keyboard(chunk(buttons, DAYS_PER_ROW))
        .with_keyboard(chunk(navigation, 1));

    state
        .messenger
        .send_message(&message)
        .await
        .trace_with("messenger.send_message", STEP, &[session.id.as_str()])
}
