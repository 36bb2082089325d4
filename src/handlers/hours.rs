use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::bot_state::BotState;
use crate::database::Criteria;
use crate::error::{BotError, DomainError, Trace};
use crate::handlers::dates::dates_callback;
use crate::handlers::utils::{
    acknowledge, advance_session, day_label, escape_markdown_v2, load_business, load_service, load_valid_session,
};
use crate::models::session::HOUR_FORMAT;
use crate::models::{chunk, Business, Button, CallbackData, CallbackUpdate, OutboundMessage, SessionPatch};

const STEP: &str = "hours";

pub const FIRST_HOUR: u32 = 8;
pub const LAST_HOUR: u32 = 19;
const HOURS_PER_ROW: usize = 3;

/// Hourly slots still open on `day`. Taken slots and, for today, past ones are dropped.
pub fn open_slots(day: NaiveDate, taken: &HashSet<NaiveTime>, local_now: NaiveDateTime) -> Vec<NaiveTime> {
    (FIRST_HOUR..=LAST_HOUR)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .filter(|slot| !taken.contains(slot))
        .filter(|slot| day.and_time(*slot) > local_now)
        .collect()
}

/// Hours already booked at the business on `day` by sessions other than `session_id`.
pub async fn taken_slots(
    state: &BotState,
    business_id: &str,
    session_id: &str,
    day: NaiveDate,
    step: &'static str,
) -> Result<HashSet<NaiveTime>, BotError> {
    let start_of_day = day.and_time(NaiveTime::MIN);
    let end_of_day = day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
    let raw_day = day.to_string();

    Ok(state
        .bookings
        .find(
            &Criteria::new()
                .equal("business_id", business_id)
                .greater_than_or_equal("when", start_of_day)
                .less_than_or_equal("when", end_of_day),
        )
        .await
        .trace_with("bookings.find", step, &[business_id, raw_day.as_str()])?
        .into_iter()
        .filter(|booking| booking.session_id != session_id)
        .map(|booking| booking.when.time().with_second(0).unwrap_or(booking.when.time()))
        .collect())
}

/// Fails unless `hour` on `day` is still offered to `session_id`.
pub async fn ensure_slot_open(
    state: &BotState,
    business: &Business,
    session_id: &str,
    day: NaiveDate,
    hour: NaiveTime,
    now: DateTime<Utc>,
    step: &'static str,
) -> Result<(), BotError> {
    let zone = business.location().trace_with("business.location", step, &[business.id.as_str()])?;
    let taken = taken_slots(state, &business.id, session_id, day, step).await?;

    if open_slots(day, &taken, now.with_timezone(&zone).naive_local()).contains(&hour) {
        return Ok(());
    }

    let slot = format!("{} {}", day, hour.format(HOUR_FORMAT));
    Err(DomainError::SlotUnavailable(slot.clone())).trace_with("open_slots", step, &[session_id, slot.as_str()])
}

/// `/hours?session=..&date=YYYY-MM-DD`: stores the day and offers its open hours.
pub async fn execute(state: &BotState, callback: &CallbackUpdate, data: &CallbackData) -> Result<(), BotError> {
    acknowledge(state, callback, STEP).await?;

    let session_id = data.require("session").trace("callback.require", STEP)?;
    let raw_date = data.require("date").trace("callback.require", STEP)?;
    let day = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .map_err(|_| BotError::InvalidParameter {
            name: "date",
            value: raw_date.to_string(),
        })
        .trace_with("NaiveDate::parse_from_str", STEP, &[raw_date])?;
    let now = Utc::now();

    let session = load_valid_session(state, session_id, STEP, now).await?;
    let business = load_business(state, &session.business_id, STEP).await?;
    let service = load_service(state, &business.id, &session.service_id, STEP).await?;
    let zone = business.location().trace_with("business.location", STEP, &[business.id.as_str()])?;

    let taken = taken_slots(state, &business.id, &session.id, day, STEP).await?;

    let session = advance_session(state, &session, SessionPatch::date(day), STEP, now).await?;

    let slots = open_slots(day, &taken, now.with_timezone(&zone).naive_local());

    let mut text = String::from("⌚️ Las horas disponibles para:\n\n");
    text.push_str(&format!("🔸 {}\n\n", escape_markdown_v2(&service.label())));
    text.push_str(&format!("📅 {}\n\n", escape_markdown_v2(&day_label(day))));
    if slots.is_empty() {
        text.push_str("*No quedan horas libres este día, prueba con otra fecha\\.*\n\n");
    } else {
        text.push_str("*Selecciona una hora y te escribiré un resumen para que puedas confirmar la reserva*\n\n");
    }

    let buttons = slots
        .iter()
        .map(|slot| {
            let hour = slot.format(HOUR_FORMAT).to_string();
            Button::callback(
                hour.clone(),
                format!("/confirmation?session={}&hour={}", session.id, hour),
            )
        })
        .collect();

    let back = Button::callback("⬅️ Atrás", dates_callback(&session.id, &session.service_id));

    let message = OutboundMessage::new(callback.chat_id, text)
        .with_keyboard(chunk(buttons, HOURS_PER_ROW))
        .with_keyboard(vec![vec![back]]);

    state
        .messenger
        .send_message(&message)
        .await
        .trace_with("messenger.send_message", STEP, &[session.id.as_str()])
}
