use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::bot_state::BotState;
use crate::database::{Criteria, StoreError};
use crate::error::{BotError, DomainError, Trace};
use crate::models::{BookingSession, Business, CallbackUpdate, ServiceCatalog, SessionPatch};

/// MarkdownV2 escaping
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!'];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

fn weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// Button label, e.g. `mié 20 nov`.
pub fn day_label(day: NaiveDate) -> String {
    let week: String = weekday(day.weekday()).chars().take(3).collect();
    let month: String = MONTHS[day.month0() as usize].chars().take(3).collect();
    format!("{} {} {}", week, day.day(), month)
}

/// Summary line, e.g. `miércoles 20 de noviembre`.
pub fn day_summary(day: NaiveDate) -> String {
    format!(
        "{} {} de {}",
        weekday(day.weekday()),
        day.day(),
        MONTHS[day.month0() as usize]
    )
}

pub async fn acknowledge(state: &BotState, callback: &CallbackUpdate, step: &'static str) -> Result<(), BotError> {
    state
        .messenger
        .answer_callback(&callback.id)
        .await
        .trace_with("messenger.answer_callback", step, &[callback.id.as_str()])
}

fn not_found_as(err: StoreError, domain: DomainError) -> BotError {
    match err {
        StoreError::NotFound { .. } => domain.into(),
        other => other.into(),
    }
}

/// Loads the session and rejects it once its TTL has passed.
pub async fn load_valid_session(
    state: &BotState,
    session_id: &str,
    step: &'static str,
    now: DateTime<Utc>,
) -> Result<BookingSession, BotError> {
    let session = state
        .sessions
        .find_one(&Criteria::new().equal("id", session_id))
        .await
        .map_err(|err| not_found_as(err, DomainError::SessionNotFound(session_id.to_string())))
        .trace_with("sessions.find_one", step, &[session_id])?;

    session
        .ensure_valid_at(now)
        .trace_with("session.ensure_valid_at", step, &[session_id])?;

    Ok(session)
}

pub async fn advance_session(
    state: &BotState,
    session: &BookingSession,
    patch: SessionPatch,
    step: &'static str,
    now: DateTime<Utc>,
) -> Result<BookingSession, BotError> {
    let next = session.apply(patch, now);

    state
        .sessions
        .update(&next)
        .await
        .trace_with("sessions.update", step, &[next.id.as_str()])?;

    log::info!(
        "➡️ Session {} advanced at {} (service: {:?}, date: {:?}, hour: {:?})",
        next.id,
        step,
        next.service_id,
        next.date,
        next.hour
    );
    Ok(next)
}

pub async fn load_business(state: &BotState, business_id: &str, step: &'static str) -> Result<Business, BotError> {
    state
        .businesses
        .find_one(&Criteria::new().equal("id", business_id))
        .await
        .map_err(|err| not_found_as(err, DomainError::BusinessNotFound(business_id.to_string())))
        .trace_with("businesses.find_one", step, &[business_id])
}

pub async fn load_service(
    state: &BotState,
    business_id: &str,
    service_id: &str,
    step: &'static str,
) -> Result<ServiceCatalog, BotError> {
    state
        .services
        .find_one(&Criteria::new().equal("id", service_id).equal("business_id", business_id))
        .await
        .map_err(|err| not_found_as(err, DomainError::ServiceNotFound(service_id.to_string())))
        .trace_with("services.find_one", step, &[business_id, service_id])
}
