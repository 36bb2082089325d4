use chrono::Utc;

use crate::bot_state::BotState;
use crate::database::{Criteria, StoreError};
use crate::error::{BotError, DomainError, Trace};
use crate::handlers::hours::ensure_slot_open;
use crate::handlers::utils::{acknowledge, load_business, load_service, load_valid_session};
use crate::models::{Booking, CallbackData, CallbackUpdate, OutboundMessage, TelegramNotification};
use crate::services::CalendarEvent;

const STEP: &str = "finish";

/// A unique `session_id` clash means a concurrent `/book` got there first.
fn duplicate_as_processed(err: StoreError, session_id: &str) -> BotError {
    match err {
        StoreError::Duplicate { .. } => DomainError::AlreadyProcessed(session_id.to_string()).into(),
        other => other.into(),
    }
}

/// `/book?session=..`: registers the booking, its reminder and the calendar event.
///
/// The writes span several stores without a transaction. The first failure
/// stops the sequence and nothing written before it is rolled back. A retry
/// after the notification was stored is rejected as already processed; a retry
/// after only the booking was stored reuses that booking, rewritten to the
/// session's current service and time if those changed in between.
pub async fn execute(state: &BotState, callback: &CallbackUpdate, data: &CallbackData) -> Result<(), BotError> {
    acknowledge(state, callback, STEP).await?;

    let session_id = data.require("session").trace("callback.require", STEP)?;
    let now = Utc::now();

    let session = load_valid_session(state, session_id, STEP, now).await?;

    let business = load_business(state, &session.business_id, STEP).await?;
    let service = load_service(state, &business.id, &session.service_id, STEP).await?;
    let zone = business.location().trace_with("business.location", STEP, &[business.id.as_str()])?;
    let when = session.appointment().trace_with(
        "session.appointment",
        STEP,
        &[session_id, session.date.as_str(), session.hour.as_str()],
    )?;

    let existing = state
        .notifications
        .find(&Criteria::new().equal("session_id", session_id))
        .await
        .trace_with("notifications.find", STEP, &[session_id])?;
    if !existing.is_empty() {
        return Err(DomainError::AlreadyProcessed(session_id.to_string())).trace_with(
            "ensure_not_duplicated_notification",
            STEP,
            &[session_id],
        );
    }

    ensure_slot_open(state, &business, &session.id, when.date(), when.time(), now, STEP).await?;

    let previous = state
        .bookings
        .find(&Criteria::new().equal("session_id", session_id))
        .await
        .trace_with("bookings.find", STEP, &[session_id])?
        .into_iter()
        .next();

    let booking = match previous {
        Some(previous) if previous.service_id == session.service_id && previous.when == when => {
            log::warn!("♻️ Reusing booking {} left by an unfinished /book on session {}", previous.id, session_id);
            previous
        }
        Some(previous) => {
            // the user changed the choice after the unfinished /book
            let mut booking = Booking::from_session(&session, when, now);
            booking.id = previous.id;
            state
                .bookings
                .update(&booking)
                .await
                .trace_with("bookings.update", STEP, &[session_id, booking.id.as_str()])?;
            log::warn!(
                "♻️ Booking {} on session {} moved from {} to {}",
                booking.id,
                session_id,
                previous.when,
                booking.when
            );
            booking
        }
        None => {
            let booking = Booking::from_session(&session, when, now);
            state
                .bookings
                .save(&booking)
                .await
                .map_err(|err| duplicate_as_processed(err, session_id))
                .trace_with("bookings.save", STEP, &[session_id, booking.id.as_str()])?;
            booking
        }
    };

    let notification = TelegramNotification::for_booking(&booking, callback.chat_id, &business, &service, now);
    state
        .notifications
        .save(&notification)
        .await
        .map_err(|err| duplicate_as_processed(err, session_id))
        .trace_with("notifications.save", STEP, &[session_id, notification.id.as_str()])?;

    let token = state
        .google_tokens
        .find_one(&Criteria::new().equal("business_id", business.id.as_str()))
        .await
        .map_err(|err| match err {
            StoreError::NotFound { .. } => BotError::from(DomainError::CalendarNotConnected(business.id.clone())),
            other => other.into(),
        })
        .trace_with("google_tokens.find_one", STEP, &[business.id.as_str()])?;

    let event = CalendarEvent::one_hour(
        service.label(),
        format!("Reserva de Telegram (sesión {})", session.id),
        business.address(),
        booking.when,
        zone,
    )
    .trace_with("CalendarEvent::one_hour", STEP, &[booking.id.as_str()])?;

    let client = state
        .calendar
        .resolve_client(&token)
        .await
        .trace_with("calendar.resolve_client", STEP, &[business.id.as_str()])?;
    client
        .insert_event(&event)
        .await
        .trace_with("calendar.insert_event", STEP, &[booking.id.as_str()])?;

    log::info!(
        "🎉 Booking {} registered for session {} (business {}, chat {}) at {}",
        booking.id,
        session.id,
        business.id,
        callback.chat_id,
        booking.when
    );

    let mut text = String::from("🎉 *¡Reserva confirmada\\!*\n\n");
    text.push_str("Te avisaremos un día antes para recordarte la cita 📅\n\n");

    state
        .messenger
        .send_message(&OutboundMessage::new(callback.chat_id, text))
        .await
        .trace_with("messenger.send_message", STEP, &[session.id.as_str()])
}
