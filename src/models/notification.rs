use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::database::{Entity, SqlValue};
use crate::models::{Booking, Business, ServiceCatalog};

pub const REMINDER_HOUR: u32 = 10;
pub const BOOKING_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Reminder sent the day before an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TelegramNotification {
    pub id: String,
    pub session_id: String,
    pub booking_id: String,
    pub business_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub chat_id: i64,
    pub business_name: String,
    pub service_name: String,
    pub booking_date: String,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 10:00 UTC on the day before `day`.
pub fn reminder_time(day: NaiveDate) -> DateTime<Utc> {
    let before = day.checked_sub_days(Days::new(1)).unwrap_or(day);
    let time = NaiveTime::from_hms_opt(REMINDER_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&before.and_time(time))
}

impl TelegramNotification {
    pub fn for_booking(
        booking: &Booking,
        chat_id: i64,
        business: &Business,
        service: &ServiceCatalog,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: booking.session_id.clone(),
            booking_id: booking.id.clone(),
            business_id: business.id.clone(),
            scheduled_at: reminder_time(booking.when.date()),
            chat_id,
            business_name: business.name.clone(),
            service_name: service.name.clone(),
            booking_date: booking.when.format(BOOKING_DATE_FORMAT).to_string(),
            sent: false,
            sent_at: None,
            created_at: now,
        }
    }

    pub fn mark_as_sent(&mut self, now: DateTime<Utc>) {
        self.sent = true;
        self.sent_at = Some(now);
    }
}

impl Entity for TelegramNotification {
    const NAME: &'static str = "telegram notification";
    const TABLE: &'static str = "telegram_notification";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "session_id",
        "booking_id",
        "business_id",
        "scheduled_at",
        "chat_id",
        "business_name",
        "service_name",
        "booking_date",
        "sent",
        "sent_at",
        "created_at",
    ];
    const UNIQUE: &'static [&'static str] = &["session_id"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.session_id.clone().into(),
            self.booking_id.clone().into(),
            self.business_id.clone().into(),
            self.scheduled_at.into(),
            self.chat_id.into(),
            self.business_name.clone().into(),
            self.service_name.clone().into(),
            self.booking_date.clone().into(),
            self.sent.into(),
            SqlValue::OptionalTimestampTz(self.sent_at),
            self.created_at.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_is_day_before_at_ten_utc() {
        let day = NaiveDate::from_ymd_opt(2024, 11, 20).unwrap();
        assert_eq!(
            reminder_time(day),
            Utc.with_ymd_and_hms(2024, 11, 19, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn reminder_crosses_month_boundary() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(
            reminder_time(day),
            Utc.with_ymd_and_hms(2024, 11, 30, 10, 0, 0).unwrap()
        );
    }
}
