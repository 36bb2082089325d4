use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::database::{Entity, SqlValue};
use crate::error::{BotError, DomainError};

/// Five minutes.
pub const SESSION_TTL_MILLIS: i64 = 300_000;
pub const SESSION_ID_LEN: usize = 8;

/// Stored session dates carry a fixed 07:00 so the day survives zone shifts.
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const SESSION_DATE_HOUR: u32 = 7;
pub const HOUR_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingSession {
    pub id: String,
    pub business_id: String,
    pub chat_id: i64,
    pub service_id: String,
    pub date: String,
    pub hour: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl: i64,
}

/// Field changes for one step. `None` keeps the stored value, `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub service_id: Option<String>,
    pub date: Option<String>,
    pub hour: Option<String>,
}

impl SessionPatch {
    /// A new service invalidates any date and hour already picked.
    pub fn service(service_id: &str) -> Self {
        Self {
            service_id: Some(service_id.to_string()),
            date: Some(String::new()),
            hour: Some(String::new()),
        }
    }

    pub fn date(day: NaiveDate) -> Self {
        Self {
            service_id: None,
            date: Some(format_session_date(day)),
            hour: Some(String::new()),
        }
    }

    pub fn hour(hour: NaiveTime) -> Self {
        Self {
            service_id: None,
            date: None,
            hour: Some(hour.format(HOUR_FORMAT).to_string()),
        }
    }
}

pub fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn format_session_date(day: NaiveDate) -> String {
    day.and_hms_opt(SESSION_DATE_HOUR, 0, 0)
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
        .format(SESSION_DATE_FORMAT)
        .to_string()
}

impl BookingSession {
    pub fn start(id: String, business_id: &str, chat_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            business_id: business_id.to_string(),
            chat_id,
            service_id: String::new(),
            date: String::new(),
            hour: String::new(),
            created_at: now,
            updated_at: now,
            ttl: SESSION_TTL_MILLIS,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.updated_at + Duration::milliseconds(self.ttl)
    }

    /// Usable while `now` has not gone past `updated_at + ttl`.
    pub fn ensure_valid_at(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if now <= self.expires_at() {
            Ok(())
        } else {
            Err(DomainError::SessionExpired(self.id.clone()))
        }
    }

    pub fn ensure_valid(&self) -> Result<(), DomainError> {
        self.ensure_valid_at(Utc::now())
    }

    /// Next state of the session. Identity fields and `created_at` never change.
    pub fn apply(&self, patch: SessionPatch, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            business_id: self.business_id.clone(),
            chat_id: self.chat_id,
            service_id: patch.service_id.unwrap_or_else(|| self.service_id.clone()),
            date: patch.date.unwrap_or_else(|| self.date.clone()),
            hour: patch.hour.unwrap_or_else(|| self.hour.clone()),
            created_at: self.created_at,
            updated_at: now,
            ttl: self.ttl,
        }
    }

    pub fn selected_date(&self) -> Result<NaiveDateTime, BotError> {
        NaiveDateTime::parse_from_str(&self.date, SESSION_DATE_FORMAT).map_err(|_| BotError::InvalidParameter {
            name: "date",
            value: self.date.clone(),
        })
    }

    pub fn selected_hour(&self) -> Result<NaiveTime, BotError> {
        NaiveTime::parse_from_str(&self.hour, HOUR_FORMAT).map_err(|_| BotError::InvalidParameter {
            name: "hour",
            value: self.hour.clone(),
        })
    }

    /// The appointment time: the chosen day at the chosen hour.
    pub fn appointment(&self) -> Result<NaiveDateTime, BotError> {
        let day = self.selected_date()?.date();
        Ok(day.and_time(self.selected_hour()?))
    }
}

impl Entity for BookingSession {
    const NAME: &'static str = "booking session";
    const TABLE: &'static str = "booking_session";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "business_id",
        "chat_id",
        "service_id",
        "date",
        "hour",
        "created_at",
        "updated_at",
        "ttl",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.business_id.clone().into(),
            self.chat_id.into(),
            self.service_id.clone().into(),
            self.date.clone().into(),
            self.hour.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.ttl.into(),
        ]
    }
}
