use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::{Entity, SqlValue};
use crate::models::BookingSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: String,
    pub session_id: String,
    pub business_id: String,
    pub service_id: String,
    /// Local wall-clock time in the business zone.
    pub when: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn from_session(session: &BookingSession, when: NaiveDateTime, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            business_id: session.business_id.clone(),
            service_id: session.service_id.clone(),
            when,
            created_at: now,
        }
    }
}

impl Entity for Booking {
    const NAME: &'static str = "booking";
    const TABLE: &'static str = "booking";
    const COLUMNS: &'static [&'static str] = &["id", "session_id", "business_id", "service_id", "when", "created_at"];
    const UNIQUE: &'static [&'static str] = &["session_id"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.session_id.clone().into(),
            self.business_id.clone().into(),
            self.service_id.clone().into(),
            self.when.into(),
            self.created_at.into(),
        ]
    }
}
