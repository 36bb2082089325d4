use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::{Entity, SqlValue};

/// OAuth credentials a business granted for its Google calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoogleToken {
    pub id: String,
    pub business_id: String,
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for GoogleToken {
    const NAME: &'static str = "google token";
    const TABLE: &'static str = "google_token";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "business_id",
        "access_token",
        "token_type",
        "refresh_token",
        "scope",
        "created_at",
    ];
    const UNIQUE: &'static [&'static str] = &["business_id"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.business_id.clone().into(),
            self.access_token.clone().into(),
            self.token_type.clone().into(),
            self.refresh_token.clone().into(),
            self.scope.clone().into(),
            self.created_at.into(),
        ]
    }
}
