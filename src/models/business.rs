use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::database::{Entity, SqlValue};
use crate::error::BotError;

pub const DEFAULT_TIME_ZONE: &str = "Europe/Madrid";

/// Longest service id that still fits the `/dates` navigation callback in 64 bytes.
pub const SERVICE_ID_MAX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub contact_phone: String,
    pub email: String,
    pub channel_name: String,
    pub street: String,
    pub post_code: String,
    pub city: String,
    pub country: String,
    /// IANA zone name.
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
}

impl Business {
    pub fn location(&self) -> Result<Tz, BotError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| BotError::InvalidTimeZone(self.time_zone.clone()))
    }

    pub fn address(&self) -> String {
        [&self.street, &self.post_code, &self.city, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Entity for Business {
    const NAME: &'static str = "business";
    const TABLE: &'static str = "business";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "contact_phone",
        "email",
        "channel_name",
        "street",
        "post_code",
        "city",
        "country",
        "time_zone",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.contact_phone.clone().into(),
            self.email.clone().into(),
            self.channel_name.clone().into(),
            self.street.clone().into(),
            self.post_code.clone().into(),
            self.city.clone().into(),
            self.country.clone().into(),
            self.time_zone.clone().into(),
            self.created_at.into(),
        ]
    }
}

/// A bookable service. Ids travel inside callback data, so keep them short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceCatalog {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub price: i64,
    pub currency: String,
    pub duration: String,
}

impl ServiceCatalog {
    pub fn label(&self) -> String {
        format!("{} {}{}", self.name, self.price, self.currency)
    }
}

impl Entity for ServiceCatalog {
    const NAME: &'static str = "service";
    const TABLE: &'static str = "service_catalog";
    const COLUMNS: &'static [&'static str] = &["id", "business_id", "name", "price", "currency", "duration"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.business_id.clone().into(),
            self.name.clone().into(),
            self.price.into(),
            self.currency.clone().into(),
            self.duration.clone().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business(time_zone: &str) -> Business {
        Business {
            id: "B1".into(),
            name: "Barbería Test".into(),
            contact_phone: String::new(),
            email: String::new(),
            channel_name: String::new(),
            street: "Carrer Major 1".into(),
            post_code: String::new(),
            city: "Barcelona".into(),
            country: "España".into(),
            time_zone: time_zone.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn location_parses_iana_names() {
        assert_eq!(business(DEFAULT_TIME_ZONE).location().unwrap(), chrono_tz::Europe::Madrid);
        assert!(matches!(
            business("Mars/Olympus").location(),
            Err(BotError::InvalidTimeZone(_))
        ));
    }

    #[test]
    fn address_skips_empty_parts() {
        assert_eq!(business(DEFAULT_TIME_ZONE).address(), "Carrer Major 1, Barcelona, España");
    }
}
