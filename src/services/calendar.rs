use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};

use crate::models::GoogleToken;

const RETRIES: u32 = 3;
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("calendar payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("calendar provider answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{0} does not exist in {1}")]
    NonexistentLocalTime(NaiveDateTime, Tz),
}

/// An appointment as it lands in the business calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl CalendarEvent {
    /// One hour starting at `when`, read as wall-clock time in `zone`.
    pub fn one_hour(
        summary: String,
        description: String,
        location: String,
        when: NaiveDateTime,
        zone: Tz,
    ) -> Result<Self, CalendarError> {
        let start = zone
            .from_local_datetime(&when)
            .earliest()
            .ok_or(CalendarError::NonexistentLocalTime(when, zone))?;

        Ok(Self {
            summary,
            description,
            location,
            start,
            end: start + Duration::hours(1),
        })
    }

    pub fn time_zone(&self) -> &'static str {
        self.start.timezone().name()
    }
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError>;
}

/// Hands out a calendar client authorised with a business token.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn resolve_client(&self, token: &GoogleToken) -> Result<Box<dyn CalendarClient>, CalendarError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct GoogleEvent {
    summary: String,
    description: String,
    location: String,
    start: EventDateTime,
    end: EventDateTime,
    status: &'static str,
}

impl From<&CalendarEvent> for GoogleEvent {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: EventDateTime {
                date_time: event.start.to_rfc3339(),
                time_zone: event.time_zone().to_string(),
            },
            end: EventDateTime {
                date_time: event.end.to_rfc3339(),
                time_zone: event.time_zone().to_string(),
            },
            status: "confirmed",
        }
    }
}

fn http_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);

    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// Google Calendar over its REST API.
pub struct GoogleCalendar {
    http: ClientWithMiddleware,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendar {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: http_client(),
            client_id,
            client_secret,
        }
    }

    async fn refresh(&self, token: &GoogleToken) -> Result<String, CalendarError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("refresh_token", &token.refresh_token)
            .append_pair("grant_type", "refresh_token")
            .finish();

        let response = self
            .http
            .post(TOKEN_URL)
            .header("Accept", "application/json")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let refreshed = serde_json::from_str::<TokenResponse>(&text)?;
        log::debug!("🔑 Google token refreshed for business {}", token.business_id);
        Ok(refreshed.access_token)
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendar {
    async fn resolve_client(&self, token: &GoogleToken) -> Result<Box<dyn CalendarClient>, CalendarError> {
        let access_token = if token.refresh_token.is_empty() {
            token.access_token.clone()
        } else {
            self.refresh(token).await?
        };

        Ok(Box::new(GoogleCalendarClient {
            http: self.http.clone(),
            access_token,
        }))
    }
}

struct GoogleCalendarClient {
    http: ClientWithMiddleware,
    access_token: String,
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        let payload = GoogleEvent::from(event);

        let response = self
            .http
            .post(format!("{}/calendars/primary/events", CALENDAR_API))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.access_token))
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }

        Ok(())
    }
}
