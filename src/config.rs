use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

pub const TELEGRAM_API_TOKEN_ENV: &str = "TELEGRAM_API_TOKEN";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";
pub const SERVER_PORT_ENV: &str = "SERVER_PORT";
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";
pub const REMINDER_INTERVAL_SECS_ENV: &str = "REMINDER_INTERVAL_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    /// `None` runs the bot with long polling.
    pub webhook_url: Option<Url>,
    pub server_port: u16,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub reminder_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("{} must be set", name))
        };

        let or_default = |name: &str, default: &str| -> String {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let webhook_url = match lookup(WEBHOOK_URL_ENV).filter(|value| !value.trim().is_empty()) {
            Some(raw) => Some(Url::parse(&raw).with_context(|| format!("{} is not a valid url", WEBHOOK_URL_ENV))?),
            None => None,
        };

        Ok(Self {
            telegram_token: required(TELEGRAM_API_TOKEN_ENV)?,
            database_url: required(DATABASE_URL_ENV)?,
            database_max_connections: parse_positive(
                DATABASE_MAX_CONNECTIONS_ENV,
                &or_default(DATABASE_MAX_CONNECTIONS_ENV, "20"),
            )?,
            webhook_url,
            server_port: parse_number(SERVER_PORT_ENV, &or_default(SERVER_PORT_ENV, "4000"))?,
            google_client_id: required(GOOGLE_CLIENT_ID_ENV)?,
            google_client_secret: required(GOOGLE_CLIENT_SECRET_ENV)?,
            reminder_interval: Duration::from_secs(parse_positive(
                REMINDER_INTERVAL_SECS_ENV,
                &or_default(REMINDER_INTERVAL_SECS_ENV, "60"),
            )?),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.server_port))
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{} must be a number, got {:?}", name, raw))
}

/// Like [`parse_number`] but zero is rejected.
fn parse_positive<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = parse_number(name, raw)?;
    if value == T::default() {
        return Err(anyhow!("{} must be greater than zero", name));
    }
    Ok(value)
}
