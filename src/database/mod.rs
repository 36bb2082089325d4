use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::models::business::SERVICE_ID_MAX_LEN;

pub mod criteria;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use criteria::{Criteria, CriteriaToSql, Filter, Operand, SqlValue};
pub use memory::InMemoryRepository;
pub use postgres::PgRepository;
pub use repository::{Entity, Repository, StoreError};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS business (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                contact_phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                channel_name TEXT NOT NULL DEFAULT '',
                street TEXT NOT NULL DEFAULT '',
                post_code TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                time_zone TEXT NOT NULL DEFAULT 'Europe/Madrid',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // service ids travel unescaped inside callback data
        let service_catalog = format!(
            r#"
            CREATE TABLE IF NOT EXISTS service_catalog (
                id VARCHAR({}) PRIMARY KEY CHECK (id ~ '^[A-Za-z0-9_-]+$'),
                business_id TEXT NOT NULL REFERENCES business (id),
                name TEXT NOT NULL,
                price BIGINT NOT NULL,
                currency TEXT NOT NULL DEFAULT '€',
                duration TEXT NOT NULL DEFAULT ''
            )
            "#,
            SERVICE_ID_MAX_LEN
        );
        sqlx::query(&service_catalog).execute(&self.pool).await?;

        // date and hour stay as text: empty means "not chosen yet"
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS booking_session (
                id TEXT PRIMARY KEY,
                business_id TEXT NOT NULL,
                chat_id BIGINT NOT NULL,
                service_id TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL DEFAULT '',
                hour TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL,
                ttl BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS booking (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL UNIQUE,
                business_id TEXT NOT NULL,
                service_id TEXT NOT NULL,
                "when" TIMESTAMP NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS telegram_notification (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL UNIQUE,
                booking_id TEXT NOT NULL,
                business_id TEXT NOT NULL,
                scheduled_at TIMESTAMP WITH TIME ZONE NOT NULL,
                chat_id BIGINT NOT NULL,
                business_name TEXT NOT NULL,
                service_name TEXT NOT NULL,
                booking_date TEXT NOT NULL,
                sent BOOLEAN NOT NULL DEFAULT false,
                sent_at TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS google_token (
                id TEXT PRIMARY KEY,
                business_id TEXT NOT NULL UNIQUE,
                access_token TEXT NOT NULL,
                token_type TEXT NOT NULL DEFAULT 'Bearer',
                refresh_token TEXT NOT NULL,
                scope TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_service_catalog_business_id ON service_catalog (business_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_booking_business_when ON booking (business_id, \"when\")")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_telegram_notification_pending ON telegram_notification (sent, scheduled_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
