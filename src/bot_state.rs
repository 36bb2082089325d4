use std::sync::Arc;

use sqlx::PgPool;

use crate::database::{PgRepository, Repository};
use crate::models::{Booking, BookingSession, Business, GoogleToken, ServiceCatalog, TelegramNotification};
use crate::services::{CalendarGateway, Messenger};

/// Everything a step needs, shared by every update.
#[derive(Clone)]
pub struct BotState {
    pub sessions: Arc<dyn Repository<BookingSession>>,
    pub businesses: Arc<dyn Repository<Business>>,
    pub services: Arc<dyn Repository<ServiceCatalog>>,
    pub bookings: Arc<dyn Repository<Booking>>,
    pub notifications: Arc<dyn Repository<TelegramNotification>>,
    pub google_tokens: Arc<dyn Repository<GoogleToken>>,
    pub messenger: Arc<dyn Messenger>,
    pub calendar: Arc<dyn CalendarGateway>,
}

impl BotState {
    pub fn postgres(pool: PgPool, messenger: Arc<dyn Messenger>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self {
            sessions: Arc::new(PgRepository::<BookingSession>::new(pool.clone())),
            businesses: Arc::new(PgRepository::<Business>::new(pool.clone())),
            services: Arc::new(PgRepository::<ServiceCatalog>::new(pool.clone())),
            bookings: Arc::new(PgRepository::<Booking>::new(pool.clone())),
            notifications: Arc::new(PgRepository::<TelegramNotification>::new(pool.clone())),
            google_tokens: Arc::new(PgRepository::<GoogleToken>::new(pool)),
            messenger,
            calendar,
        }
    }
}
