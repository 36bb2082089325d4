#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use hastypal_bot::database::{Criteria, Entity, InMemoryRepository, Repository, StoreError};
use hastypal_bot::models::{
    Booking, BookingSession, Business, CallbackUpdate, GoogleToken, InboundUpdate, MessageUpdate, OutboundMessage,
    ServiceCatalog, TelegramNotification,
};
use hastypal_bot::services::{CalendarClient, CalendarError, CalendarEvent, CalendarGateway, Messenger, MessagingError};
use hastypal_bot::BotState;

pub const CHAT_ID: i64 = 4242;

/// In-memory repository that counts every call.
pub struct Counting<T> {
    pub inner: InMemoryRepository<T>,
    pub finds: AtomicUsize,
    pub saves: AtomicUsize,
    pub updates: AtomicUsize,
}

impl<T: Entity> Counting<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            inner: InMemoryRepository::with_rows(rows),
            finds: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub async fn all(&self) -> Vec<T> {
        self.inner.all().await
    }

    pub fn calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst) + self.saves.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for Counting<T> {
    async fn find(&self, criteria: &Criteria) -> Result<Vec<T>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(criteria).await
    }

    async fn find_one(&self, criteria: &Criteria) -> Result<T, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(criteria).await
    }

    async fn save(&self, entity: &T) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(entity).await
    }

    async fn update(&self, entity: &T) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(entity).await
    }
}

/// Lookups find nothing, as if another writer committed right after them. Writes go through.
pub struct StaleReads<T>(pub Arc<Counting<T>>);

#[async_trait]
impl<T: Entity> Repository<T> for StaleReads<T> {
    async fn find(&self, _criteria: &Criteria) -> Result<Vec<T>, StoreError> {
        Ok(Vec::new())
    }

    async fn find_one(&self, criteria: &Criteria) -> Result<T, StoreError> {
        Err(StoreError::NotFound {
            entity: T::NAME,
            criteria: criteria.to_string(),
        })
    }

    async fn save(&self, entity: &T) -> Result<(), StoreError> {
        self.0.save(entity).await
    }

    async fn update(&self, entity: &T) -> Result<(), StoreError> {
        self.0.update(entity).await
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub answered: Mutex<Vec<String>>,
    pub failing_chat: Mutex<Option<i64>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> OutboundMessage {
        self.sent().last().cloned().expect("no message was sent")
    }

    pub fn fail_for(&self, chat_id: i64) {
        *self.failing_chat.lock().unwrap() = Some(chat_id);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, message: &OutboundMessage) -> Result<(), MessagingError> {
        if *self.failing_chat.lock().unwrap() == Some(message.chat_id) {
            return Err(MessagingError::Rejected(format!("chat {} blocked the bot", message.chat_id)));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessagingError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCalendar {
    pub events: Arc<Mutex<Vec<CalendarEvent>>>,
    pub resolved: Mutex<Vec<String>>,
    pub failing: AtomicBool,
}

impl RecordingCalendar {
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }
}

struct RecordingClient {
    events: Arc<Mutex<Vec<CalendarEvent>>>,
}

#[async_trait]
impl CalendarClient for RecordingClient {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl CalendarGateway for RecordingCalendar {
    async fn resolve_client(&self, token: &GoogleToken) -> Result<Box<dyn CalendarClient>, CalendarError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CalendarError::Rejected {
                status: 401,
                body: "invalid_grant".to_string(),
            });
        }
        self.resolved.lock().unwrap().push(token.business_id.clone());
        Ok(Box::new(RecordingClient {
            events: self.events.clone(),
        }))
    }
}

pub fn business(id: &str) -> Business {
    Business {
        id: id.to_string(),
        name: "Barbería Hastypal".to_string(),
        contact_phone: "600000000".to_string(),
        email: "hola@barberia.test".to_string(),
        channel_name: "barberia".to_string(),
        street: "Carrer Major 1".to_string(),
        post_code: "08001".to_string(),
        city: "Barcelona".to_string(),
        country: "España".to_string(),
        time_zone: "Europe/Madrid".to_string(),
        created_at: Utc::now(),
    }
}

pub fn service(id: &str, business_id: &str, name: &str, price: i64) -> ServiceCatalog {
    ServiceCatalog {
        id: id.to_string(),
        business_id: business_id.to_string(),
        name: name.to_string(),
        price,
        currency: "€".to_string(),
        duration: "30m".to_string(),
    }
}

pub fn google_token(business_id: &str) -> GoogleToken {
    GoogleToken {
        id: format!("token-{}", business_id),
        business_id: business_id.to_string(),
        access_token: "access".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: "refresh".to_string(),
        scope: "https://www.googleapis.com/auth/calendar".to_string(),
        created_at: Utc::now(),
    }
}

pub fn message(text: &str) -> InboundUpdate {
    InboundUpdate::Message(MessageUpdate {
        chat_id: CHAT_ID,
        first_name: "Ana".to_string(),
        text: text.to_string(),
    })
}

pub fn callback(data: impl Into<String>) -> InboundUpdate {
    InboundUpdate::Callback(CallbackUpdate {
        id: "callback-1".to_string(),
        chat_id: CHAT_ID,
        data: data.into(),
    })
}

pub struct Harness {
    pub state: BotState,
    pub sessions: Arc<Counting<BookingSession>>,
    pub businesses: Arc<Counting<Business>>,
    pub services: Arc<Counting<ServiceCatalog>>,
    pub bookings: Arc<Counting<Booking>>,
    pub notifications: Arc<Counting<TelegramNotification>>,
    pub google_tokens: Arc<Counting<GoogleToken>>,
    pub messenger: Arc<RecordingMessenger>,
    pub calendar: Arc<RecordingCalendar>,
}

impl Harness {
    /// Business `B1` with services `S1` and `S2` and a connected calendar.
    pub fn new() -> Self {
        Self::with_sessions(Vec::new())
    }

    pub fn with_sessions(sessions: Vec<BookingSession>) -> Self {
        let sessions = Arc::new(Counting::new(sessions));
        let businesses = Arc::new(Counting::new(vec![business("B1")]));
        let services = Arc::new(Counting::new(vec![
            service("S1", "B1", "Corte de pelo y barba express", 18),
            service("S2", "B1", "Corte de pelo y barba premium", 22),
        ]));
        let bookings = Arc::new(Counting::new(Vec::new()));
        let notifications = Arc::new(Counting::new(Vec::new()));
        let google_tokens = Arc::new(Counting::new(vec![google_token("B1")]));
        let messenger = Arc::new(RecordingMessenger::default());
        let calendar = Arc::new(RecordingCalendar::default());

        let state = BotState {
            sessions: sessions.clone(),
            businesses: businesses.clone(),
            services: services.clone(),
            bookings: bookings.clone(),
            notifications: notifications.clone(),
            google_tokens: google_tokens.clone(),
            messenger: messenger.clone(),
            calendar: calendar.clone(),
        };

        Self {
            state,
            sessions,
            businesses,
            services,
            bookings,
            notifications,
            google_tokens,
            messenger,
            calendar,
        }
    }

    pub async fn session(&self, id: &str) -> BookingSession {
        self.sessions
            .inner
            .find_one(&Criteria::new().equal("id", id))
            .await
            .expect("session should exist")
    }

    pub fn store_calls(&self) -> usize {
        self.businesses.calls()
            + self.services.calls()
            + self.bookings.calls()
            + self.notifications.calls()
            + self.google_tokens.calls()
    }
}
