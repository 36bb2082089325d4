pub mod booking;
pub mod business;
pub mod google_token;
pub mod message;
pub mod notification;
pub mod session;
pub mod update;

pub use booking::Booking;
pub use business::{Business, ServiceCatalog};
pub use google_token::GoogleToken;
pub use message::{chunk, Button, OutboundMessage};
pub use notification::TelegramNotification;
pub use session::{BookingSession, SessionPatch};
pub use update::{CallbackData, CallbackUpdate, InboundUpdate, MessageUpdate};
