pub mod calendar;
pub mod messenger;

pub use calendar::{CalendarClient, CalendarError, CalendarEvent, CalendarGateway, GoogleCalendar};
pub use messenger::{Messenger, MessagingError, TelegramMessenger};
