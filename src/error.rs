use std::fmt;

use crate::database::StoreError;
use crate::services::calendar::CalendarError;
use crate::services::messenger::MessagingError;

/// Expected conditions the user can be told about.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("booking session {0} not found")]
    SessionNotFound(String),

    #[error("booking session {0} has expired")]
    SessionExpired(String),

    #[error("business {0} not found")]
    BusinessNotFound(String),

    #[error("service {0} not found")]
    ServiceNotFound(String),

    #[error("session {0} was already processed")]
    AlreadyProcessed(String),

    #[error("start command without business id")]
    MissingStartPayload,

    #[error("business {0} has no calendar connected")]
    CalendarNotConnected(String),

    #[error("slot {0} is not available")]
    SlotUnavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("no handler for command {0}")]
    UnknownCommand(String),

    #[error("command {0} cannot be used from this kind of update")]
    UnsupportedUpdate(&'static str),

    #[error("malformed callback data {0:?}")]
    MalformedCallback(String),

    #[error("missing query parameter {0}")]
    MissingParameter(&'static str),

    #[error("invalid value {value:?} for {name}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("unknown time zone {0}")]
    InvalidTimeZone(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("{step}::{operation}{vals}: {source}", vals = Values(.values))]
    Traced {
        operation: &'static str,
        step: &'static str,
        values: Vec<String>,
        #[source]
        source: Box<BotError>,
    },
}

struct Values<'a>(&'a [String]);

impl fmt::Display for Values<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, " {:?}", self.0)
        }
    }
}

impl BotError {
    /// The innermost error, skipping trace frames.
    pub fn root(&self) -> &BotError {
        let mut current = self;
        while let BotError::Traced { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_domain(&self) -> bool {
        match self.root() {
            BotError::Domain(_) => true,
            BotError::Store(err) => err.is_domain(),
            _ => false,
        }
    }

    pub fn is_expired_session(&self) -> bool {
        matches!(self.root(), BotError::Domain(DomainError::SessionExpired(_)))
    }

    /// Text that is safe to show to the user in the chat.
    pub fn present(&self) -> String {
        match self.root() {
            BotError::Domain(DomainError::SessionNotFound(_)) => {
                "No encontramos tu reserva en curso. Vuelve a empezar desde el canal del negocio.".to_string()
            }
            BotError::Domain(DomainError::SessionExpired(_)) => {
                "Lo sentimos, la sesión ha caducado.".to_string()
            }
            BotError::Domain(DomainError::BusinessNotFound(_)) => {
                "No hemos encontrado el negocio con el que quieres reservar.".to_string()
            }
            BotError::Domain(DomainError::ServiceNotFound(_)) => {
                "El servicio seleccionado ya no está disponible.".to_string()
            }
            BotError::Domain(DomainError::AlreadyProcessed(_)) => {
                "Esta reserva ya está confirmada.".to_string()
            }
            BotError::Domain(DomainError::MissingStartPayload) => {
                "Accede al bot desde el enlace del negocio para empezar una reserva.".to_string()
            }
            BotError::Domain(DomainError::SlotUnavailable(_)) => {
                "Esa hora ya no está disponible. Vuelve atrás y elige otra.".to_string()
            }
            BotError::Domain(DomainError::CalendarNotConnected(_)) => {
                "El negocio todavía no puede recibir reservas. Inténtalo más tarde.".to_string()
            }
            BotError::UnknownCommand(_) | BotError::UnsupportedUpdate(_) => {
                "No entiendo ese mensaje. Usa los botones o el enlace del negocio para reservar.".to_string()
            }
            BotError::Store(StoreError::Duplicate { .. }) => "Esta reserva ya está registrada.".to_string(),
            BotError::Store(StoreError::NotFound { .. }) => {
                "No hemos encontrado la información de tu reserva.".to_string()
            }
            _ => "Algo ha ido mal procesando tu reserva. Vuelve a intentarlo en unos minutos.".to_string(),
        }
    }
}

/// Wraps a failure with the operation and step it happened in.
pub trait Trace<T> {
    fn trace(self, operation: &'static str, step: &'static str) -> Result<T, BotError>;

    fn trace_with(self, operation: &'static str, step: &'static str, values: &[&str]) -> Result<T, BotError>;
}

impl<T, E> Trace<T> for Result<T, E>
where
    E: Into<BotError>,
{
    fn trace(self, operation: &'static str, step: &'static str) -> Result<T, BotError> {
        self.trace_with(operation, step, &[])
    }

    fn trace_with(self, operation: &'static str, step: &'static str, values: &[&str]) -> Result<T, BotError> {
        self.map_err(|err| BotError::Traced {
            operation,
            step,
            values: values.iter().map(|v| v.to_string()).collect(),
            source: Box::new(err.into()),
        })
    }
}
