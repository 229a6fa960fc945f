//! Errors raised by the dashboard core.
//!
//! - [`ClientError`] covers everything that can go wrong talking to the API,
//!   plus client-side validation that blocks a request before it is sent.
//! - [`ModalError`] covers invalid modal transitions.
//! - [`ExportError`] covers CSV assembly.
use reqwest::StatusCode;
use thiserror::Error;

use crate::modal::ModalMode;

/// Message shown when the server gives no usable explanation.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("not signed in")]
    SignedOut,
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn server(status: StatusCode, message: Option<String>) -> Self {
        Self::Server {
            status,
            message: message
                .map(|message| message.trim().to_string())
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
        }
    }

    /// Text suitable for a banner or a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Cannot reach the server. Check your connection and try again.".to_string()
            }
            Self::Server { status, message }
                if *status == StatusCode::UNAUTHORIZED && message == FALLBACK_MESSAGE =>
            {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Server { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            Self::SignedOut => "Please sign in first.".to_string(),
            Self::InvalidResponse(_) => FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Server { status, .. } if *status == StatusCode::UNAUTHORIZED)
            || matches!(self, Self::SignedOut)
    }
}

#[derive(Debug, Error)]
pub enum ModalError {
    #[error("no modal is open")]
    NotOpen,
    #[error("another modal is already open")]
    AlreadyOpen,
    #[error("a submission is already in progress")]
    Busy,
    #[error("{0:?} modal has nothing to submit")]
    ReadOnly(ModalMode),
    #[error("{0:?} is not available for this entity")]
    Unsupported(ModalMode),
    #[error("item \"{0}\" not found")]
    UnknownItem(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finalize export: {0}")]
    Finish(String),
}
