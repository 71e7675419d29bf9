use std::fmt;

use thiserror::Error;

/// HTTP-status-like category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    ServerError,
    /// Unreachable server, timeout, or cancelled request.
    NetworkFailure,
}

impl RemoteErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            409 => Self::Conflict,
            400..=499 => Self::BadRequest,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadRequest => "bad request",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::ServerError => "server error",
            Self::NetworkFailure => "network failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {}", .message.as_deref().unwrap_or("no details"))]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// The `error` field of the server's response body, when there was one.
    pub message: Option<String>,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    pub fn network() -> Self {
        Self {
            kind: RemoteErrorKind::NetworkFailure,
            message: None,
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally; no request was made.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    ImportFormat(String),

    #[error("could not render export: {0}")]
    Export(String),
}

impl ClientError {
    /// Text shown to the user: the server's message when it sent one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(msg) | ClientError::ImportFormat(msg) => msg.clone(),
            ClientError::Export(_) => fallback.to_string(),
            ClientError::Remote(err) => err
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}
