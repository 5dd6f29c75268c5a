//! Client error types

use reqwest::StatusCode;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied (403)
    #[error("Permission denied")]
    Forbidden(Value),

    /// Resource not found (404)
    #[error("Not found")]
    NotFound(Value),

    /// Rejected by server validation (400)
    #[error("Bad request: {0}")]
    BadRequest(Value),

    /// Any other non-success status
    #[error("Server error ({status})")]
    Server { status: StatusCode, body: Value },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected locally before any request was sent
    #[error(transparent)]
    Rejected(#[from] AppError),

    /// Local file error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Map a non-success response to an error
    pub fn from_status(status: StatusCode, body: Value) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::BAD_REQUEST => Self::BadRequest(body),
            _ => Self::Server { status, body },
        }
    }

    /// HTTP status of the failed response, if one arrived
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            Self::Server { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Response body of the failed response, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Forbidden(body) | Self::NotFound(body) | Self::BadRequest(body) => Some(body),
            Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Whether no response was received at all
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(e) if e.status().is_none() && !e.is_decode())
    }

    /// Closest shared error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(e) => e.code,
            Self::Unauthorized => ErrorCode::SessionExpired,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::BadRequest(_) => ErrorCode::ValidationFailed,
            Self::Http(e) if e.is_timeout() => ErrorCode::TimeoutError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::InvalidResponse(_) | Self::Serialization(_) => ErrorCode::InvalidRequest,
            Self::Server { .. } | Self::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Best message to show an operator
    ///
    /// Server `detail`, then `message`, else `Server error (status)`.
    /// Requests that never got a response yield a connection message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(e) => e.message.clone(),
            Self::Unauthorized => ErrorCode::SessionExpired.message().to_string(),
            Self::Http(e) if e.is_timeout() => ErrorCode::TimeoutError.message().to_string(),
            Self::Http(e) if e.status().is_none() && !e.is_decode() => {
                ErrorCode::NetworkError.message().to_string()
            }
            Self::Config(msg) => msg.clone(),
            _ => match (self.status(), self.body()) {
                (Some(status), body) => body
                    .and_then(server_message)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Server error ({})", status.as_u16())),
                (None, _) => self.to_string(),
            },
        }
    }
}

/// `detail` or `message` field of an error body
pub fn server_message(body: &Value) -> Option<&str> {
    ["detail", "message"]
        .iter()
        .find_map(|k| body.get(k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Render a scalar or list value of a field-error body
pub fn render_value(value: &Value, list_sep: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| render_value(v, list_sep))
            .collect::<Vec<_>>()
            .join(list_sep),
        other => other.to_string(),
    }
}

/// Join a field-error object as `key{kv_sep}value` pairs
pub fn join_field_errors(
    body: &Value,
    kv_sep: &str,
    list_sep: &str,
    entry_sep: &str,
) -> Option<String> {
    let obj = body.as_object().filter(|o| !o.is_empty())?;
    Some(
        obj.iter()
            .map(|(k, v)| format!("{}{}{}", k, kv_sep, render_value(v, list_sep)))
            .collect::<Vec<_>>()
            .join(entry_sep),
    )
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
