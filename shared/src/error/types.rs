//! Structured application error

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every locally detected failure (validation, invalid transitions, busy
/// actions) is expressed as an `AppError` before anything reaches the network.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field names, ids, statuses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a required field error
    pub fn required(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::RequiredField, msg).with_detail("field", field.into())
    }

    /// Create an invalid status transition error
    pub fn invalid_status(order_id: i64, action: &str, status: impl std::fmt::Display) -> Self {
        Self::with_message(
            ErrorCode::OrderInvalidStatus,
            format!("Order #{} cannot {} with status '{}'", order_id, action, status),
        )
        .with_detail("order_id", order_id)
        .with_detail("action", action)
        .with_detail("status", status.to_string())
    }

    /// Create a busy error for an action that is already in flight
    pub fn busy(action: impl Into<String>) -> Self {
        Self::new(ErrorCode::SystemBusy).with_detail("action", action.into())
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::OrderEmpty);
        assert_eq!(err.code, ErrorCode::OrderEmpty);
        assert_eq!(err.message, "Cart is empty");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Missing required fields")
            .with_detail("field", "customer_name")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.detail("field").unwrap(), "customer_name");
        assert_eq!(err.detail("reason").unwrap(), "required");
        assert!(err.detail("missing").is_none());
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::required("table_id", "Select a table");
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.detail("field").unwrap(), "table_id");

        let err = AppError::invalid_status(12, "be marked as served", "preparing");
        assert_eq!(err.code, ErrorCode::OrderInvalidStatus);
        assert_eq!(
            err.message,
            "Order #12 cannot be marked as served with status 'preparing'"
        );
        assert_eq!(err.detail("order_id").unwrap(), 12);

        let err = AppError::busy("create_order");
        assert_eq!(err.code, ErrorCode::SystemBusy);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::TableOccupied, "Table 4 is occupied");
        assert_eq!(format!("{}", err), "Table 4 is occupied");
    }

    #[test]
    fn test_app_error_serialize() {
        let err = AppError::new(ErrorCode::TableRequired);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 7004);
        assert_eq!(json["message"], "Select a table");
        assert!(json.get("details").is_none());
    }
}
