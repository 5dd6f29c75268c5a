//! Unified error codes for the POS client
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// Session has expired
    SessionExpired = 1005,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order is empty
    OrderEmpty = 4007,
    /// Order cannot be edited in its current status
    OrderNotEditable = 4008,
    /// Requested transition is not valid for the current status
    OrderInvalidStatus = 4009,
    /// Another edit session is already active
    EditSessionActive = 4010,
    /// No edit session is active
    EditSessionMissing = 4011,
    /// Cart is locked while an order is being edited
    CartLocked = 4012,
    /// Customer name or phone missing
    CustomerInfoRequired = 4013,
    /// Delivery address missing
    DeliveryAddressRequired = 4014,

    // ==================== 5xxx: Payment ====================
    /// Insufficient payment amount
    PaymentInsufficientAmount = 5002,
    /// Invalid payment method
    PaymentInvalidMethod = 5003,
    /// Mobile payment requires a provider
    PaymentProviderRequired = 5006,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table is occupied
    TableOccupied = 7002,
    /// Dine-in order requires a table
    TableRequired = 7004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Network error
    NetworkError = 9003,
    /// Request timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Action already in progress
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Every known code, in numeric order
    pub const ALL: [ErrorCode; 28] = [
        ErrorCode::Success,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::InvalidRequest,
        ErrorCode::RequiredField,
        ErrorCode::SessionExpired,
        ErrorCode::PermissionDenied,
        ErrorCode::OrderNotFound,
        ErrorCode::OrderAlreadyPaid,
        ErrorCode::OrderEmpty,
        ErrorCode::OrderNotEditable,
        ErrorCode::OrderInvalidStatus,
        ErrorCode::EditSessionActive,
        ErrorCode::EditSessionMissing,
        ErrorCode::CartLocked,
        ErrorCode::CustomerInfoRequired,
        ErrorCode::DeliveryAddressRequired,
        ErrorCode::PaymentInsufficientAmount,
        ErrorCode::PaymentInvalidMethod,
        ErrorCode::PaymentProviderRequired,
        ErrorCode::TableNotFound,
        ErrorCode::TableOccupied,
        ErrorCode::TableRequired,
        ErrorCode::InternalError,
        ErrorCode::NetworkError,
        ErrorCode::TimeoutError,
        ErrorCode::ConfigError,
        ErrorCode::SystemBusy,
    ];

    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::SessionExpired => "Session expired, please log in again",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::OrderNotEditable => "Order cannot be edited in its current status",
            ErrorCode::OrderInvalidStatus => "Action is not allowed in the current order status",
            ErrorCode::EditSessionActive => "Another order is already being edited",
            ErrorCode::EditSessionMissing => "No order is being edited",
            ErrorCode::CartLocked => "Cart is locked while an order is being edited",
            ErrorCode::CustomerInfoRequired => "Customer name and phone are required",
            ErrorCode::DeliveryAddressRequired => "Delivery address is required",

            // Payment
            ErrorCode::PaymentInsufficientAmount => "Received amount is less than the total",
            ErrorCode::PaymentInvalidMethod => "Invalid payment method",
            ErrorCode::PaymentProviderRequired => "Select a provider for mobile payment",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::TableRequired => "Select a table",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::NetworkError => "Could not reach the server, check the connection",
            ErrorCode::TimeoutError => "Request timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "Please wait for the previous action to finish",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
