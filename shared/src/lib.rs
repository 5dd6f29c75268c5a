//! Shared types for the POS terminal client
//!
//! Wire models for the restaurant backend, request payloads, the order-edit
//! diff, local validation rules and the structured error system.
//! Nothing in this crate performs I/O.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{Order, OrderItem, OrderStatus, OrderType};
pub use serde::{Deserialize, Serialize};
