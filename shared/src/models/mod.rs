//! Data models
//!
//! JSON shapes exchanged with the restaurant backend. Prices are
//! [`rust_decimal::Decimal`] and accept JSON numbers as well as strings.

pub mod dining_table;
pub mod kitchen;
pub mod order;
pub mod payment;
pub mod product;

// Re-exports
pub use dining_table::*;
pub use kitchen::*;
pub use order::*;
pub use payment::*;
pub use product::*;
