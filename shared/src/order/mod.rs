//! Order request building
//!
//! This module provides the client-side order logic that runs before a
//! request leaves the terminal:
//! - Create: new-order drafts, customer data checks and the `orders/` body
//! - Edit: the edit session buffer and the add/set/remove diff sent to
//!   `orders/{id}/update-items/`

pub mod create;
pub mod edit;

// Re-exports
pub use create::{CustomerInfo, OrderCreate, OrderDraft, OrderLineInput};
pub use edit::{
    EditPlan, EditSession, ItemOperation, OperationKind, SkippedOperation, UpdateItemsRequest,
    diff_items,
};
