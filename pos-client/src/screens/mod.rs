//! Headless screen controllers
//!
//! Each screen owns the client state of one terminal page: the queries it
//! polls, its pending-action flags and any local buffers. Renderers read the
//! state through accessors and call the action methods; every outcome is
//! also published on the notification channel.

pub mod cashier;
pub mod delivery;
pub mod kitchen;
pub mod pos;

pub use cashier::CashierScreen;
pub use delivery::{DeliveryOrderView, DeliveryScreen};
pub use kitchen::{KitchenBoard, KitchenScreen, TransitionOutcome};
pub use pos::{CartLine, PanelLine, PosScreen, SaveOutcome};

/// Cache keys of every query the screens use
///
/// Invalidating a prefix such as [`orders`] reaches every key below it.
pub mod keys {
    use crate::cache::QueryKey;

    pub fn categories() -> QueryKey {
        QueryKey::new(["categories"])
    }

    pub fn products() -> QueryKey {
        QueryKey::new(["products"])
    }

    pub fn tables() -> QueryKey {
        QueryKey::new(["tables"])
    }

    pub fn orders() -> QueryKey {
        QueryKey::new(["orders"])
    }

    /// POS order history, one entry per search term
    pub fn order_history() -> QueryKey {
        QueryKey::new(["orderHistory"])
    }

    pub fn order_history_search(term: &str) -> QueryKey {
        order_history().with(term)
    }

    pub fn order_details(order_id: i64) -> QueryKey {
        QueryKey::new(["orderDetails"]).with(order_id)
    }

    pub fn kitchen_orders() -> QueryKey {
        orders().with("kitchen")
    }

    pub fn kitchen_notifications() -> QueryKey {
        QueryKey::new(["notifications", "kitchen"])
    }

    pub fn ready_orders() -> QueryKey {
        orders().with("ready")
    }

    pub fn payment_history() -> QueryKey {
        orders().with("history")
    }

    pub fn delivery_orders() -> QueryKey {
        orders().with("generalDelivery")
    }

    pub fn paid_delivery_orders() -> QueryKey {
        orders().with("paidDelivery")
    }
}
