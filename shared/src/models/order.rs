//! Order Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::payment::PaymentInfo;

/// Order lifecycle tag as reported by the backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    New,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
    Delivering,
    Delivered,
    Paid,
    /// Any tag this client does not know about
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::New => "new",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Served => "served",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Paid => "paid",
            Self::Unknown => "unknown",
        }
    }

    /// Completed and cancelled orders can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses that have not been picked up by the kitchen yet
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Pending | Self::New)
    }

    /// Whether the kitchen board still shows orders in this status
    pub fn is_on_kitchen_board(&self) -> bool {
        !matches!(self, Self::Completed | Self::Served | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the order is fulfilled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    #[serde(alias = "dine-in")]
    DineIn,
    Takeaway,
    Delivery,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DineIn => "dine_in",
            Self::Takeaway => "takeaway",
            Self::Delivery => "delivery",
        }
    }

    /// Takeaway and delivery orders carry customer contact data
    pub fn needs_customer(&self) -> bool {
        matches!(self, Self::Takeaway | Self::Delivery)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product summary embedded in an order line
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductDetails {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Order line item
///
/// Items created locally during an edit session have no `id` until the
/// backend assigns one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<i64>,
    /// Product reference
    pub product: i64,
    #[serde(default)]
    pub product_details: Option<ProductDetails>,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub total_price: Decimal,
}

impl OrderItem {
    /// Line total computed from unit price and quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn product_name(&self) -> &str {
        self.product_details
            .as_ref()
            .map(|d| d.name.as_str())
            .unwrap_or_default()
    }
}

/// Table summary embedded in an order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Order snapshot owned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_display: String,
    pub order_type: OrderType,
    #[serde(default)]
    pub order_type_display: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ready_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub table: Option<TableInfo>,
    #[serde(default)]
    pub table_id: Option<i64>,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub service_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub service_fee_amount: Option<Decimal>,
    #[serde(default)]
    pub tax_percent: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub final_price: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment: Option<PaymentInfo>,
}

impl Order {
    /// Last update time, falling back to creation time
    pub fn last_update(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Payment time if the order has been paid
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.payment.as_ref().and_then(PaymentInfo::paid_time)
    }

    pub fn is_editable(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_ref().map(|t| t.name.as_str())
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    const ORDER_JSON: &str = r#"{
        "id": 42,
        "status": "preparing",
        "status_display": "Preparing",
        "order_type": "dine-in",
        "order_type_display": "Dine in",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:05:00+05:00",
        "table": {"name": "4", "zone": "Hall"},
        "table_id": 7,
        "total_price": "100000.00",
        "service_fee_percent": 10,
        "final_price": 110000,
        "items": [
            {"id": 1, "product": 10, "product_details": {"name": "Plov"},
             "quantity": 2, "unit_price": "50000.00", "total_price": "100000.00"}
        ],
        "payment": null
    }"#;

    #[test]
    fn test_order_parse() {
        let order: Order = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.order_type, OrderType::DineIn);
        assert_eq!(order.table_name(), Some("4"));
        assert_eq!(order.final_price, dec("110000"));
        assert_eq!(order.total_price, dec("100000.00"));
        assert_eq!(order.service_fee_percent, Some(dec("10")));
        assert_eq!(order.items[0].product_name(), "Plov");
        assert_eq!(order.items[0].line_total(), dec("100000"));
        assert!(order.payment.is_none());
        assert!(order.is_editable());
        assert_eq!(
            order.last_update().to_rfc3339(),
            "2024-05-01T05:05:00+00:00"
        );
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let status: OrderStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_status_predicates() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Served.is_terminal());

        assert!(OrderStatus::Pending.is_waiting());
        assert!(OrderStatus::New.is_waiting());
        assert!(!OrderStatus::Preparing.is_waiting());

        assert!(OrderStatus::Ready.is_on_kitchen_board());
        assert!(!OrderStatus::Served.is_on_kitchen_board());
    }

    #[test]
    fn test_order_type_serde() {
        assert_eq!(
            serde_json::to_string(&OrderType::DineIn).unwrap(),
            "\"dine_in\""
        );
        let t: OrderType = serde_json::from_str("\"dine_in\"").unwrap();
        assert_eq!(t, OrderType::DineIn);
        assert!(OrderType::Delivery.needs_customer());
        assert!(!OrderType::DineIn.needs_customer());
    }

    #[test]
    fn test_item_without_id() {
        let item: OrderItem =
            serde_json::from_str(r#"{"product": 20, "quantity": 1, "unit_price": 5}"#).unwrap();
        assert!(item.id.is_none());
        assert_eq!(item.product_name(), "");
        assert_eq!(item.line_total(), dec("5"));
    }
}
