//! New order drafts
//!
//! Validation runs locally so that an incomplete order never reaches the
//! backend.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::models::{Order, OrderStatus, OrderType};
use crate::util::{PHONE_PREFIX, digits_only, has_phone_number};

/// Line of a new order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLineInput {
    pub product_id: i64,
    pub quantity: u32,
}

/// `orders/` POST body
///
/// Fields that do not apply to the order type are sent as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderCreate {
    pub order_type: OrderType,
    pub table_id: Option<i64>,
    pub customer_name: Option<String>,
    /// Digits only
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub items: Vec<OrderLineInput>,
}

impl OrderCreate {
    /// Copy of a completed order with the same type, table, customer and lines
    pub fn reorder_from(order: &Order) -> AppResult<Self> {
        if order.status != OrderStatus::Completed {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidStatus,
                "Only completed orders can be reordered",
            )
            .with_detail("order_id", order.id)
            .with_detail("status", order.status.as_str()));
        }
        if order.order_type == OrderType::DineIn && order.table_id.is_none() {
            return Err(AppError::with_message(
                ErrorCode::TableRequired,
                "The order has no table, it cannot be reordered",
            )
            .with_detail("order_id", order.id));
        }

        let needs_customer = order.order_type.needs_customer();
        Ok(Self {
            order_type: order.order_type,
            table_id: (order.order_type == OrderType::DineIn)
                .then_some(order.table_id)
                .flatten(),
            customer_name: needs_customer
                .then(|| order.customer_name.clone())
                .flatten(),
            customer_phone: needs_customer
                .then(|| order.customer_phone.as_deref().map(digits_only))
                .flatten(),
            customer_address: (order.order_type == OrderType::Delivery)
                .then(|| order.customer_address.clone())
                .flatten(),
            items: order
                .items
                .iter()
                .map(|i| OrderLineInput {
                    product_id: i.product,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }
}

/// Customer contact data as typed on the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    /// Formatted input, `+998 ` followed by digits
    pub phone: String,
    pub address: String,
}

impl Default for CustomerInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: PHONE_PREFIX.to_string(),
            address: String::new(),
        }
    }
}

impl CustomerInfo {
    /// Check name, phone and (for delivery) address
    pub fn validate(&self, order_type: OrderType) -> AppResult<()> {
        if self.name.trim().is_empty() || self.phone.trim().is_empty() {
            return Err(AppError::new(ErrorCode::CustomerInfoRequired));
        }
        if !has_phone_number(&self.phone) {
            return Err(AppError::required(
                "customer_phone",
                "Enter the phone number",
            ));
        }
        if order_type == OrderType::Delivery && self.address.trim().is_empty() {
            return Err(AppError::new(ErrorCode::DeliveryAddressRequired));
        }
        Ok(())
    }
}

/// New order as assembled on the POS screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub table_id: Option<i64>,
    pub customer: CustomerInfo,
    pub lines: Vec<OrderLineInput>,
}

impl OrderDraft {
    /// Validate the draft and build the request body
    ///
    /// Checks run in order: non-empty cart, table for dine-in, customer data
    /// for takeaway and delivery, address for delivery.
    pub fn build(&self) -> AppResult<OrderCreate> {
        if self.lines.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        if self.order_type == OrderType::DineIn && self.table_id.is_none() {
            return Err(AppError::new(ErrorCode::TableRequired));
        }
        let needs_customer = self.order_type.needs_customer();
        if needs_customer {
            self.customer.validate(self.order_type)?;
        }

        Ok(OrderCreate {
            order_type: self.order_type,
            table_id: if self.order_type == OrderType::DineIn {
                self.table_id
            } else {
                None
            },
            customer_name: needs_customer.then(|| self.customer.name.trim().to_string()),
            customer_phone: needs_customer.then(|| digits_only(&self.customer.phone)),
            customer_address: (self.order_type == OrderType::Delivery)
                .then(|| self.customer.address.trim().to_string()),
            items: self.lines.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<OrderLineInput> {
        vec![OrderLineInput {
            product_id: 10,
            quantity: 2,
        }]
    }

    fn customer(name: &str, phone: &str, address: &str) -> CustomerInfo {
        CustomerInfo {
            name: name.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
        }
    }

    fn draft(order_type: OrderType) -> OrderDraft {
        OrderDraft {
            order_type,
            table_id: None,
            customer: CustomerInfo::default(),
            lines: lines(),
        }
    }

    #[test]
    fn test_empty_cart_rejected_first() {
        let mut d = draft(OrderType::DineIn);
        d.lines.clear();
        assert_eq!(d.build().unwrap_err().code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_dine_in_requires_table() {
        let mut d = draft(OrderType::DineIn);
        assert_eq!(d.build().unwrap_err().code, ErrorCode::TableRequired);

        d.table_id = Some(5);
        d.customer = customer("Ali", "+998 901234567", "Street 1");
        let body = d.build().unwrap();
        assert_eq!(body.table_id, Some(5));
        assert!(body.customer_name.is_none());
        assert!(body.customer_phone.is_none());
        assert!(body.customer_address.is_none());
    }

    #[test]
    fn test_takeaway_customer_rules() {
        let mut d = draft(OrderType::Takeaway);
        assert_eq!(d.build().unwrap_err().code, ErrorCode::CustomerInfoRequired);

        d.customer = customer("Ali", "+998 ", "");
        let err = d.build().unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.detail("field").unwrap(), "customer_phone");

        d.customer = customer("Ali", "+998 901234567", "");
        d.table_id = Some(3);
        let body = d.build().unwrap();
        assert_eq!(body.customer_phone.as_deref(), Some("998901234567"));
        assert_eq!(body.table_id, None);
        assert!(body.customer_address.is_none());
    }

    #[test]
    fn test_delivery_requires_address() {
        let mut d = draft(OrderType::Delivery);
        d.customer = customer("Ali", "+998 901234567", "  ");
        assert_eq!(
            d.build().unwrap_err().code,
            ErrorCode::DeliveryAddressRequired
        );

        d.customer.address = "Chilonzor 5".to_string();
        let body = d.build().unwrap();
        assert_eq!(body.customer_address.as_deref(), Some("Chilonzor 5"));
    }

    #[test]
    fn test_create_body_shape() {
        let mut d = draft(OrderType::DineIn);
        d.table_id = Some(1);
        let json = serde_json::to_value(d.build().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "order_type": "dine_in",
                "table_id": 1,
                "customer_name": null,
                "customer_phone": null,
                "customer_address": null,
                "items": [{"product_id": 10, "quantity": 2}]
            })
        );
    }

    fn completed_order(order_type: &str, table_id: Option<i64>) -> Order {
        let json = serde_json::json!({
            "id": 9,
            "status": "completed",
            "order_type": order_type,
            "customer_name": "Ali",
            "customer_phone": "+998 90 123-45-67",
            "customer_address": "Street 1",
            "created_at": "2024-05-01T10:00:00Z",
            "table_id": table_id,
            "final_price": "0",
            "items": [{"id": 1, "product": 10, "quantity": 2, "unit_price": "1"}]
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_reorder_from_completed() {
        let body = OrderCreate::reorder_from(&completed_order("delivery", Some(4))).unwrap();
        assert_eq!(body.order_type, OrderType::Delivery);
        assert_eq!(body.table_id, None);
        assert_eq!(body.customer_phone.as_deref(), Some("998901234567"));
        assert_eq!(body.customer_address.as_deref(), Some("Street 1"));
        assert_eq!(body.items, lines());

        let body = OrderCreate::reorder_from(&completed_order("dine_in", Some(4))).unwrap();
        assert_eq!(body.table_id, Some(4));
        assert!(body.customer_name.is_none());
    }

    #[test]
    fn test_reorder_rejections() {
        let err = OrderCreate::reorder_from(&completed_order("dine_in", None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::TableRequired);

        let mut order = completed_order("takeaway", None);
        order.status = OrderStatus::Ready;
        let err = OrderCreate::reorder_from(&order).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidStatus);
    }
}
