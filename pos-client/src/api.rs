//! Typed backend endpoints

use serde_json::Value;
use shared::models::{
    AcknowledgeRequest, Category, DiningTable, NotificationLog, Order, PaymentRequest, Product,
    Receipt,
};
use shared::order::{OrderCreate, UpdateItemsRequest};

use crate::ClientResult;
use crate::http::{HttpClient, NetworkHttpClient};

/// Order status transitions exposed as `orders/{id}/<action>/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    StartPreparation,
    MarkReady,
    MarkServed,
    Cancel,
    StartDelivery,
    MarkDelivered,
}

impl OrderAction {
    /// Path segment of the action endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Self::StartPreparation => "start_preparation",
            Self::MarkReady => "mark_ready",
            Self::MarkServed => "mark-served",
            Self::Cancel => "cancel_order",
            Self::StartDelivery => "start_delivery",
            Self::MarkDelivered => "mark_delivered",
        }
    }
}

/// Restaurant backend API
#[derive(Debug, Clone)]
pub struct PosApi<C: HttpClient = NetworkHttpClient> {
    http: C,
}

impl<C: HttpClient> PosApi<C> {
    pub fn new(http: C) -> Self {
        Self { http }
    }

    // ==================== Catalog ====================

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        self.http.get("categories/").await
    }

    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        self.http.get("products/").await
    }

    pub async fn tables(&self) -> ClientResult<Vec<DiningTable>> {
        self.http.get("tables/").await
    }

    // ==================== Orders ====================

    /// All orders, optionally filtered by the backend search
    pub async fn orders(&self, search: Option<&str>) -> ClientResult<Vec<Order>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                self.http
                    .get_with_query("orders/", &[("search", term)])
                    .await
            }
            None => self.http.get("orders/").await,
        }
    }

    pub async fn order(&self, order_id: i64) -> ClientResult<Order> {
        self.http.get(&format!("orders/{}/", order_id)).await
    }

    pub async fn create_order(&self, body: &OrderCreate) -> ClientResult<Order> {
        self.http.post("orders/", body).await
    }

    pub async fn update_items(
        &self,
        order_id: i64,
        body: &UpdateItemsRequest,
    ) -> ClientResult<Value> {
        self.http
            .post(&format!("orders/{}/update-items/", order_id), body)
            .await
    }

    pub async fn order_action(&self, order_id: i64, action: OrderAction) -> ClientResult<Value> {
        tracing::debug!(order_id, action = action.path(), "Order action");
        self.http
            .post_empty(&format!("orders/{}/{}/", order_id, action.path()))
            .await
    }

    pub async fn process_payment(
        &self,
        order_id: i64,
        body: &PaymentRequest,
    ) -> ClientResult<Value> {
        self.http
            .post(&format!("orders/{}/process_payment/", order_id), body)
            .await
    }

    pub async fn receipt(&self, order_id: i64) -> ClientResult<Receipt> {
        self.http.get(&format!("orders/{}/receipt/", order_id)).await
    }

    // ==================== Kitchen ====================

    pub async fn unacknowledged_changes(&self) -> ClientResult<Vec<NotificationLog>> {
        self.http.get("kitchen/unacknowledged-changes/").await
    }

    pub async fn acknowledge_changes(&self, log_ids: Vec<i64>) -> ClientResult<Value> {
        self.http
            .post("kitchen/acknowledge-changes/", &AcknowledgeRequest { log_ids })
            .await
    }

    // ==================== Cashier / Delivery ====================

    pub async fn ready_orders(&self) -> ClientResult<Vec<Order>> {
        self.http.get("cashier/orders-ready/").await
    }

    pub async fn payment_history(&self) -> ClientResult<Vec<Order>> {
        self.http.get("cashier/payment-history/").await
    }

    pub async fn paid_delivery_orders(&self) -> ClientResult<Vec<Order>> {
        self.http.get("delivery/paid-orders/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_paths() {
        assert_eq!(OrderAction::StartPreparation.path(), "start_preparation");
        assert_eq!(OrderAction::MarkServed.path(), "mark-served");
        assert_eq!(OrderAction::Cancel.path(), "cancel_order");
        assert_eq!(OrderAction::MarkDelivered.path(), "mark_delivered");
    }
}
