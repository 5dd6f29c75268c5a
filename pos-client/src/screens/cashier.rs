//! Cashier screen: ready orders, payments and receipts

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderType, PaymentMethod, PaymentRequest, Receipt, change_due};

use crate::context::ClientContext;
use crate::guard::{InFlight, PendingSet};
use crate::polling::{PollHandle, PollSpec};
use crate::screens::keys;
use crate::{ClientError, ClientResult};

/// Result of a pay action
#[derive(Debug, Clone, PartialEq)]
pub enum PayOutcome {
    /// Payment recorded; `receipt` is `None` when it failed to load
    Paid {
        order_id: i64,
        change: Decimal,
        receipt: Option<Receipt>,
    },
    /// The order was paid before; only the receipt was loaded
    AlreadyPaid {
        order_id: i64,
        receipt: Option<Receipt>,
    },
}

#[derive(Debug, Default)]
struct CashierState {
    selected: Option<Order>,
    payment_error: Option<String>,
    receipt: Option<Receipt>,
    receipt_order_id: Option<i64>,
    receipt_error: Option<String>,
}

impl CashierState {
    fn clear_receipt(&mut self) {
        self.receipt = None;
        self.receipt_order_id = None;
        self.receipt_error = None;
    }
}

/// Payment history, latest payment (or update) first
pub fn sort_history(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by_key(|o| {
        std::cmp::Reverse(
            o.payment
                .as_ref()
                .and_then(|p| p.timestamp)
                .or(o.updated_at),
        )
    });
    orders
}

/// Cashier controller
#[derive(Debug, Clone)]
pub struct CashierScreen {
    ctx: ClientContext,
    state: Arc<Mutex<CashierState>>,
    paying: Arc<InFlight>,
    receipts: Arc<PendingSet<i64>>,
}

impl CashierScreen {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(CashierState::default())),
            paying: Arc::new(InFlight::new("process payment")),
            receipts: Arc::new(PendingSet::new("load receipt")),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    pub fn start(&self) -> Vec<PollHandle> {
        if !self.ctx.require_login() {
            return Vec::new();
        }
        let settings = self.ctx.config().polling.cashier;
        vec![
            self.ctx.spawn_poller(
                PollSpec::new(keys::ready_orders(), settings),
                "Loading ready orders",
                |api| async move { api.ready_orders().await },
            ),
            self.ctx.spawn_poller(
                PollSpec::new(keys::payment_history(), settings),
                "Loading payment history",
                |api| async move { api.payment_history().await.map(sort_history) },
            ),
        ]
    }

    pub fn ready_orders(&self) -> Arc<Vec<Order>> {
        self.ctx
            .cache()
            .get::<Vec<Order>>(&keys::ready_orders())
            .unwrap_or_default()
    }

    pub fn history(&self) -> Arc<Vec<Order>> {
        self.ctx
            .cache()
            .get::<Vec<Order>>(&keys::payment_history())
            .unwrap_or_default()
    }

    // ==================== Selection ====================

    /// Select an order, resetting payment and receipt state
    pub fn select(&self, order: Order) {
        let mut state = self.state.lock();
        state.selected = Some(order);
        state.payment_error = None;
        state.clear_receipt();
    }

    pub fn selected(&self) -> Option<Order> {
        self.state.lock().selected.clone()
    }

    pub fn payment_error(&self) -> Option<String> {
        self.state.lock().payment_error.clone()
    }

    pub fn receipt(&self) -> Option<Receipt> {
        self.state.lock().receipt.clone()
    }

    pub fn receipt_error(&self) -> Option<String> {
        self.state.lock().receipt_error.clone()
    }

    pub fn is_paying(&self) -> bool {
        self.paying.is_pending()
    }

    /// Change for the selected order; zero unless cash covers the price
    pub fn change_for(&self, method: PaymentMethod, received: Option<Decimal>) -> Decimal {
        let price = self.state.lock().selected.as_ref().map(|o| o.final_price);
        match (method, received, price) {
            (PaymentMethod::Cash, Some(received), Some(price)) => change_due(received, price),
            _ => Decimal::ZERO,
        }
    }

    // ==================== Payment ====================

    fn payment_rejected(&self, err: AppError) -> ClientError {
        self.state.lock().payment_error = Some(err.message.clone());
        err.into()
    }

    /// Pay the selected order
    ///
    /// An order that already carries a payment only gets its receipt
    /// loaded.
    pub async fn pay(
        &self,
        method: &str,
        received: Option<Decimal>,
        provider: Option<&str>,
    ) -> ClientResult<PayOutcome> {
        let Some(order) = self.selected() else {
            let err =
                AppError::with_message(ErrorCode::OrderNotFound, "Select an order to pay first");
            self.ctx.notifier().warning(err.message.clone());
            return Err(err.into());
        };
        if order.payment.is_some() {
            self.ctx
                .notifier()
                .info(format!("Order #{} is already paid", order.id));
            let receipt = self.load_receipt(order.id).await;
            return Ok(PayOutcome::AlreadyPaid {
                order_id: order.id,
                receipt,
            });
        }

        self.state.lock().payment_error = None;
        let method: PaymentMethod = method.parse().map_err(|e| self.payment_rejected(e))?;
        let body = PaymentRequest::for_cashier(method, received, provider, order.final_price)
            .map_err(|e| self.payment_rejected(e))?;
        let change = received
            .filter(|_| method == PaymentMethod::Cash)
            .map(|r| change_due(r, order.final_price))
            .unwrap_or_default();

        let _paying = self.paying.try_begin()?;
        let context = format!("Order #{} payment", order.id);
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, &context);
            return Err(e);
        }

        tracing::info!(order_id = order.id, method = %method, "Processing payment");
        match self.ctx.api().process_payment(order.id, &body).await {
            Ok(_) => {
                self.ctx
                    .notifier()
                    .success(format!("Payment for order #{} completed", order.id));
                self.ctx.cache().invalidate(&keys::ready_orders());
                self.ctx.cache().invalidate(&keys::payment_history());
                let receipt = self.load_receipt(order.id).await;
                Ok(PayOutcome::Paid {
                    order_id: order.id,
                    change,
                    receipt,
                })
            }
            Err(e) => {
                self.ctx.report(&e, &context);
                self.state.lock().payment_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    // ==================== Receipt ====================

    /// Fetch the receipt of an order into the receipt view
    ///
    /// A second request for the receipt already loading is ignored.
    pub async fn load_receipt(&self, order_id: i64) -> Option<Receipt> {
        let Ok(_loading) = self.receipts.try_begin(order_id) else {
            tracing::debug!(order_id, "Receipt already loading");
            return None;
        };
        {
            let mut state = self.state.lock();
            state.clear_receipt();
            state.receipt_order_id = Some(order_id);
        }

        match self.ctx.api().receipt(order_id).await {
            Ok(receipt) => {
                let mut state = self.state.lock();
                state.receipt = Some(receipt.clone());
                state.receipt_error = None;
                Some(receipt)
            }
            Err(e) => {
                let message = describe_receipt_error(&e, order_id);
                tracing::error!(order_id, error = %e, "Failed to load receipt");
                self.state.lock().receipt_error = Some(message.clone());
                if e.is_unauthorized() {
                    self.ctx.handle_auth_failure();
                } else {
                    self.ctx.notifier().error(message);
                }
                None
            }
        }
    }

    /// Print and close the receipt
    ///
    /// Returns the freed table's notice for dine-in orders found in the
    /// cached payment history.
    pub fn close_receipt(&self) -> ClientResult<Option<String>> {
        let order_id = {
            let mut state = self.state.lock();
            let (Some(_), Some(order_id)) = (&state.receipt, state.receipt_order_id) else {
                drop(state);
                self.ctx.notifier().error("No receipt data to print");
                let err = AppError::with_message(ErrorCode::NotFound, "No receipt data to print");
                return Err(err.into());
            };
            state.clear_receipt();
            state.selected = None;
            state.payment_error = None;
            order_id
        };
        self.ctx
            .notifier()
            .info(format!("Receipt for order #{} printed", order_id));

        let freed = self
            .history()
            .iter()
            .find(|o| o.id == order_id && o.order_type == OrderType::DineIn)
            .map(|o| {
                let table = o
                    .table_name()
                    .map(str::to_string)
                    .or_else(|| o.table_id.map(|id| id.to_string()))
                    .unwrap_or_else(|| "?".to_string());
                format!("Table {} is now free", table)
            });
        if let Some(notice) = &freed {
            self.ctx.notifier().info(notice.clone());
        }
        Ok(freed)
    }
}

/// Receipt load failure by status
pub fn describe_receipt_error(err: &ClientError, order_id: i64) -> String {
    match err {
        ClientError::NotFound(_) => format!("Order #{} not found or has no receipt", order_id),
        ClientError::Unauthorized => "Authorization error".to_string(),
        ClientError::Forbidden(_) => "No permission to view the receipt".to_string(),
        _ => match err.status() {
            Some(status) => err
                .body()
                .and_then(|b| b.get("detail"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Server error ({})", status.as_u16())),
            None => err.user_message(),
        },
    }
}
