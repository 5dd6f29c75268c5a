//! Courier screen for delivery orders

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus, OrderType, PaymentMethod, PaymentRequest, change_due};

use crate::ClientResult;
use crate::api::OrderAction;
use crate::context::ClientContext;
use crate::guard::InFlight;
use crate::polling::{PollHandle, PollSpec};
use crate::screens::keys;

/// Payment method shown for delivered orders that cost nothing
pub const FREE_METHOD: &str = "free";

/// Delivery order with the derived fields the courier view needs
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOrderView {
    pub order: Order,
    pub is_paid: bool,
    /// Method of the recorded payment, or [`FREE_METHOD`]
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub item_count: usize,
}

impl DeliveryOrderView {
    pub fn new(order: Order) -> Self {
        let free = order.final_price.is_zero() && order.status == OrderStatus::Delivered;
        let payment_method = match &order.payment {
            Some(payment) => Some(payment.method.clone()),
            None if free => Some(FREE_METHOD.to_string()),
            None => None,
        };
        Self {
            is_paid: order.payment.is_some() || free,
            payment_method,
            paid_at: order.paid_at(),
            item_count: order.item_count(),
            order,
        }
    }

    pub fn id(&self) -> i64 {
        self.order.id
    }

    /// Delivered, unpaid and not free
    pub fn can_take_payment(&self) -> bool {
        self.order.status == OrderStatus::Delivered
            && !self.is_paid
            && self.order.final_price > Decimal::ZERO
    }
}

/// Delivery orders not yet paid, latest update first
pub fn active_deliveries(orders: Vec<Order>) -> Vec<DeliveryOrderView> {
    let mut views: Vec<DeliveryOrderView> = orders
        .into_iter()
        .filter(|o| o.order_type == OrderType::Delivery && o.status != OrderStatus::Paid)
        .map(DeliveryOrderView::new)
        .collect();
    views.sort_by_key(|v| std::cmp::Reverse(v.order.last_update()));
    views
}

/// Paid delivery orders, latest payment first
pub fn paid_deliveries(orders: Vec<Order>) -> Vec<DeliveryOrderView> {
    let mut views: Vec<DeliveryOrderView> =
        orders.into_iter().map(DeliveryOrderView::new).collect();
    views.sort_by_key(|v| std::cmp::Reverse(v.paid_at));
    views
}

#[derive(Debug)]
struct DeliveryFlags {
    starting: InFlight,
    completing: InFlight,
    paying: InFlight,
}

/// Courier controller
#[derive(Debug, Clone)]
pub struct DeliveryScreen {
    ctx: ClientContext,
    flags: Arc<DeliveryFlags>,
}

impl DeliveryScreen {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            flags: Arc::new(DeliveryFlags {
                starting: InFlight::new("start delivery"),
                completing: InFlight::new("mark delivered"),
                paying: InFlight::new("record delivery payment"),
            }),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    pub fn start(&self) -> Vec<PollHandle> {
        if !self.ctx.require_login() {
            return Vec::new();
        }
        let settings = self.ctx.config().polling.delivery;
        vec![
            self.ctx.spawn_poller(
                PollSpec::new(keys::delivery_orders(), settings),
                "Loading delivery orders",
                |api| async move { api.orders(None).await.map(active_deliveries) },
            ),
            self.ctx.spawn_poller(
                PollSpec::new(keys::paid_delivery_orders(), settings),
                "Loading paid orders",
                |api| async move { api.paid_delivery_orders().await.map(paid_deliveries) },
            ),
        ]
    }

    pub fn orders(&self) -> Arc<Vec<DeliveryOrderView>> {
        self.ctx
            .cache()
            .get::<Vec<DeliveryOrderView>>(&keys::delivery_orders())
            .unwrap_or_default()
    }

    /// Active orders in one status tab
    pub fn orders_with_status(&self, status: OrderStatus) -> Vec<DeliveryOrderView> {
        self.orders()
            .iter()
            .filter(|v| v.order.status == status)
            .cloned()
            .collect()
    }

    pub fn paid_orders(&self) -> Arc<Vec<DeliveryOrderView>> {
        self.ctx
            .cache()
            .get::<Vec<DeliveryOrderView>>(&keys::paid_delivery_orders())
            .unwrap_or_default()
    }

    fn find(&self, order_id: i64) -> Option<DeliveryOrderView> {
        self.orders().iter().find(|v| v.id() == order_id).cloned()
    }

    pub fn is_busy(&self) -> bool {
        self.flags.starting.is_pending()
            || self.flags.completing.is_pending()
            || self.flags.paying.is_pending()
    }

    // ==================== Actions ====================

    async fn action(
        &self,
        order_id: i64,
        action: OrderAction,
        flag: &InFlight,
        context: &str,
        success: String,
    ) -> ClientResult<()> {
        let _busy = flag.try_begin()?;
        let context = format!("Order #{} {}", order_id, context);
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, &context);
            return Err(e);
        }
        match self.ctx.api().order_action(order_id, action).await {
            Ok(_) => {
                tracing::info!(order_id, action = action.path(), "Delivery status changed");
                self.ctx.notifier().success(success);
                self.ctx.cache().invalidate(&keys::delivery_orders());
                Ok(())
            }
            Err(e) => {
                self.ctx.report(&e, &context);
                Err(e)
            }
        }
    }

    pub async fn start_delivery(&self, order_id: i64) -> ClientResult<()> {
        self.action(
            order_id,
            OrderAction::StartDelivery,
            &self.flags.starting,
            "start delivery",
            format!("Delivery of order #{} started", order_id),
        )
        .await
    }

    pub async fn mark_delivered(&self, order_id: i64) -> ClientResult<()> {
        self.action(
            order_id,
            OrderAction::MarkDelivered,
            &self.flags.completing,
            "complete delivery",
            format!("Order #{} marked as delivered", order_id),
        )
        .await
    }

    /// Change for a cash amount against the order total
    pub fn payment_change(
        &self,
        order_id: i64,
        method: PaymentMethod,
        received: Option<Decimal>,
    ) -> Decimal {
        match (method, received, self.find(order_id)) {
            (PaymentMethod::Cash, Some(received), Some(view)) => {
                change_due(received, view.order.final_price)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Record the courier's payment for a delivered order
    pub async fn record_payment(
        &self,
        order_id: i64,
        method: PaymentMethod,
        received: Option<Decimal>,
    ) -> ClientResult<()> {
        let Some(view) = self.find(order_id) else {
            return Err(AppError::new(ErrorCode::OrderNotFound)
                .with_detail("order_id", order_id)
                .into());
        };
        if view.is_paid {
            let err = AppError::new(ErrorCode::OrderAlreadyPaid).with_detail("order_id", order_id);
            self.ctx.notifier().warning(err.message.clone());
            return Err(err.into());
        }
        let body = PaymentRequest::for_delivery(method, received, view.order.final_price)
            .inspect_err(|_| {
                self.ctx
                    .notifier()
                    .error("Cash received is invalid or does not cover the total");
            })?;

        let _paying = self.flags.paying.try_begin()?;
        let context = format!("Order #{} payment", order_id);
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, &context);
            return Err(e);
        }

        tracing::info!(order_id, method = %method, "Recording delivery payment");
        match self.ctx.api().process_payment(order_id, &body).await {
            Ok(_) => {
                self.ctx
                    .notifier()
                    .success(format!("Payment for order #{} recorded", order_id));
                self.ctx.cache().invalidate(&keys::delivery_orders());
                self.ctx.cache().invalidate(&keys::paid_delivery_orders());
                Ok(())
            }
            Err(e) => {
                self.ctx.report(&e, &context);
                Err(e)
            }
        }
    }
}
