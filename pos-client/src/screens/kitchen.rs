//! Kitchen board screen
//!
//! Status transitions are applied to the cached board first and rolled back
//! when the backend refuses them.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use shared::error::AppError;
use shared::models::{NotificationLog, Order, OrderStatus};

use crate::ClientResult;
use crate::api::OrderAction;
use crate::context::ClientContext;
use crate::guard::PendingSet;
use crate::optimistic::apply_optimistic;
use crate::polling::{PollHandle, PollSpec};
use crate::prefs::{KitchenColumns, PrefsStore};
use crate::screens::keys;

/// Result of a transition that may need operator confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Done,
    /// The operator declined the confirmation; nothing was sent
    Declined,
}

/// Board column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenColumn {
    New,
    Preparing,
    Ready,
}

/// Orders grouped by column; hidden columns stay empty
#[derive(Debug, Clone, Default)]
pub struct KitchenBoard {
    pub new: Vec<Order>,
    pub preparing: Vec<Order>,
    pub ready: Vec<Order>,
}

impl KitchenBoard {
    pub fn from_orders(orders: &[Order], columns: KitchenColumns) -> Self {
        Self {
            new: column(orders, columns.new, OrderStatus::is_waiting),
            preparing: column(orders, columns.preparing, |s| *s == OrderStatus::Preparing),
            ready: column(orders, columns.ready, |s| *s == OrderStatus::Ready),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.preparing.is_empty() && self.ready.is_empty()
    }
}

fn column(orders: &[Order], visible: bool, keep: impl Fn(&OrderStatus) -> bool) -> Vec<Order> {
    if !visible {
        return Vec::new();
    }
    orders.iter().filter(|o| keep(&o.status)).cloned().collect()
}

#[derive(Debug)]
struct KitchenPending {
    start: PendingSet<i64>,
    ready: PendingSet<i64>,
    served: PendingSet<i64>,
    cancel: PendingSet<i64>,
    acknowledge: PendingSet<i64>,
}

/// Kitchen board controller
#[derive(Debug, Clone)]
pub struct KitchenScreen {
    ctx: ClientContext,
    prefs: PrefsStore,
    columns: Arc<Mutex<KitchenColumns>>,
    pending: Arc<KitchenPending>,
}

impl KitchenScreen {
    pub fn new(ctx: ClientContext) -> Self {
        let prefs = PrefsStore::new(ctx.config().prefs_path.clone());
        let columns = prefs.load();
        Self {
            ctx,
            prefs,
            columns: Arc::new(Mutex::new(columns)),
            pending: Arc::new(KitchenPending {
                start: PendingSet::new("start preparation"),
                ready: PendingSet::new("mark ready"),
                served: PendingSet::new("mark served"),
                cancel: PendingSet::new("cancel order"),
                acknowledge: PendingSet::new("acknowledge notification"),
            }),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    /// Start polling the board and the change notifications
    pub fn start(&self) -> Vec<PollHandle> {
        if !self.ctx.require_login() {
            return Vec::new();
        }
        let polling = &self.ctx.config().polling;

        let orders = self.ctx.spawn_poller(
            PollSpec::new(keys::kitchen_orders(), polling.kitchen_orders),
            "Loading orders",
            |api| async move {
                let orders = api.orders(None).await?;
                Ok(orders
                    .into_iter()
                    .filter(|o| o.status.is_on_kitchen_board())
                    .collect::<Vec<_>>())
            },
        );

        // Notifications are secondary: anything but a lost session shows as
        // an empty list instead of an error.
        let notifications = self.ctx.spawn_poller(
            PollSpec::new(keys::kitchen_notifications(), polling.kitchen_notifications),
            "Loading notifications",
            |api| async move {
                match api.unacknowledged_changes().await {
                    Err(e) if !e.is_unauthorized() => {
                        tracing::warn!(error = %e, "Kitchen notifications unavailable");
                        Ok(Vec::new())
                    }
                    other => other,
                }
            },
        );

        vec![orders, notifications]
    }

    // ==================== Board ====================

    pub fn orders(&self) -> Arc<Vec<Order>> {
        self.ctx
            .cache()
            .get::<Vec<Order>>(&keys::kitchen_orders())
            .unwrap_or_default()
    }

    pub fn board(&self) -> KitchenBoard {
        KitchenBoard::from_orders(&self.orders(), self.columns())
    }

    pub fn notifications(&self) -> Arc<Vec<NotificationLog>> {
        self.ctx
            .cache()
            .get::<Vec<NotificationLog>>(&keys::kitchen_notifications())
            .unwrap_or_default()
    }

    pub fn is_pending(&self, order_id: i64) -> bool {
        let p = &self.pending;
        [&p.start, &p.ready, &p.served, &p.cancel]
            .iter()
            .any(|set| set.is_pending(&order_id))
    }

    fn cached_status(&self, order_id: i64) -> Option<OrderStatus> {
        self.orders()
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.status)
    }

    /// Order details for the details dialog
    pub async fn order_details(&self, order_id: i64) -> Option<Arc<Order>> {
        let stale = self.ctx.config().polling.order_details_stale;
        let api = self.ctx.api();
        match self
            .ctx
            .cache()
            .ensure(&keys::order_details(order_id), stale, || api.order(order_id))
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.ctx.report(&e, &format!("Order #{}", order_id));
                None
            }
        }
    }

    // ==================== Transitions ====================

    async fn transition<P>(
        &self,
        order_id: i64,
        action: OrderAction,
        pending: &PendingSet<i64>,
        project: P,
        invalidate_on_settle: bool,
        success: String,
    ) -> ClientResult<TransitionOutcome>
    where
        P: FnOnce(&mut Vec<Order>),
    {
        let _pending = pending.try_begin(order_id)?;
        let context = format!("Order #{}", order_id);
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, &context);
            return Err(e);
        }

        let key = keys::kitchen_orders();
        let api = self.ctx.api();
        let result = apply_optimistic::<Vec<Order>, _, _, _, _>(
            self.ctx.cache(),
            &key,
            project,
            || api.order_action(order_id, action),
        )
        .await;
        // a rollback may have restored a board another transition already moved past
        if invalidate_on_settle || result.is_err() {
            self.ctx.cache().invalidate(&key);
        }

        match result {
            Ok(_) => {
                tracing::info!(order_id, action = action.path(), "Kitchen transition applied");
                self.ctx.notifier().success(success);
                Ok(TransitionOutcome::Done)
            }
            Err(e) => {
                self.ctx.report(&e, &context);
                Err(e)
            }
        }
    }

    pub async fn start_preparation(&self, order_id: i64) -> ClientResult<TransitionOutcome> {
        self.ctx
            .notifier()
            .info(format!("Starting preparation of order #{}...", order_id));
        self.transition(
            order_id,
            OrderAction::StartPreparation,
            &self.pending.start,
            move |orders| set_status(orders, order_id, OrderStatus::Preparing),
            true,
            format!("Order #{} preparation started", order_id),
        )
        .await
    }

    pub async fn mark_ready(&self, order_id: i64) -> ClientResult<TransitionOutcome> {
        self.ctx
            .notifier()
            .info(format!("Marking order #{} as ready...", order_id));
        self.transition(
            order_id,
            OrderAction::MarkReady,
            &self.pending.ready,
            move |orders| {
                set_status(orders, order_id, OrderStatus::Ready);
                if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
                    order.ready_at = Some(Utc::now());
                }
            },
            true,
            format!("Order #{} is ready", order_id),
        )
        .await
    }

    /// Hand a ready order to the customer; it leaves the board
    pub async fn mark_served(&self, order_id: i64) -> ClientResult<TransitionOutcome> {
        if let Some(status) = self.cached_status(order_id)
            && status != OrderStatus::Ready
        {
            let err = AppError::invalid_status(order_id, "be marked as served", status.as_str());
            self.ctx.notifier().warning(err.message.clone());
            return Err(err.into());
        }
        self.ctx
            .notifier()
            .info(format!("Marking order #{} as served...", order_id));
        self.transition(
            order_id,
            OrderAction::MarkServed,
            &self.pending.served,
            move |orders| orders.retain(|o| o.id != order_id),
            false,
            format!("Order #{} marked as served", order_id),
        )
        .await
    }

    /// Cancel a waiting order after `confirm` agrees
    pub async fn cancel_order<C>(
        &self,
        order_id: i64,
        confirm: C,
    ) -> ClientResult<TransitionOutcome>
    where
        C: FnOnce(i64) -> bool,
    {
        if let Some(status) = self.cached_status(order_id)
            && !status.is_waiting()
        {
            let err = AppError::invalid_status(order_id, "be cancelled", status.as_str());
            self.ctx.notifier().warning(err.message.clone());
            return Err(err.into());
        }
        if !confirm(order_id) {
            self.ctx.notifier().info("Cancellation stopped");
            return Ok(TransitionOutcome::Declined);
        }
        self.ctx
            .notifier()
            .info(format!("Cancelling order #{}...", order_id));
        self.transition(
            order_id,
            OrderAction::Cancel,
            &self.pending.cancel,
            move |orders| orders.retain(|o| o.id != order_id),
            true,
            format!("Order #{} cancelled", order_id),
        )
        .await
    }

    /// Acknowledge one change notification
    pub async fn acknowledge(&self, log_id: i64) -> ClientResult<()> {
        let _pending = self.pending.acknowledge.try_begin(log_id)?;
        let context = format!("Notification #{}", log_id);
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, &context);
            return Err(e);
        }

        let api = self.ctx.api();
        let result = apply_optimistic::<Vec<NotificationLog>, _, _, _, _>(
            self.ctx.cache(),
            &keys::kitchen_notifications(),
            |logs| logs.retain(|l| l.id != log_id),
            || api.acknowledge_changes(vec![log_id]),
        )
        .await;

        match result {
            Ok(_) => {
                self.ctx
                    .notifier()
                    .success(format!("Notification #{} acknowledged", log_id));
                Ok(())
            }
            Err(e) => {
                self.ctx.report(&e, &context);
                Err(e)
            }
        }
    }

    // ==================== Column preferences ====================

    pub fn columns(&self) -> KitchenColumns {
        *self.columns.lock()
    }

    /// Show or hide a column and persist the choice
    pub fn set_column_visible(&self, column: KitchenColumn, visible: bool) -> ClientResult<()> {
        let columns = {
            let mut columns = self.columns.lock();
            match column {
                KitchenColumn::New => columns.new = visible,
                KitchenColumn::Preparing => columns.preparing = visible,
                KitchenColumn::Ready => columns.ready = visible,
            }
            *columns
        };
        self.prefs.save(&columns).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to save column preferences");
            self.ctx
                .notifier()
                .error("Failed to save the column filter settings");
        })
    }
}

/// Display label written into the cache alongside a projected status
fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Preparing => "Preparing",
        OrderStatus::Ready => "Ready",
        _ => status.as_str(),
    }
}

fn set_status(orders: &mut [Order], order_id: i64, status: OrderStatus) {
    if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
        order.status = status;
        order.status_display = status_label(status).to_string();
    }
}
