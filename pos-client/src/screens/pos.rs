//! POS order entry screen
//!
//! Holds the cart for new orders, the customer form, the order history
//! view and the edit session for an existing order. The cart and the edit
//! session are mutually exclusive: while an order is being edited the cart
//! is locked.

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ALL_ZONES, Category, DiningTable, Order, OrderItem, OrderType, Product, sorted_zones,
};
use shared::order::{
    CustomerInfo, EditSession, OrderCreate, OrderDraft, OrderLineInput, UpdateItemsRequest,
};
use shared::util::format_phone_input;

use crate::context::ClientContext;
use crate::error::{join_field_errors, render_value, server_message};
use crate::guard::InFlight;
use crate::polling::{PollHandle, PollSpec, RefreshFn};
use crate::screens::keys;
use crate::{ClientError, ClientResult};

/// Marker the backend uses when a table already has an open order
const TABLE_OCCUPIED_MARKER: &str = "is already occupied";

// ============================================================================
// View types
// ============================================================================

/// Cart line of a new order
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Line shown in the order panel, from the cart or the edit session
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl PanelLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for PanelLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.product.price,
        }
    }
}

impl From<&OrderItem> for PanelLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product,
            name: item.product_name().to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Result of saving an edit session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Working copy equals the baseline; nothing was sent
    NoChanges,
    Saved { order_id: i64, operations: usize },
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct PosState {
    cart: Vec<CartLine>,
    order_type: OrderType,
    table_id: Option<i64>,
    customer: CustomerInfo,
    search: String,
    category: Option<i64>,
    zone: String,
    history_open: bool,
    history_search: String,
    edit: Option<EditSession>,
    edit_error: Option<String>,
    submit_error: Option<String>,
}

impl Default for PosState {
    fn default() -> Self {
        Self {
            cart: Vec::new(),
            order_type: OrderType::DineIn,
            table_id: None,
            customer: CustomerInfo::default(),
            search: String::new(),
            category: None,
            zone: ALL_ZONES.to_string(),
            history_open: false,
            history_search: String::new(),
            edit: None,
            edit_error: None,
            submit_error: None,
        }
    }
}

impl PosState {
    fn reset_new_order(&mut self) {
        self.cart.clear();
        self.table_id = None;
        self.customer = CustomerInfo::default();
    }

    fn finish_editing(&mut self) -> Option<i64> {
        self.edit_error = None;
        self.submit_error = None;
        self.cart.clear();
        self.edit.take().map(|s| s.order_id())
    }
}

#[derive(Debug)]
struct PosFlags {
    creating: InFlight,
    reordering: InFlight,
    loading_edit: InFlight,
    saving: InFlight,
}

/// POS order entry controller
#[derive(Debug, Clone)]
pub struct PosScreen {
    ctx: ClientContext,
    state: Arc<Mutex<PosState>>,
    flags: Arc<PosFlags>,
}

impl PosScreen {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(PosState::default())),
            flags: Arc::new(PosFlags {
                creating: InFlight::new("create order"),
                reordering: InFlight::new("reorder"),
                loading_edit: InFlight::new("load order for editing"),
                saving: InFlight::new("save order changes"),
            }),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    /// Start polling the table map and the order history
    ///
    /// Table load failures are only logged; the map simply keeps its last
    /// state until the next tick. The history source stays idle while the
    /// history view is closed and refetches the current search term.
    pub fn start(&self) -> Vec<PollHandle> {
        if !self.ctx.require_login() {
            return Vec::new();
        }
        let polling = &self.ctx.config().polling;
        let tables = PollSpec::new(keys::tables(), polling.tables);

        let state = self.state.clone();
        let history = PollSpec::new(keys::order_history(), polling.history)
            .when(move || state.lock().history_open);
        let screen = self.clone();
        let refresh: RefreshFn = Arc::new(move || {
            let screen = screen.clone();
            async move { screen.refresh_history().await }.boxed()
        });

        vec![
            self.ctx
                .spawn_silent_poller(tables, "Loading tables", |api| async move {
                    api.tables().await
                }),
            self.ctx.spawn_refresher(history, refresh),
        ]
    }

    /// Reject a local action with a warning notice
    fn reject(&self, err: AppError) -> ClientError {
        self.ctx.notifier().warning(err.message.clone());
        err.into()
    }

    // ==================== Catalog ====================

    /// Load categories and products unless the cached copies are fresh
    pub async fn load_catalog(&self) {
        let stale = self.ctx.config().polling.catalog_stale;
        let cache = self.ctx.cache();
        let api = self.ctx.api();

        if let Err(e) = cache.ensure(&keys::categories(), stale, || api.categories()).await {
            self.ctx.report(&e, "Loading categories");
        }
        if let Err(e) = cache.ensure(&keys::products(), stale, || api.products()).await {
            self.ctx.report(&e, "Loading products");
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        self.ctx
            .cache()
            .get::<Vec<Category>>(&keys::categories())
            .map(|c| c.as_ref().clone())
            .unwrap_or_default()
    }

    /// Active products matching the search text and category filter
    pub fn products(&self) -> Vec<Product> {
        let (search, category) = {
            let state = self.state.lock();
            (state.search.clone(), state.category)
        };
        self.ctx
            .cache()
            .get::<Vec<Product>>(&keys::products())
            .map(|products| {
                products
                    .iter()
                    .filter(|p| p.matches(&search, category))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_search(&self, search: impl Into<String>) {
        self.state.lock().search = search.into();
    }

    pub fn set_category(&self, category: Option<i64>) {
        self.state.lock().category = category;
    }

    pub fn tables(&self) -> Vec<DiningTable> {
        self.ctx
            .cache()
            .get::<Vec<DiningTable>>(&keys::tables())
            .map(|t| t.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn zones(&self) -> Vec<String> {
        sorted_zones(&self.tables())
    }

    pub fn set_zone(&self, zone: impl Into<String>) {
        self.state.lock().zone = zone.into();
    }

    /// Tables of the selected zone
    pub fn zone_tables(&self) -> Vec<DiningTable> {
        let zone = self.state.lock().zone.clone();
        self.tables()
            .into_iter()
            .filter(|t| t.in_zone(&zone))
            .collect()
    }

    fn table_label(&self, table_id: Option<i64>) -> String {
        let Some(id) = table_id else {
            return String::new();
        };
        self.tables()
            .into_iter()
            .find(|t| t.id == id)
            .map(|t| t.name)
            .unwrap_or_else(|| id.to_string())
    }

    // ==================== Cart ====================

    pub fn cart(&self) -> Vec<CartLine> {
        self.state.lock().cart.clone()
    }

    fn with_cart<F>(&self, f: F) -> ClientResult<()>
    where
        F: FnOnce(&mut Vec<CartLine>),
    {
        let mut state = self.state.lock();
        if let Some(session) = &state.edit {
            return Err(AppError::new(ErrorCode::CartLocked)
                .with_detail("order_id", session.order_id())
                .into());
        }
        f(&mut state.cart);
        Ok(())
    }

    pub fn add_to_cart(&self, product: &Product) -> ClientResult<()> {
        self.with_cart(|cart| match cart.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => cart.push(CartLine {
                product: product.clone(),
                quantity: 1,
            }),
        })
    }

    pub fn increase_quantity(&self, product_id: i64) -> ClientResult<()> {
        self.with_cart(|cart| {
            if let Some(line) = cart.iter_mut().find(|l| l.product.id == product_id) {
                line.quantity = line.quantity.saturating_add(1);
            }
        })
    }

    /// Decrease by one, dropping the line at zero
    pub fn decrease_quantity(&self, product_id: i64) -> ClientResult<()> {
        self.with_cart(|cart| {
            if let Some(idx) = cart.iter().position(|l| l.product.id == product_id) {
                if cart[idx].quantity <= 1 {
                    cart.remove(idx);
                } else {
                    cart[idx].quantity -= 1;
                }
            }
        })
    }

    // ==================== Order form ====================

    pub fn order_type(&self) -> OrderType {
        self.state.lock().order_type
    }

    pub fn set_order_type(&self, order_type: OrderType) {
        self.state.lock().order_type = order_type;
    }

    pub fn selected_table(&self) -> Option<i64> {
        self.state.lock().table_id
    }

    /// Select a table from the cached map; occupied tables are refused
    pub fn select_table(&self, table_id: i64) -> ClientResult<()> {
        let Some(table) = self.tables().into_iter().find(|t| t.id == table_id) else {
            return Err(self.reject(
                AppError::new(ErrorCode::TableNotFound).with_detail("table_id", table_id),
            ));
        };
        if !table.is_available {
            return Err(self.reject(
                AppError::with_message(
                    ErrorCode::TableOccupied,
                    format!("Table {} is occupied", table.name),
                )
                .with_detail("table_id", table_id),
            ));
        }
        self.state.lock().table_id = Some(table_id);
        Ok(())
    }

    pub fn clear_table(&self) {
        self.state.lock().table_id = None;
    }

    pub fn customer(&self) -> CustomerInfo {
        self.state.lock().customer.clone()
    }

    pub fn set_customer_name(&self, name: impl Into<String>) {
        self.state.lock().customer.name = name.into();
    }

    pub fn set_customer_address(&self, address: impl Into<String>) {
        self.state.lock().customer.address = address.into();
    }

    /// Normalise and store phone input, returning what the field shows
    pub fn input_phone(&self, raw: &str) -> String {
        let phone = format_phone_input(raw);
        self.state.lock().customer.phone = phone.clone();
        phone
    }

    /// Validate the customer form for the current order type
    pub fn confirm_customer(&self) -> ClientResult<()> {
        let (customer, order_type) = {
            let state = self.state.lock();
            (state.customer.clone(), state.order_type)
        };
        customer.validate(order_type).map_err(|e| self.reject(e))?;
        self.ctx.notifier().info("Customer details saved");
        Ok(())
    }

    // ==================== Create / reorder ====================

    /// Validate the cart and form and create the order
    pub async fn submit_order(&self) -> ClientResult<Order> {
        let draft = {
            let state = self.state.lock();
            if let Some(session) = &state.edit {
                return Err(AppError::new(ErrorCode::CartLocked)
                    .with_detail("order_id", session.order_id())
                    .into());
            }
            OrderDraft {
                order_type: state.order_type,
                table_id: state.table_id,
                customer: state.customer.clone(),
                lines: state
                    .cart
                    .iter()
                    .map(|l| OrderLineInput {
                        product_id: l.product.id,
                        quantity: l.quantity,
                    })
                    .collect(),
            }
        };
        let body = draft.build().map_err(|e| self.reject(e))?;
        let _creating = self.flags.creating.try_begin().map_err(|e| self.reject(e))?;
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, "Create order");
            return Err(e);
        }

        tracing::info!(order_type = %body.order_type, lines = body.items.len(), "Creating order");
        match self.ctx.api().create_order(&body).await {
            Ok(order) => {
                let history_open = {
                    let mut state = self.state.lock();
                    state.reset_new_order();
                    state.history_open
                };
                self.ctx.notifier().success(format!("Order #{} created", order.id));
                self.ctx.cache().invalidate(&keys::tables());
                if history_open {
                    self.ctx.cache().invalidate(&keys::order_history());
                }
                Ok(order)
            }
            Err(e) => {
                let label = self.table_label(body.table_id);
                self.report_create_failure(&e, &label, false);
                Err(e)
            }
        }
    }

    fn busy_for_reorder(&self) -> bool {
        self.state.lock().edit.is_some()
            || self.flags.loading_edit.is_pending()
            || self.flags.saving.is_pending()
            || self.flags.reordering.is_pending()
            || self.flags.creating.is_pending()
    }

    /// Create a copy of a completed order
    pub async fn reorder(&self, order: &Order) -> ClientResult<Order> {
        if self.busy_for_reorder() {
            return Err(self.reject(AppError::with_message(
                ErrorCode::SystemBusy,
                "Finish the other actions first",
            )));
        }
        let body = OrderCreate::reorder_from(order).map_err(|e| self.reject(e))?;
        let _reordering = self.flags.reordering.try_begin().map_err(|e| self.reject(e))?;
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, "Reorder");
            return Err(e);
        }

        tracing::info!(order_id = order.id, "Reordering");
        match self.ctx.api().create_order(&body).await {
            Ok(created) => {
                {
                    let mut state = self.state.lock();
                    state.reset_new_order();
                    state.order_type = OrderType::DineIn;
                    state.finish_editing();
                    state.history_open = false;
                }
                self.ctx
                    .notifier()
                    .success(format!("Copy of order #{} created", order.id));
                self.ctx.cache().invalidate(&keys::tables());
                Ok(created)
            }
            Err(e) => {
                let label = order
                    .table_name()
                    .map(str::to_string)
                    .or_else(|| order.table_id.map(|id| id.to_string()))
                    .unwrap_or_default();
                self.report_create_failure(&e, &label, true);
                Err(e)
            }
        }
    }

    fn report_create_failure(
        &self,
        err: &ClientError,
        table_label: &str,
        table_field_refresh: bool,
    ) {
        if err.is_unauthorized() {
            self.ctx.handle_auth_failure();
            return;
        }
        let failure = describe_create_error(err, table_label);
        let table_field = err.body().and_then(|b| b.get("table_id")).is_some();
        if failure.table_occupied || (table_field_refresh && table_field) {
            self.ctx.cache().invalidate(&keys::tables());
        }
        tracing::error!(error = %err, "Order creation failed");
        self.ctx.notifier().error(format!("Error: {}", failure.message));
    }

    // ==================== History ====================

    pub fn is_history_open(&self) -> bool {
        self.state.lock().history_open
    }

    /// Open the history view and load it
    pub async fn open_history(&self) {
        self.state.lock().history_open = true;
        self.refresh_history().await;
    }

    pub fn close_history(&self) {
        self.state.lock().history_open = false;
    }

    pub async fn search_history(&self, term: impl Into<String>) {
        self.state.lock().history_search = term.into();
        self.refresh_history().await;
    }

    /// Cached history for the current search term
    pub fn history(&self) -> Arc<Vec<Order>> {
        let term = self.state.lock().history_search.clone();
        self.ctx
            .cache()
            .get::<Vec<Order>>(&keys::order_history_search(&term))
            .unwrap_or_default()
    }

    /// Refetch the history while the view is open
    pub async fn refresh_history(&self) {
        let (open, term) = {
            let state = self.state.lock();
            (state.history_open, state.history_search.clone())
        };
        if !open || !self.ctx.session().is_authenticated() {
            return;
        }
        let key = keys::order_history_search(&term);
        let api = self.ctx.api();
        let result = self
            .ctx
            .cache()
            .fetch(&key, || api.orders(Some(term.as_str())))
            .await;
        if let Err(e) = result {
            if e.is_unauthorized() {
                self.ctx.handle_auth_failure();
            } else {
                self.ctx.notifier().error(describe_load_error(&e));
            }
        }
    }

    // ==================== Edit session ====================

    pub fn editing_order_id(&self) -> Option<i64> {
        self.state.lock().edit.as_ref().map(EditSession::order_id)
    }

    pub fn edit_session(&self) -> Option<EditSession> {
        self.state.lock().edit.clone()
    }

    /// Error of the last failed edit load
    pub fn edit_error(&self) -> Option<String> {
        self.state.lock().edit_error.clone()
    }

    /// Error of the last failed save
    pub fn submit_error(&self) -> Option<String> {
        self.state.lock().submit_error.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.flags.saving.is_pending()
    }

    pub fn is_loading_edit(&self) -> bool {
        self.flags.loading_edit.is_pending()
    }

    /// Fetch an order fresh from the backend and start editing it
    ///
    /// Rejected while a save is running or while another order is being
    /// edited; the active session is left untouched.
    pub async fn begin_edit(&self, order_id: i64) -> ClientResult<()> {
        if self.flags.saving.is_pending() {
            return Err(self.reject(AppError::busy("load order for editing")));
        }
        if let Some(active) = self.editing_order_id() {
            return Err(self.reject(
                AppError::new(ErrorCode::EditSessionActive)
                    .with_detail("order_id", active)
                    .with_detail("requested", order_id),
            ));
        }
        let _loading = self
            .flags
            .loading_edit
            .try_begin()
            .map_err(|e| self.reject(e))?;
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, "Edit order");
            return Err(e);
        }
        self.state.lock().edit_error = None;

        tracing::info!(order_id, "Loading order for editing");
        let order = match self.ctx.api().order(order_id).await {
            Ok(order) => order,
            Err(e) => {
                let message = describe_edit_load_error(&e, order_id);
                {
                    let mut state = self.state.lock();
                    state.edit_error = Some(message.clone());
                    state.history_open = true;
                }
                if e.is_unauthorized() {
                    self.ctx.handle_auth_failure();
                } else {
                    self.ctx.notifier().error(message);
                }
                return Err(e);
            }
        };
        self.ctx
            .cache()
            .set(&keys::order_details(order_id), order.clone());

        let status_display = if order.status_display.is_empty() {
            order.status.to_string()
        } else {
            order.status_display.clone()
        };
        match EditSession::begin(order) {
            Ok(session) => {
                {
                    let mut state = self.state.lock();
                    state.cart.clear();
                    state.edit = Some(session);
                    state.history_open = false;
                }
                self.ctx
                    .notifier()
                    .success(format!("Order #{} loaded for editing", order_id));
                Ok(())
            }
            Err(e) => {
                self.state.lock().history_open = true;
                self.ctx.notifier().warning(format!(
                    "Order #{} ({}) cannot be edited in its current status",
                    order_id, status_display
                ));
                Err(e.into())
            }
        }
    }

    /// Change the quantity of a working line; ignored while saving
    pub fn edit_change_quantity(&self, product_id: i64, delta: i32) -> bool {
        if self.flags.saving.is_pending() {
            return false;
        }
        self.state
            .lock()
            .edit
            .as_mut()
            .map(|s| s.change_quantity(product_id, delta))
            .unwrap_or(false)
    }

    /// Add one unit of a product to the working copy
    pub fn edit_add_product(&self, product: &Product) -> bool {
        if self.flags.saving.is_pending() || self.flags.loading_edit.is_pending() {
            return false;
        }
        match self.state.lock().edit.as_mut() {
            Some(session) => {
                session.add_product(product);
                true
            }
            None => false,
        }
    }

    /// Discard the edit session
    pub fn cancel_edit(&self) -> ClientResult<()> {
        if self.flags.saving.is_pending() {
            return Err(self.reject(AppError::with_message(
                ErrorCode::SystemBusy,
                "Saving is in progress, editing cannot be cancelled",
            )));
        }
        let previous = self.state.lock().finish_editing();
        if let Some(order_id) = previous {
            self.ctx
                .notifier()
                .info(format!("Editing of order #{} cancelled", order_id));
        }
        Ok(())
    }

    /// Diff the working copy against the baseline and submit it
    ///
    /// A failed save keeps the session and stores the error message.
    pub async fn save_edit(&self) -> ClientResult<SaveOutcome> {
        let cannot_save = || {
            AppError::with_message(ErrorCode::SystemBusy, "Changes cannot be saved right now")
        };
        if self.flags.loading_edit.is_pending() {
            return Err(self.reject(cannot_save()));
        }
        let _saving = self
            .flags
            .saving
            .try_begin()
            .map_err(|_| self.reject(cannot_save()))?;

        let (order_id, plan) = {
            let mut state = self.state.lock();
            let Some(session) = state.edit.as_ref() else {
                drop(state);
                return Err(self.reject(AppError::new(ErrorCode::EditSessionMissing)));
            };
            let planned = (session.order_id(), session.plan());
            state.submit_error = None;
            planned
        };

        if !plan.skipped.is_empty() {
            self.ctx.notifier().warning(format!(
                "{} change(s) could not be sent because the order line has no id",
                plan.skipped.len()
            ));
        }
        if plan.is_noop() {
            self.ctx.notifier().info("No changes were made");
            self.state.lock().finish_editing();
            return Ok(SaveOutcome::NoChanges);
        }
        if let Err(e) = self.ctx.ensure_session() {
            self.ctx.report(&e, "Save order");
            return Err(e);
        }

        let request = plan.to_request();
        let operations = request.items_operations.len();
        tracing::info!(order_id, operations, "Saving order changes");

        match self.ctx.api().update_items(order_id, &request).await {
            Ok(_) => {
                self.state.lock().finish_editing();
                self.ctx
                    .notifier()
                    .success(format!("Order #{} updated", order_id));
                self.ctx.cache().invalidate(&keys::order_details(order_id));
                self.ctx.cache().invalidate(&keys::order_history());
                Ok(SaveOutcome::Saved {
                    order_id,
                    operations,
                })
            }
            Err(e) => {
                let message = describe_update_error(&e, &request);
                self.state.lock().submit_error = Some(message.clone());
                if e.is_unauthorized() {
                    self.ctx.handle_auth_failure();
                } else {
                    self.ctx.notifier().error(message);
                }
                Err(e)
            }
        }
    }

    // ==================== Order panel ====================

    /// Working copy while editing, the cart otherwise
    pub fn panel_items(&self) -> Vec<PanelLine> {
        let state = self.state.lock();
        match &state.edit {
            Some(session) => session.items().iter().map(PanelLine::from).collect(),
            None => state.cart.iter().map(PanelLine::from).collect(),
        }
    }

    /// Edit lines are priced from their unit price, cart lines from the
    /// product price
    pub fn panel_total(&self) -> Decimal {
        let state = self.state.lock();
        match &state.edit {
            Some(session) => session.total(),
            None => state.cart.iter().map(CartLine::line_total).sum(),
        }
    }
}

// ============================================================================
// Error messages
// ============================================================================

/// Operator message for a failed order creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFailure {
    pub message: String,
    /// The backend refused the table because it has an open order
    pub table_occupied: bool,
}

/// Map a failed `orders/` POST to a message
///
/// Checked in order: plain text body, `detail`, `customer_phone` errors,
/// occupied table, any other field errors, then the bare status.
pub fn describe_create_error(err: &ClientError, table_label: &str) -> CreateFailure {
    let plain = |message: String| CreateFailure {
        message,
        table_occupied: false,
    };
    let Some(body) = err.body().filter(|b| !b.is_null()) else {
        return plain(match err.status() {
            Some(status) => format!("Server error ({})", status.as_u16()),
            None => err.user_message(),
        });
    };

    if let Value::String(text) = body {
        return plain(text.clone());
    }
    if let Some(detail) = body.get("detail").and_then(Value::as_str) {
        return plain(detail.to_string());
    }
    if let Some(phone) = body.get("customer_phone").filter(|v| v.is_array()) {
        return plain(format!("Phone number: {}", render_value(phone, ", ")));
    }
    let occupied = body
        .get("table_id")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
        .is_some_and(|e| e.contains(TABLE_OCCUPIED_MARKER));
    if occupied {
        return CreateFailure {
            message: format!("Table {} is currently occupied", table_label),
            table_occupied: true,
        };
    }
    if let Some(joined) = join_field_errors(body, ":", ",", ";") {
        return plain(joined);
    }
    plain(match err.status() {
        Some(status) => format!("Server error ({})", status.as_u16()),
        None => err.user_message(),
    })
}

/// Map a failed `update-items` POST to a message
///
/// Per-operation validation errors name the failing operation by its
/// position and kind.
pub fn describe_update_error(err: &ClientError, request: &UpdateItemsRequest) -> String {
    match err {
        ClientError::BadRequest(body) => {
            if let Some(detail) = body.get("detail").and_then(Value::as_str) {
                return detail.to_string();
            }
            if let Some(op_errors) = body.get("items_operations").and_then(Value::as_array) {
                let lines: Vec<String> = op_errors
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, op_error)| {
                        let details = join_field_errors(op_error, ": ", ", ", "; ")?;
                        let kind = request
                            .items_operations
                            .get(idx)
                            .map(|op| op.kind().as_str())
                            .unwrap_or("unknown");
                        Some(format!("Operation {} ({}): {}", idx + 1, kind, details))
                    })
                    .collect();
                return if lines.is_empty() {
                    "Validation error (unknown)".to_string()
                } else {
                    format!("Operation errors: {}", lines.join(". "))
                };
            }
            join_field_errors(body, ": ", ", ", "; ")
                .unwrap_or_else(|| format!("Validation error: {}", body))
        }
        ClientError::Unauthorized => "Authorization error".to_string(),
        ClientError::Forbidden(_) => "Permission denied".to_string(),
        ClientError::NotFound(_) => "Order or requested item not found".to_string(),
        ClientError::Server { status, body } => {
            format!("Server error ({}): {}", status.as_u16(), body)
        }
        ClientError::Rejected(e) => e.message.clone(),
        other => format!("Connection error: {}", other.user_message()),
    }
}

/// Map a failed edit load to a message
pub fn describe_edit_load_error(err: &ClientError, order_id: i64) -> String {
    match err {
        ClientError::Unauthorized => "Authorization error".to_string(),
        ClientError::NotFound(_) => format!("Order ({}) not found", order_id),
        _ => describe_load_error(err),
    }
}

/// Message for a failed list load: the raw server body when there is one
fn describe_load_error(err: &ClientError) -> String {
    match err.body().filter(|b| !b.is_null()) {
        Some(body) => match server_message(body) {
            Some(message) => message.to_string(),
            None => format!("Server error: {}", body),
        },
        None => err.user_message(),
    }
}
