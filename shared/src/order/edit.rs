//! Order edit session and item diff
//!
//! An edit session keeps two copies of an order's lines: the baseline as
//! fetched from the backend and a working copy the operator mutates. Saving
//! turns the difference into the minimal list of [`ItemOperation`]s.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult, ErrorCode};
use crate::models::{Order, OrderItem, Product, ProductDetails};

// ============================================================================
// Operations
// ============================================================================

/// Single line change understood by `update-items`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ItemOperation {
    /// New line for a product the order did not contain
    Add { product_id: i64, quantity: u32 },
    /// New quantity for an existing line
    Set { order_item_id: i64, quantity: u32 },
    /// Drop an existing line
    Remove { order_item_id: i64 },
}

impl ItemOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Add { .. } => OperationKind::Add,
            Self::Set { .. } => OperationKind::Set,
            Self::Remove { .. } => OperationKind::Remove,
        }
    }
}

/// Operation tag without payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Set,
    Remove,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

/// `orders/{id}/update-items/` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateItemsRequest {
    pub items_operations: Vec<ItemOperation>,
}

/// Operation that could not be built because the baseline line had no id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedOperation {
    pub kind: OperationKind,
    pub product_id: i64,
}

/// Result of diffing a baseline against a working copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub operations: Vec<ItemOperation>,
    pub skipped: Vec<SkippedOperation>,
}

impl EditPlan {
    /// Nothing to send
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_request(&self) -> UpdateItemsRequest {
        UpdateItemsRequest {
            items_operations: self.operations.clone(),
        }
    }
}

/// Diff baseline lines against the working copy
///
/// Working lines carrying a server id are paired with the baseline line of
/// that id. Remaining working lines take the first unpaired baseline line of
/// the same product. Paired lines with a different quantity yield `set`,
/// unpaired baseline lines yield `remove`, both in baseline order. Unpaired
/// working lines yield `add` in working-copy order, after the baseline-keyed
/// operations. A baseline line without a server id cannot be addressed; its
/// operation is logged and reported in [`EditPlan::skipped`] instead of
/// being sent.
pub fn diff_items(original: &[OrderItem], current: &[OrderItem]) -> EditPlan {
    let baseline_ids: HashMap<i64, usize> = original
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| item.id.map(|id| (id, idx)))
        .collect();

    // pairing[baseline index] = working index
    let mut pairing: Vec<Option<usize>> = vec![None; original.len()];
    let mut unpaired = Vec::new();
    for (cur_idx, item) in current.iter().enumerate() {
        match item.id.and_then(|id| baseline_ids.get(&id)) {
            Some(&base_idx) if pairing[base_idx].is_none() => pairing[base_idx] = Some(cur_idx),
            _ => unpaired.push(cur_idx),
        }
    }
    let mut added = Vec::new();
    for cur_idx in unpaired {
        let product = current[cur_idx].product;
        let free = (0..original.len())
            .find(|&base_idx| pairing[base_idx].is_none() && original[base_idx].product == product);
        match free {
            Some(base_idx) => pairing[base_idx] = Some(cur_idx),
            None => added.push(cur_idx),
        }
    }

    let mut plan = EditPlan::default();

    for (base, paired) in original.iter().zip(&pairing) {
        let wanted = match paired.map(|idx| current[idx].quantity) {
            Some(quantity) if quantity == base.quantity => continue,
            other => other,
        };
        let kind = if wanted.is_some() {
            OperationKind::Set
        } else {
            OperationKind::Remove
        };

        let Some(order_item_id) = base.id else {
            tracing::warn!(
                product_id = base.product,
                operation = kind.as_str(),
                "Baseline item has no id, operation skipped"
            );
            plan.skipped.push(SkippedOperation {
                kind,
                product_id: base.product,
            });
            continue;
        };

        plan.operations.push(match wanted {
            Some(quantity) => ItemOperation::Set {
                order_item_id,
                quantity,
            },
            None => ItemOperation::Remove { order_item_id },
        });
    }

    for idx in added {
        let item = &current[idx];
        plan.operations.push(ItemOperation::Add {
            product_id: item.product,
            quantity: item.quantity,
        });
    }

    plan
}

// ============================================================================
// Edit session
// ============================================================================

/// Working buffer for one order being edited
#[derive(Debug, Clone)]
pub struct EditSession {
    order: Order,
    original: Vec<OrderItem>,
    working: Vec<OrderItem>,
}

impl EditSession {
    /// Start editing a freshly fetched order
    ///
    /// Completed and cancelled orders are rejected.
    pub fn begin(order: Order) -> AppResult<Self> {
        if !order.is_editable() {
            return Err(AppError::new(ErrorCode::OrderNotEditable)
                .with_detail("order_id", order.id)
                .with_detail("status", order.status.as_str()));
        }
        let original = order.items.clone();
        let working = order.items.clone();
        Ok(Self {
            order,
            original,
            working,
        })
    }

    pub fn order_id(&self) -> i64 {
        self.order.id
    }

    /// Order snapshot taken when the session started
    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Baseline lines, never mutated
    pub fn original(&self) -> &[OrderItem] {
        &self.original
    }

    /// Working lines
    pub fn items(&self) -> &[OrderItem] {
        &self.working
    }

    /// Adjust the quantity of `product_id` by `delta`
    ///
    /// With several lines for the product, increments go to the first line
    /// and decrements come off the last one. A line is dropped when its
    /// quantity reaches zero. Returns `false` when the working copy has no
    /// line for the product.
    pub fn change_quantity(&mut self, product_id: i64, delta: i32) -> bool {
        let mut lines = self.working.iter().enumerate().filter(|(_, i)| i.product == product_id);
        let found = if delta < 0 {
            lines.next_back()
        } else {
            lines.next()
        };
        let Some((idx, _)) = found else {
            return false;
        };
        let next = i64::from(self.working[idx].quantity) + i64::from(delta);
        if next <= 0 {
            self.working.remove(idx);
        } else {
            let item = &mut self.working[idx];
            item.quantity = u32::try_from(next).unwrap_or(u32::MAX);
            item.total_price = item.line_total();
        }
        true
    }

    /// Add one unit of `product`, appending a new line if needed
    pub fn add_product(&mut self, product: &Product) {
        if let Some(item) = self.working.iter_mut().find(|i| i.product == product.id) {
            item.quantity = item.quantity.saturating_add(1);
            item.total_price = item.line_total();
            return;
        }
        self.working.push(OrderItem {
            id: None,
            product: product.id,
            product_details: Some(ProductDetails {
                id: Some(product.id),
                name: product.name.clone(),
                image_url: product.image.clone(),
            }),
            quantity: 1,
            unit_price: product.price,
            total_price: product.price,
        });
    }

    /// Working copy total, priced per line from its unit price
    pub fn total(&self) -> Decimal {
        self.working.iter().map(OrderItem::line_total).sum()
    }

    pub fn plan(&self) -> EditPlan {
        diff_items(&self.original, &self.working)
    }
}
