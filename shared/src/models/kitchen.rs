//! Kitchen change-log Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unacknowledged change to an order the kitchen has to notice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationLog {
    pub id: i64,
    pub order_id: i64,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub change_type_display: String,
    #[serde(default)]
    pub quantity_change: Option<i32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// `kitchen/acknowledge-changes/` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcknowledgeRequest {
    pub log_ids: Vec<i64>,
}
