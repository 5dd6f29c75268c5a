//! Product and Category Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Category reference (embedded, may be missing)
    #[serde(default)]
    pub category: Option<Category>,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.id)
    }

    /// Active product whose name contains `search` (case-insensitive) and
    /// which belongs to `category` when one is given
    pub fn matches(&self, search: &str, category: Option<i64>) -> bool {
        if !self.is_active {
            return false;
        }
        let name_match = self.name.to_lowercase().contains(&search.to_lowercase());
        let category_match = category.is_none() || self.category_id() == category;
        name_match && category_match
    }
}
