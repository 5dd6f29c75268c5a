//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Zone label used for tables without a zone
pub const NO_ZONE: &str = "N/A";

/// Zone filter value that matches every table
pub const ALL_ZONES: &str = "all";

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl DiningTable {
    /// Zone label, `N/A` when missing or empty
    pub fn zone_label(&self) -> &str {
        match self.zone.as_deref() {
            Some(z) if !z.is_empty() => z,
            _ => NO_ZONE,
        }
    }

    pub fn in_zone(&self, zone: &str) -> bool {
        zone == ALL_ZONES || self.zone_label() == zone
    }
}

/// Leading integer of a zone label, the way a lenient number parser reads it
fn leading_number(zone: &str) -> Option<i64> {
    let trimmed = zone.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Distinct zone labels for the zone filter
///
/// `all` comes first, numeric zones follow in ascending order, then the
/// remaining zones alphabetically, and `N/A` last.
pub fn sorted_zones(tables: &[DiningTable]) -> Vec<String> {
    let mut zones: Vec<&str> = tables.iter().map(DiningTable::zone_label).collect();
    zones.sort_unstable();
    zones.dedup();

    zones.sort_by(|a, b| {
        use std::cmp::Ordering;
        match (*a == NO_ZONE, *b == NO_ZONE) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        match (leading_number(a), leading_number(b)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
        }
    });

    std::iter::once(ALL_ZONES.to_string())
        .chain(zones.into_iter().map(str::to_string))
        .collect()
}
