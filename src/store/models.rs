//! Inventory entity types
//!
//! Field names serialize camelCase to stay byte-compatible with the JSON
//! documents the previous frontend wrote.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: Uuid,
    pub part_no: String,
    pub brand: String,
    /// Unit of measure
    pub uom: String,
    pub cost: Option<f64>,
    pub price: Option<f64>,
    pub stock: i64,
}

/// A bundle of parts sold as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kit {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub items_count: i64,
    pub total_cost: f64,
    pub price: f64,
}

/// Supplier status value meaning "counts toward active suppliers".
/// Comparison is exact and case-sensitive; any other value is inactive
/// for aggregation purposes.
pub const SUPPLIER_STATUS_ACTIVE: &str = "active";

/// A supplier company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub code: String,
    pub company_name: String,
    /// Free-form status string; old documents may carry values beyond
    /// "active"/"inactive", so this is not an enum
    pub status: String,
}

impl Supplier {
    pub fn is_active(&self) -> bool {
        self.status == SUPPLIER_STATUS_ACTIVE
    }
}

/// A part category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}
