//! Stock Model

use serde::{Deserialize, Serialize};

use super::product::Product;

/// Size value used for products that come in a single, unsized variant
pub const UNSIZED: i32 = 0;

/// One product/size quantity at one outlet
///
/// Uniquely identified by `(sales_outlet_id, product.id, size)`.
/// Invariant: `amount >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLine {
    pub sales_outlet_id: String,
    pub product: Product,
    pub size: i32,
    pub amount: i32,
}

impl StockLine {
    /// Whether this line identifies the given product/size
    pub fn matches(&self, product_id: &str, size: i32) -> bool {
        self.product.id == product_id && self.size == size
    }
}

/// Per-size availability, derived from a stock line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeAvailability {
    pub size: i32,
    pub amount: i32,
    pub available: bool,
}

/// Product enriched with its stock lines at one outlet (derived, not persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAvailability {
    pub product: Product,
    pub sizes: Vec<SizeAvailability>,
    pub total_stock: i32,
}

impl ProductAvailability {
    /// Whether the product carries real sizes (anything besides the unsized marker)
    pub fn is_sized(&self) -> bool {
        self.sizes.iter().any(|s| s.size != UNSIZED)
    }

    /// Availability entry for a specific size
    pub fn size(&self, size: i32) -> Option<&SizeAvailability> {
        self.sizes.iter().find(|s| s.size == size)
    }
}
