//! Order Model

use serde::{Deserialize, Serialize};

/// Order status
///
/// The only permitted transitions are `Ordered -> Delivered` and
/// `Ordered -> Cancelled`, both administrator actions. Deletion of the
/// order record itself is a separate operation and is only allowed while
/// the order is still `Ordered`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Ordered,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether an administrator may move an order from `self` to `next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Ordered, OrderStatus::Delivered)
                | (OrderStatus::Ordered, OrderStatus::Cancelled)
        )
    }

    /// Whether the order record may still be deleted outright
    pub fn is_deletable(&self) -> bool {
        matches!(self, OrderStatus::Ordered)
    }
}

/// Order entity (booking of one or more items at one outlet)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub sales_outlet_id: String,
    pub created_at: String,
    #[serde(rename = "status_name")]
    pub status: OrderStatus,
}

/// Order item (child of exactly one order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_image: Option<String>,
    pub amount: i32,
    /// Price in currency unit, captured at booking time
    pub price: f64,
    pub size: i32,
}
