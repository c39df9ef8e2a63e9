//! Request payload types
//!
//! Bodies sent to the remote service. Field names follow the service's
//! JSON contract.

use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// One item of an order-creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "Amount")]
    pub amount: i32,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Size")]
    pub size: i32,
}

/// Order-creation request (a booking carries exactly one item)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "SalesOutletID")]
    pub sales_outlet_id: String,
    #[serde(rename = "OrderItems")]
    pub order_items: Vec<OrderItemRequest>,
}

/// New stock line (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockLine {
    pub sales_outlet_id: String,
    pub product_id: String,
    pub size: i32,
    pub amount: i32,
}

/// Order status change (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// New or updated product (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// New or updated outlet (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutletPayload {
    pub address: String,
}

/// Role change (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: crate::models::UserRole,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
