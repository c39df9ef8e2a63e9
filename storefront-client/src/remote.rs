//! Remote service contract
//!
//! [`RemoteStore`] is the authoritative source of truth for catalog, stock,
//! and orders. Every implementation may reject any operation at any time;
//! callers own the reconcile/rollback policy.

use async_trait::async_trait;
use serde::Deserialize;

use shared::models::{
    LoginResponse, Order, OrderItem, OrderStatus, Product, SalesOutlet, StockLine, User, UserRole,
};
use shared::request::{
    CreateOrderRequest, NewStockLine, OutletPayload, ProductPayload, RegisterRequest,
    UpdateOrderStatusRequest, UpdateUserRoleRequest,
};

use crate::{ClientConfig, ClientError, ClientResult, HttpClient};

/// Remote storefront service operations
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List all sales outlets
    async fn list_outlets(&self) -> ClientResult<Vec<SalesOutlet>>;

    /// List the whole catalog
    async fn list_products(&self) -> ClientResult<Vec<Product>>;

    /// List all stock lines of one outlet
    async fn list_stock_by_outlet(&self, outlet_id: &str) -> ClientResult<Vec<StockLine>>;

    /// Create an order, returning its id
    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<String>;

    /// List one user's orders
    async fn list_user_orders(&self, user_id: &str) -> ClientResult<Vec<Order>>;

    /// List every order (admin)
    async fn list_all_orders(&self) -> ClientResult<Vec<Order>>;

    /// Fetch the items of an order
    async fn get_order_items(&self, order_id: &str) -> ClientResult<Vec<OrderItem>>;

    /// Delete a single order item
    async fn delete_order_item(&self, item_id: &str) -> ClientResult<()>;

    /// Delete an order
    async fn delete_order(&self, order_id: &str) -> ClientResult<()>;

    /// Change an order's status (admin)
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()>;

    /// Add a stock line (admin)
    async fn add_stock_line(&self, line: &NewStockLine) -> ClientResult<()>;

    /// Set the quantity of a stock line (admin)
    async fn update_stock_amount(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        new_amount: i32,
    ) -> ClientResult<()>;

    /// Delete a stock line (admin)
    async fn delete_stock_line(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
    ) -> ClientResult<()>;

    /// Add a catalog product (admin)
    async fn add_product(&self, product: &ProductPayload) -> ClientResult<()>;

    /// Update a catalog product (admin)
    async fn update_product(&self, product_id: &str, product: &ProductPayload) -> ClientResult<()>;

    /// Delete a catalog product (admin)
    async fn delete_product(&self, product_id: &str) -> ClientResult<()>;

    /// Add a sales outlet (admin)
    async fn add_outlet(&self, outlet: &OutletPayload) -> ClientResult<()>;

    /// Update a sales outlet (admin)
    async fn update_outlet(&self, outlet_id: &str, outlet: &OutletPayload) -> ClientResult<()>;

    /// Delete a sales outlet (admin)
    async fn delete_outlet(&self, outlet_id: &str) -> ClientResult<()>;

    /// List all users (admin)
    async fn list_users(&self) -> ClientResult<Vec<User>>;

    /// Change a user's role (admin)
    async fn update_user_role(&self, user_id: &str, role: UserRole) -> ClientResult<()>;

    /// Delete a user (admin)
    async fn delete_user(&self, user_id: &str) -> ClientResult<()>;

    /// Authenticate, returning a token and the user record
    async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse>;

    /// Register a new user
    async fn register(&self, request: &RegisterRequest) -> ClientResult<()>;
}

/// Order-creation response payload
#[derive(Debug, Deserialize)]
struct CreatedOrder {
    order_id: String,
}

/// [`RemoteStore`] over HTTP
#[derive(Debug)]
pub struct HttpRemote {
    http: parking_lot::RwLock<HttpClient>,
}

impl HttpRemote {
    /// Create an HTTP remote from configuration
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: parking_lot::RwLock::new(HttpClient::new(config)),
        }
    }

    /// Replace the bearer token (set after login, cleared on logout)
    pub fn set_token(&self, token: Option<String>) {
        let mut http = self.http.write();
        *http = match token {
            Some(token) => http.clone().with_token(token),
            None => http.clone().without_token(),
        };
    }

    /// Current bearer token
    pub fn token(&self) -> Option<String> {
        self.http.read().token().map(str::to_string)
    }

    /// Snapshot of the underlying client for one call
    fn client(&self) -> HttpClient {
        self.http.read().clone()
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn list_outlets(&self) -> ClientResult<Vec<SalesOutlet>> {
        self.client().get("outlet/list").await
    }

    async fn list_products(&self) -> ClientResult<Vec<Product>> {
        self.client().get("product/list").await
    }

    async fn list_stock_by_outlet(&self, outlet_id: &str) -> ClientResult<Vec<StockLine>> {
        self.client().get(&format!("products/outlet/{}", outlet_id)).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<String> {
        let created: CreatedOrder = self.client().post("api/v1/order", request).await?;
        if created.order_id.is_empty() {
            return Err(ClientError::InvalidResponse(
                "missing order id in creation response".to_string(),
            ));
        }
        Ok(created.order_id)
    }

    async fn list_user_orders(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        self.client().get(&format!("api/v1/users/{}/orders", user_id)).await
    }

    async fn list_all_orders(&self) -> ClientResult<Vec<Order>> {
        self.client().get("api/v1/orders/list").await
    }

    async fn get_order_items(&self, order_id: &str) -> ClientResult<Vec<OrderItem>> {
        self.client().get(&format!("api/v1/orders/{}", order_id)).await
    }

    async fn delete_order_item(&self, item_id: &str) -> ClientResult<()> {
        self.client().delete_unit(&format!("api/v1/order-items/{}", item_id)).await
    }

    async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        self.client().delete_unit(&format!("api/v1/order/{}", order_id)).await
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        let body = UpdateOrderStatusRequest { status };
        self.client()
            .patch_unit(&format!("api/v1/order/{}/status", order_id), &body)
            .await
    }

    async fn add_stock_line(&self, line: &NewStockLine) -> ClientResult<()> {
        self.client().post_unit_body("api/v1/stock/add", line).await
    }

    async fn update_stock_amount(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        new_amount: i32,
    ) -> ClientResult<()> {
        self.client()
            .post_unit(&format!(
                "api/v1/stock/update/{}/{}/{}/{}",
                outlet_id, product_id, new_amount, size
            ))
            .await
    }

    async fn delete_stock_line(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
    ) -> ClientResult<()> {
        self.client()
            .delete_unit(&format!(
                "api/v1/stock/delete/{}/{}/{}",
                outlet_id, product_id, size
            ))
            .await
    }

    async fn add_product(&self, product: &ProductPayload) -> ClientResult<()> {
        self.client().post_unit_body("api/v1/product/add", product).await
    }

    async fn update_product(&self, product_id: &str, product: &ProductPayload) -> ClientResult<()> {
        self.client()
            .post_unit_body(&format!("api/v1/product/update/{}", product_id), product)
            .await
    }

    async fn delete_product(&self, product_id: &str) -> ClientResult<()> {
        self.client()
            .delete_unit(&format!("api/v1/product/delete/{}", product_id))
            .await
    }

    async fn add_outlet(&self, outlet: &OutletPayload) -> ClientResult<()> {
        self.client().post_unit_body("api/v1/outlet/add", outlet).await
    }

    async fn update_outlet(&self, outlet_id: &str, outlet: &OutletPayload) -> ClientResult<()> {
        self.client()
            .post_unit_body(&format!("api/v1/outlet/update/{}", outlet_id), outlet)
            .await
    }

    async fn delete_outlet(&self, outlet_id: &str) -> ClientResult<()> {
        self.client()
            .delete_unit(&format!("api/v1/outlet/delete/{}", outlet_id))
            .await
    }

    async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.client().get("api/v1/users").await
    }

    async fn update_user_role(&self, user_id: &str, role: UserRole) -> ClientResult<()> {
        let body = UpdateUserRoleRequest { role };
        self.client()
            .patch_unit(&format!("api/v1/users/{}/role", user_id), &body)
            .await
    }

    async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        self.client().delete_unit(&format!("api/v1/users/{}", user_id)).await
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = shared::request::LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.client().post("api/v1/auth/login", &body).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<()> {
        self.client().post_unit_body("api/v1/auth/register", request).await
    }
}
