//! In-memory remote store
//!
//! A [`RemoteStore`] backed by process-local state, used by the test
//! suites and for offline development. Supports one-shot failure
//! injection, per-operation call counting, and a gate that holds
//! order-creation calls in flight so interleavings can be exercised
//! deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use shared::models::{
    LoginResponse, Order, OrderItem, OrderStatus, Product, SalesOutlet, StockLine, User, UserRole,
};
use shared::request::{
    CreateOrderRequest, NewStockLine, OutletPayload, ProductPayload, RegisterRequest,
};

use crate::error::{ClientError, ClientResult};
use crate::remote::RemoteStore;

/// Remote operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    ListOutlets,
    ListProducts,
    ListStock,
    CreateOrder,
    ListUserOrders,
    ListAllOrders,
    GetOrderItems,
    DeleteOrderItem,
    DeleteOrder,
    UpdateOrderStatus,
    AddStockLine,
    UpdateStockAmount,
    DeleteStockLine,
    AddProduct,
    UpdateProduct,
    DeleteProduct,
    AddOutlet,
    UpdateOutlet,
    DeleteOutlet,
    ListUsers,
    UpdateUserRole,
    DeleteUser,
    Login,
    Register,
}

#[derive(Debug, Clone)]
struct StockRecord {
    outlet_id: String,
    product_id: String,
    size: i32,
    amount: i32,
}

#[derive(Default)]
struct MemoryInner {
    outlets: Vec<SalesOutlet>,
    products: Vec<Product>,
    stock: Vec<StockRecord>,
    orders: HashMap<String, Order>,
    items: Vec<OrderItem>,
    /// (user, password, token)
    users: Vec<(User, String, String)>,
    calls: HashMap<RemoteOp, usize>,
    fail_next: HashSet<RemoteOp>,
    next_order: u32,
    next_item: u32,
    next_user: u32,
    next_product: u32,
    next_outlet: u32,
    create_order_gate: Option<Arc<tokio::sync::Mutex<()>>>,
}

/// In-memory [`RemoteStore`]
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    pub fn seed_outlet(&self, id: &str, address: &str) {
        self.inner.lock().outlets.push(SalesOutlet {
            id: id.to_string(),
            address: address.to_string(),
        });
    }

    pub fn seed_product(&self, id: &str, name: &str, price: f64) {
        self.inner.lock().products.push(Product {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            price,
            image: None,
        });
    }

    pub fn seed_stock(&self, outlet_id: &str, product_id: &str, size: i32, amount: i32) {
        self.inner.lock().stock.push(StockRecord {
            outlet_id: outlet_id.to_string(),
            product_id: product_id.to_string(),
            size,
            amount,
        });
    }

    pub fn seed_user(&self, user: User, password: &str, token: &str) {
        self.inner
            .lock()
            .users
            .push((user, password.to_string(), token.to_string()));
    }

    /// Seed an order of `amount = 1` items, returning the order id
    pub fn seed_order(&self, user_id: &str, outlet_id: &str, items: &[(&str, i32)]) -> String {
        let mut inner = self.inner.lock();
        inner.next_order += 1;
        let order_id = format!("ORD{}", inner.next_order);
        inner.orders.insert(
            order_id.clone(),
            Order {
                id: order_id.clone(),
                user_id: user_id.to_string(),
                sales_outlet_id: outlet_id.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
                status: OrderStatus::Ordered,
            },
        );
        for (product_id, size) in items {
            inner.next_item += 1;
            let id = format!("ITM{}", inner.next_item);
            let (price, name) = inner
                .products
                .iter()
                .find(|p| p.id == *product_id)
                .map(|p| (p.price, Some(p.name.clone())))
                .unwrap_or((0.0, None));
            inner.items.push(OrderItem {
                id,
                order_id: order_id.clone(),
                product_id: product_id.to_string(),
                product_name: name,
                product_image: None,
                amount: 1,
                price,
                size: *size,
            });
        }
        order_id
    }

    // ========== Test controls ==========

    /// Make the next call of `op` fail with an injected internal error
    pub fn fail_next(&self, op: RemoteOp) {
        self.inner.lock().fail_next.insert(op);
    }

    /// Number of times `op` reached this remote
    pub fn calls(&self, op: RemoteOp) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Install a gate that order-creation calls must pass
    ///
    /// Lock the returned mutex to hold subsequent `create_order` calls in
    /// flight; drop the guard to let them proceed.
    pub fn install_create_order_gate(&self) -> Arc<tokio::sync::Mutex<()>> {
        let gate = Arc::new(tokio::sync::Mutex::new(()));
        self.inner.lock().create_order_gate = Some(gate.clone());
        gate
    }

    // ========== Direct state inspection ==========

    pub fn stock_amount(&self, outlet_id: &str, product_id: &str, size: i32) -> Option<i32> {
        self.inner
            .lock()
            .stock
            .iter()
            .find(|r| r.outlet_id == outlet_id && r.product_id == product_id && r.size == size)
            .map(|r| r.amount)
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.inner.lock().orders.get(order_id).cloned()
    }

    pub fn order_items_of(&self, order_id: &str) -> Vec<OrderItem> {
        self.inner
            .lock()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) {
        if let Some(order) = self.inner.lock().orders.get_mut(order_id) {
            order.status = status;
        }
    }

    /// Remove an order and its items without counting as a delete call
    pub fn drop_order(&self, order_id: &str) {
        let mut inner = self.inner.lock();
        inner.orders.remove(order_id);
        inner.items.retain(|i| i.order_id != order_id);
    }

    // ========== Internal ==========

    /// Count the call and honor one-shot failure injection
    fn begin(&self, op: RemoteOp) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(op).or_insert(0) += 1;
        if inner.fail_next.remove(&op) {
            return Err(ClientError::Internal(format!("injected failure: {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list_outlets(&self) -> ClientResult<Vec<SalesOutlet>> {
        self.begin(RemoteOp::ListOutlets)?;
        Ok(self.inner.lock().outlets.clone())
    }

    async fn list_products(&self) -> ClientResult<Vec<Product>> {
        self.begin(RemoteOp::ListProducts)?;
        Ok(self.inner.lock().products.clone())
    }

    async fn list_stock_by_outlet(&self, outlet_id: &str) -> ClientResult<Vec<StockLine>> {
        self.begin(RemoteOp::ListStock)?;
        let inner = self.inner.lock();
        let mut lines = Vec::new();
        for record in inner.stock.iter().filter(|r| r.outlet_id == outlet_id) {
            let product = inner
                .products
                .iter()
                .find(|p| p.id == record.product_id)
                .cloned()
                .ok_or_else(|| {
                    ClientError::Internal(format!("stock references unknown product {}", record.product_id))
                })?;
            lines.push(StockLine {
                sales_outlet_id: record.outlet_id.clone(),
                product,
                size: record.size,
                amount: record.amount,
            });
        }
        Ok(lines)
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<String> {
        self.begin(RemoteOp::CreateOrder)?;

        let gate = self.inner.lock().create_order_gate.clone();
        if let Some(gate) = gate {
            let _held = gate.lock().await;
        }

        let mut inner = self.inner.lock();

        // Reserve stock first; the whole order is rejected when any line
        // cannot cover it
        for item in &request.order_items {
            let record = inner.stock.iter().find(|r| {
                r.outlet_id == request.sales_outlet_id
                    && r.product_id == item.product_id
                    && r.size == item.size
            });
            match record {
                Some(r) if r.amount >= item.amount => {}
                Some(_) => {
                    return Err(ClientError::Validation(format!(
                        "insufficient stock for product {} size {}",
                        item.product_id, item.size
                    )));
                }
                None => {
                    return Err(ClientError::NotFound(format!(
                        "no stock line for product {} size {}",
                        item.product_id, item.size
                    )));
                }
            }
        }
        for item in &request.order_items {
            if let Some(r) = inner.stock.iter_mut().find(|r| {
                r.outlet_id == request.sales_outlet_id
                    && r.product_id == item.product_id
                    && r.size == item.size
            }) {
                r.amount -= item.amount;
            }
        }

        inner.next_order += 1;
        let order_id = format!("ORD{}", inner.next_order);
        inner.orders.insert(
            order_id.clone(),
            Order {
                id: order_id.clone(),
                user_id: request.user_id.clone(),
                sales_outlet_id: request.sales_outlet_id.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
                status: OrderStatus::Ordered,
            },
        );
        for item in &request.order_items {
            inner.next_item += 1;
            let id = format!("ITM{}", inner.next_item);
            let name = inner
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| p.name.clone());
            inner.items.push(OrderItem {
                id,
                order_id: order_id.clone(),
                product_id: item.product_id.clone(),
                product_name: name,
                product_image: None,
                amount: item.amount,
                price: item.price,
                size: item.size,
            });
        }
        Ok(order_id)
    }

    async fn list_user_orders(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        self.begin(RemoteOp::ListUserOrders)?;
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all_orders(&self) -> ClientResult<Vec<Order>> {
        self.begin(RemoteOp::ListAllOrders)?;
        Ok(self.inner.lock().orders.values().cloned().collect())
    }

    async fn get_order_items(&self, order_id: &str) -> ClientResult<Vec<OrderItem>> {
        self.begin(RemoteOp::GetOrderItems)?;
        let inner = self.inner.lock();
        if !inner.orders.contains_key(order_id) {
            return Err(ClientError::NotFound(format!("order {}", order_id)));
        }
        Ok(inner
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn delete_order_item(&self, item_id: &str) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteOrderItem)?;
        let mut inner = self.inner.lock();
        let before = inner.items.len();
        inner.items.retain(|i| i.id != item_id);
        if inner.items.len() == before {
            return Err(ClientError::NotFound(format!("order item {}", item_id)));
        }
        Ok(())
    }

    async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteOrder)?;
        let mut inner = self.inner.lock();
        if inner.orders.remove(order_id).is_none() {
            return Err(ClientError::NotFound(format!("order {}", order_id)));
        }
        inner.items.retain(|i| i.order_id != order_id);
        Ok(())
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        self.begin(RemoteOp::UpdateOrderStatus)?;
        let mut inner = self.inner.lock();
        match inner.orders.get_mut(order_id) {
            Some(order) => {
                order.status = status;
                Ok(())
            }
            None => Err(ClientError::NotFound(format!("order {}", order_id))),
        }
    }

    async fn add_stock_line(&self, line: &NewStockLine) -> ClientResult<()> {
        self.begin(RemoteOp::AddStockLine)?;
        let mut inner = self.inner.lock();
        if !inner.products.iter().any(|p| p.id == line.product_id) {
            return Err(ClientError::NotFound(format!("product {}", line.product_id)));
        }
        if inner.stock.iter().any(|r| {
            r.outlet_id == line.sales_outlet_id
                && r.product_id == line.product_id
                && r.size == line.size
        }) {
            return Err(ClientError::Conflict(format!(
                "stock line exists for product {} size {}",
                line.product_id, line.size
            )));
        }
        inner.stock.push(StockRecord {
            outlet_id: line.sales_outlet_id.clone(),
            product_id: line.product_id.clone(),
            size: line.size,
            amount: line.amount,
        });
        Ok(())
    }

    async fn update_stock_amount(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        new_amount: i32,
    ) -> ClientResult<()> {
        self.begin(RemoteOp::UpdateStockAmount)?;
        let mut inner = self.inner.lock();
        match inner.stock.iter_mut().find(|r| {
            r.outlet_id == outlet_id && r.product_id == product_id && r.size == size
        }) {
            Some(record) => {
                record.amount = new_amount;
                Ok(())
            }
            None => Err(ClientError::NotFound(format!(
                "stock line {}/{}/{}",
                outlet_id, product_id, size
            ))),
        }
    }

    async fn delete_stock_line(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
    ) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteStockLine)?;
        let mut inner = self.inner.lock();
        let before = inner.stock.len();
        inner
            .stock
            .retain(|r| !(r.outlet_id == outlet_id && r.product_id == product_id && r.size == size));
        if inner.stock.len() == before {
            return Err(ClientError::NotFound(format!(
                "stock line {}/{}/{}",
                outlet_id, product_id, size
            )));
        }
        Ok(())
    }

    async fn add_product(&self, product: &ProductPayload) -> ClientResult<()> {
        self.begin(RemoteOp::AddProduct)?;
        let mut inner = self.inner.lock();
        inner.next_product += 1;
        let id = format!("P{}", 100 + inner.next_product);
        inner.products.push(Product {
            id: id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image: product.image_path.clone().map(|path| {
                shared::models::ProductImage {
                    id: format!("IMG{}", id),
                    product_id: id.clone(),
                    image_path: path,
                }
            }),
        });
        Ok(())
    }

    async fn update_product(&self, product_id: &str, product: &ProductPayload) -> ClientResult<()> {
        self.begin(RemoteOp::UpdateProduct)?;
        let mut inner = self.inner.lock();
        match inner.products.iter_mut().find(|p| p.id == product_id) {
            Some(existing) => {
                existing.name = product.name.clone();
                existing.description = product.description.clone();
                existing.price = product.price;
                Ok(())
            }
            None => Err(ClientError::NotFound(format!("product {}", product_id))),
        }
    }

    async fn delete_product(&self, product_id: &str) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteProduct)?;
        let mut inner = self.inner.lock();
        let before = inner.products.len();
        inner.products.retain(|p| p.id != product_id);
        if inner.products.len() == before {
            return Err(ClientError::NotFound(format!("product {}", product_id)));
        }
        inner.stock.retain(|r| r.product_id != product_id);
        Ok(())
    }

    async fn add_outlet(&self, outlet: &OutletPayload) -> ClientResult<()> {
        self.begin(RemoteOp::AddOutlet)?;
        let mut inner = self.inner.lock();
        inner.next_outlet += 1;
        let id = format!("O{}", 100 + inner.next_outlet);
        inner.outlets.push(SalesOutlet {
            id,
            address: outlet.address.clone(),
        });
        Ok(())
    }

    async fn update_outlet(&self, outlet_id: &str, outlet: &OutletPayload) -> ClientResult<()> {
        self.begin(RemoteOp::UpdateOutlet)?;
        let mut inner = self.inner.lock();
        match inner.outlets.iter_mut().find(|o| o.id == outlet_id) {
            Some(existing) => {
                existing.address = outlet.address.clone();
                Ok(())
            }
            None => Err(ClientError::NotFound(format!("outlet {}", outlet_id))),
        }
    }

    async fn delete_outlet(&self, outlet_id: &str) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteOutlet)?;
        let mut inner = self.inner.lock();
        let before = inner.outlets.len();
        inner.outlets.retain(|o| o.id != outlet_id);
        if inner.outlets.len() == before {
            return Err(ClientError::NotFound(format!("outlet {}", outlet_id)));
        }
        inner.stock.retain(|r| r.outlet_id != outlet_id);
        Ok(())
    }

    async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.begin(RemoteOp::ListUsers)?;
        Ok(self
            .inner
            .lock()
            .users
            .iter()
            .map(|(user, _, _)| user.clone())
            .collect())
    }

    async fn update_user_role(&self, user_id: &str, role: UserRole) -> ClientResult<()> {
        self.begin(RemoteOp::UpdateUserRole)?;
        let mut inner = self.inner.lock();
        match inner.users.iter_mut().find(|(u, _, _)| u.id == user_id) {
            Some((user, _, _)) => {
                user.role = role;
                Ok(())
            }
            None => Err(ClientError::NotFound(format!("user {}", user_id))),
        }
    }

    async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        self.begin(RemoteOp::DeleteUser)?;
        let mut inner = self.inner.lock();
        let before = inner.users.len();
        inner.users.retain(|(u, _, _)| u.id != user_id);
        if inner.users.len() == before {
            return Err(ClientError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        self.begin(RemoteOp::Login)?;
        let inner = self.inner.lock();
        inner
            .users
            .iter()
            .find(|(user, pw, _)| user.email == email && pw == password)
            .map(|(user, _, token)| LoginResponse {
                token: token.clone(),
                user: user.clone(),
            })
            .ok_or(ClientError::Unauthorized)
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<()> {
        self.begin(RemoteOp::Register)?;
        let mut inner = self.inner.lock();
        if inner.users.iter().any(|(u, _, _)| u.email == request.email) {
            return Err(ClientError::Conflict(format!(
                "email {} already registered",
                request.email
            )));
        }
        inner.next_user += 1;
        let id = format!("U{}", 100 + inner.next_user);
        let user = User {
            id,
            name: request.name.clone(),
            surname: request.surname.clone(),
            email: request.email.clone(),
            role: UserRole::User,
            phone: request.phone.clone(),
            default_outlet_id: None,
        };
        inner.users.push((user, request.password.clone(), String::new()));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryRemote")
            .field("outlets", &inner.outlets.len())
            .field("products", &inner.products.len())
            .field("stock", &inner.stock.len())
            .field("orders", &inner.orders.len())
            .finish()
    }
}
