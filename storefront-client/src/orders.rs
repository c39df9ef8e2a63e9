//! Order desk - order and order-item lifecycle
//!
//! Keeps the local view of orders and their items, and owns the two
//! deletion paths:
//!
//! - item deletion, including the cascading rule that an order emptied of
//!   all items is itself deleted; the two remote calls are not atomic, so
//!   a failed second call surfaces as [`OrderError::CascadeDeleteFailed`]
//!   while the item removal stays committed
//! - direct order deletion, permitted only while the order is `Ordered`
//!
//! Lifecycle changes are broadcast as [`OrderEvent`]s so list views can
//! refetch or evict the order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderItem, OrderStatus};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::error::ClientError;
use crate::locks::{OperationLockTable, order_item_key, order_key};
use crate::remote::RemoteStore;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Order lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// The order's last item was removed and the order was deleted
    Emptied { order_id: String },
    /// The order was deleted directly
    Deleted { order_id: String },
    /// An administrator changed the order's status
    StatusChanged { order_id: String, status: OrderStatus },
}

/// Outcome of a successful item deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDeletion {
    /// The item was removed; the order still has `remaining` items
    Removed { remaining: usize },
    /// The item was the last one; the order was deleted by cascade
    OrderEmptied,
}

/// Order desk errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order item not found: {0}")]
    ItemNotFound(String),

    #[error("Order already deleted: {0}")]
    OrderAlreadyDeleted(String),

    #[error("Order {order_id} is {status:?} and cannot be modified")]
    InvalidOrderState {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Operation already in progress")]
    OperationInProgress,

    /// The item removal is committed; the empty order remains on the
    /// remote until a retry or the next full refresh reconciles it.
    #[error("Order {order_id} was emptied but could not be deleted: {source}")]
    CascadeDeleteFailed {
        order_id: String,
        source: ClientError,
    },

    #[error(transparent)]
    Remote(#[from] ClientError),
}

impl OrderError {
    /// Map into the shared error code space
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::ItemNotFound(_) => ErrorCode::OrderItemNotFound,
            Self::OrderAlreadyDeleted(_) => ErrorCode::OrderAlreadyDeleted,
            Self::InvalidOrderState { .. } => ErrorCode::InvalidOrderState,
            Self::OperationInProgress => ErrorCode::OperationInProgress,
            Self::CascadeDeleteFailed { .. } => ErrorCode::CascadeDeleteFailed,
            Self::Remote(e) => e.error_code(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        AppError::with_message(err.error_code(), err.to_string())
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

#[derive(Debug, Default)]
struct DeskState {
    orders: HashMap<String, Order>,
    items: HashMap<String, Vec<OrderItem>>,
    /// Orders whose deletion (cascade or direct) has completed
    destroyed: HashSet<String>,
}

/// Order desk
pub struct OrderDesk {
    remote: Arc<dyn RemoteStore>,
    locks: Arc<OperationLockTable>,
    state: RwLock<DeskState>,
    event_tx: broadcast::Sender<OrderEvent>,
}

impl OrderDesk {
    pub fn new(remote: Arc<dyn RemoteStore>, locks: Arc<OperationLockTable>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            remote,
            locks,
            state: RwLock::new(DeskState::default()),
            event_tx,
        }
    }

    /// Subscribe to order lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    // ========== Reads ==========

    /// Snapshot of one order
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.state.read().orders.get(order_id).cloned()
    }

    /// Snapshot of all known orders
    pub fn orders(&self) -> Vec<Order> {
        self.state.read().orders.values().cloned().collect()
    }

    /// Snapshot of an order's items, if they have been loaded
    pub fn items(&self, order_id: &str) -> Option<Vec<OrderItem>> {
        self.state.read().items.get(order_id).cloned()
    }

    /// Whether the order's deletion has completed locally
    pub fn is_destroyed(&self, order_id: &str) -> bool {
        self.state.read().destroyed.contains(order_id)
    }

    // ========== Loads ==========

    /// Authoritative reload of one user's orders
    pub async fn refresh_user_orders(&self, user_id: &str) -> OrderResult<Vec<Order>> {
        let orders = self.remote.list_user_orders(user_id).await?;
        self.apply_orders(&orders);
        Ok(orders)
    }

    /// Authoritative reload of every order (admin)
    pub async fn refresh_all_orders(&self) -> OrderResult<Vec<Order>> {
        let orders = self.remote.list_all_orders().await?;
        self.apply_orders(&orders);
        Ok(orders)
    }

    /// Fetch and cache an order's items
    ///
    /// A remote `NotFound` means the order is gone (deleted elsewhere);
    /// it is marked destroyed so later mutations short-circuit locally.
    pub async fn load_items(&self, order_id: &str) -> OrderResult<Vec<OrderItem>> {
        match self.remote.get_order_items(order_id).await {
            Ok(items) => {
                self.state
                    .write()
                    .items
                    .insert(order_id.to_string(), items.clone());
                Ok(items)
            }
            Err(e) if e.is_not_found() => {
                self.mark_destroyed(order_id);
                Err(OrderError::OrderNotFound(order_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========== Mutations ==========

    /// Delete a single item, cascading to the order when it empties
    ///
    /// Items must have been loaded via [`Self::load_items`] first. The
    /// destroyed-order and unknown-item checks are local and make no
    /// remote call.
    pub async fn delete_item(&self, order_id: &str, item_id: &str) -> OrderResult<ItemDeletion> {
        {
            let state = self.state.read();
            if state.destroyed.contains(order_id) {
                return Err(OrderError::OrderAlreadyDeleted(order_id.to_string()));
            }
            let items = state
                .items
                .get(order_id)
                .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
            if !items.iter().any(|i| i.id == item_id) {
                return Err(OrderError::ItemNotFound(item_id.to_string()));
            }
        }

        let _guard = self
            .locks
            .try_acquire(order_item_key(item_id))
            .ok_or(OrderError::OperationInProgress)?;

        self.remote.delete_order_item(item_id).await?;

        let remaining = {
            let mut state = self.state.write();
            let items = state.items.entry(order_id.to_string()).or_default();
            items.retain(|i| i.id != item_id);
            items.len()
        };
        tracing::info!(order_id = %order_id, item_id = %item_id, remaining, "order item deleted");

        if remaining > 0 {
            return Ok(ItemDeletion::Removed { remaining });
        }

        // Cascade: the order is empty and must not survive
        match self.remote.delete_order(order_id).await {
            Ok(()) => {
                self.mark_destroyed(order_id);
                let _ = self.event_tx.send(OrderEvent::Emptied {
                    order_id: order_id.to_string(),
                });
                tracing::info!(order_id = %order_id, "empty order deleted by cascade");
                Ok(ItemDeletion::OrderEmptied)
            }
            Err(source) => {
                // Item removal stays committed; the empty order remains
                // remote-side until a retry or the next refresh.
                tracing::error!(order_id = %order_id, error = %source, "cascade deletion failed");
                Err(OrderError::CascadeDeleteFailed {
                    order_id: order_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Delete an order directly
    ///
    /// Only permitted while the order is still `Ordered`; any other status
    /// is rejected locally with no remote call.
    pub async fn delete_order(&self, order_id: &str) -> OrderResult<()> {
        {
            let state = self.state.read();
            if state.destroyed.contains(order_id) {
                return Err(OrderError::OrderAlreadyDeleted(order_id.to_string()));
            }
            let order = state
                .orders
                .get(order_id)
                .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
            if !order.status.is_deletable() {
                return Err(OrderError::InvalidOrderState {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
        }

        let _guard = self
            .locks
            .try_acquire(order_key(order_id))
            .ok_or(OrderError::OperationInProgress)?;

        self.remote.delete_order(order_id).await?;
        self.mark_destroyed(order_id);
        let _ = self.event_tx.send(OrderEvent::Deleted {
            order_id: order_id.to_string(),
        });
        tracing::info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    /// Change an order's status (admin)
    ///
    /// Only `Ordered -> Delivered | Cancelled` is permitted; anything else
    /// is rejected locally.
    pub async fn update_status(&self, order_id: &str, new_status: OrderStatus) -> OrderResult<()> {
        {
            let state = self.state.read();
            if state.destroyed.contains(order_id) {
                return Err(OrderError::OrderAlreadyDeleted(order_id.to_string()));
            }
            let order = state
                .orders
                .get(order_id)
                .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
            if !order.status.can_transition_to(new_status) {
                return Err(OrderError::InvalidOrderState {
                    order_id: order_id.to_string(),
                    status: order.status,
                });
            }
        }

        let _guard = self
            .locks
            .try_acquire(order_key(order_id))
            .ok_or(OrderError::OperationInProgress)?;

        self.remote.update_order_status(order_id, new_status).await?;

        if let Some(order) = self.state.write().orders.get_mut(order_id) {
            order.status = new_status;
        }
        let _ = self.event_tx.send(OrderEvent::StatusChanged {
            order_id: order_id.to_string(),
            status: new_status,
        });
        tracing::info!(order_id = %order_id, status = ?new_status, "order status updated");
        Ok(())
    }

    // ========== Internal ==========

    fn apply_orders(&self, fetched: &[Order]) {
        let ids: HashSet<String> = fetched.iter().map(|o| o.id.clone()).collect();
        let mut state = self.state.write();
        state.orders = fetched.iter().map(|o| (o.id.clone(), o.clone())).collect();
        state.items.retain(|id, _| ids.contains(id));
        // An order the remote reports again is, by definition, not deleted
        state.destroyed.retain(|id| !ids.contains(id));
    }

    fn mark_destroyed(&self, order_id: &str) {
        let mut state = self.state.write();
        state.orders.remove(order_id);
        state.items.remove(order_id);
        state.destroyed.insert(order_id.to_string());
    }
}

impl std::fmt::Debug for OrderDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("OrderDesk")
            .field("orders", &state.orders.len())
            .field("destroyed", &state.destroyed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRemote, RemoteOp};

    fn desk_with(remote: MemoryRemote) -> OrderDesk {
        OrderDesk::new(Arc::new(remote), Arc::new(OperationLockTable::new()))
    }

    /// Remote with one user order containing the given item count
    fn remote_with_order(items: usize) -> (MemoryRemote, String) {
        let remote = MemoryRemote::new();
        remote.seed_outlet("O1", "Main street 1");
        remote.seed_product("P1", "Runner", 59.9);
        for size in 0..items {
            remote.seed_stock("O1", "P1", 40 + size as i32, 5);
        }
        let order_id = remote.seed_order(
            "U1",
            "O1",
            &(0..items)
                .map(|size| ("P1", 40 + size as i32))
                .collect::<Vec<_>>(),
        );
        (remote, order_id)
    }

    #[tokio::test]
    async fn test_delete_one_of_many_keeps_order() {
        let (remote, order_id) = remote_with_order(2);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let items = desk.load_items(&order_id).await.unwrap();

        let outcome = desk.delete_item(&order_id, &items[0].id).await.unwrap();
        assert_eq!(outcome, ItemDeletion::Removed { remaining: 1 });
        assert!(!desk.is_destroyed(&order_id));
        assert_eq!(remote.calls(RemoteOp::DeleteOrder), 0);
    }

    #[tokio::test]
    async fn test_last_item_cascades() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let items = desk.load_items(&order_id).await.unwrap();
        let mut events = desk.subscribe();

        let outcome = desk.delete_item(&order_id, &items[0].id).await.unwrap();
        assert_eq!(outcome, ItemDeletion::OrderEmptied);
        assert!(desk.is_destroyed(&order_id));
        assert_eq!(
            events.try_recv().unwrap(),
            OrderEvent::Emptied {
                order_id: order_id.clone()
            }
        );
        assert!(remote.order(&order_id).is_none());
    }

    #[tokio::test]
    async fn test_delete_item_after_cascade_is_local() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let items = desk.load_items(&order_id).await.unwrap();

        desk.delete_item(&order_id, &items[0].id).await.unwrap();
        let deletions_before = remote.calls(RemoteOp::DeleteOrderItem);

        let err = desk.delete_item(&order_id, &items[0].id).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderAlreadyDeleted(_)));
        assert_eq!(remote.calls(RemoteOp::DeleteOrderItem), deletions_before);
    }

    #[tokio::test]
    async fn test_unknown_item_is_local() {
        let (remote, order_id) = remote_with_order(2);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        desk.load_items(&order_id).await.unwrap();

        let err = desk.delete_item(&order_id, "ITM-missing").await.unwrap_err();
        assert!(matches!(err, OrderError::ItemNotFound(_)));
        assert_eq!(remote.calls(RemoteOp::DeleteOrderItem), 0);
    }

    #[tokio::test]
    async fn test_cascade_failure_is_distinct() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let items = desk.load_items(&order_id).await.unwrap();

        remote.fail_next(RemoteOp::DeleteOrder);
        let err = desk.delete_item(&order_id, &items[0].id).await.unwrap_err();
        assert!(matches!(err, OrderError::CascadeDeleteFailed { .. }));

        // The item removal itself is committed
        assert_eq!(desk.items(&order_id).unwrap().len(), 0);
        assert!(!desk.is_destroyed(&order_id));
        assert!(remote.order(&order_id).is_some());

        // Retry path: a direct deletion reconciles the leftover order
        desk.delete_order(&order_id).await.unwrap();
        assert!(desk.is_destroyed(&order_id));
        assert!(remote.order(&order_id).is_none());
    }

    #[tokio::test]
    async fn test_delete_delivered_order_rejected_locally() {
        let (remote, order_id) = remote_with_order(1);
        remote.set_order_status(&order_id, OrderStatus::Delivered);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();

        let err = desk.delete_order(&order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidOrderState {
                status: OrderStatus::Delivered,
                ..
            }
        ));
        assert_eq!(remote.calls(RemoteOp::DeleteOrder), 0);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let mut events = desk.subscribe();

        desk.update_status(&order_id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(desk.order(&order_id).unwrap().status, OrderStatus::Delivered);
        assert_eq!(
            events.try_recv().unwrap(),
            OrderEvent::StatusChanged {
                order_id: order_id.clone(),
                status: OrderStatus::Delivered
            }
        );

        // Delivered is terminal
        let err = desk
            .update_status(&order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidOrderState { .. }));
    }

    #[tokio::test]
    async fn test_load_items_of_deleted_order_marks_destroyed() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();

        remote.drop_order(&order_id);
        let err = desk.load_items(&order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
        assert!(desk.is_destroyed(&order_id));

        let err = desk.delete_item(&order_id, "ITM1").await.unwrap_err();
        assert!(matches!(err, OrderError::OrderAlreadyDeleted(_)));
    }

    #[tokio::test]
    async fn test_refresh_prunes_destroyed() {
        let (remote, order_id) = remote_with_order(1);
        let desk = desk_with(remote.clone());
        desk.refresh_user_orders("U1").await.unwrap();
        let items = desk.load_items(&order_id).await.unwrap();
        desk.delete_item(&order_id, &items[0].id).await.unwrap();
        assert!(desk.is_destroyed(&order_id));

        desk.refresh_user_orders("U1").await.unwrap();
        assert!(desk.orders().is_empty());
        assert!(desk.is_destroyed(&order_id));
    }
}
