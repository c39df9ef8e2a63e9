//! Operation lock table
//!
//! A per-key in-flight marker: at most one mutating operation per entity
//! key at any time. A second attempt while one is outstanding is rejected,
//! never queued. Keys are scoped per entity type so features cannot collide
//! on raw ids.

use parking_lot::Mutex;
use std::collections::HashSet;

/// Set of in-flight operation keys
#[derive(Debug, Default)]
pub struct OperationLockTable {
    in_flight: Mutex<HashSet<String>>,
}

impl OperationLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to mark `key` as in flight
    ///
    /// Returns a guard that releases the key when dropped, or `None` when
    /// an operation on the same key is already outstanding.
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<OpGuard<'_>> {
        let key = key.into();
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key.clone()) {
            tracing::debug!(key = %key, "operation already in flight");
            return None;
        }
        Some(OpGuard { table: self, key })
    }

    /// Whether an operation on `key` is currently outstanding
    pub fn is_locked(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }

    fn release(&self, key: &str) {
        self.in_flight.lock().remove(key);
    }
}

/// Guard marking one in-flight operation; releases its key on drop
#[derive(Debug)]
pub struct OpGuard<'a> {
    table: &'a OperationLockTable,
    key: String,
}

impl OpGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}

/// Key for a booking attempt on one product/size line
pub fn booking_key(product_id: &str, size: i32) -> String {
    format!("booking:{}:{}", product_id, size)
}

/// Key for an administrative edit of one stock line
pub fn stock_key(outlet_id: &str, product_id: &str, size: i32) -> String {
    format!("stock:{}:{}:{}", outlet_id, product_id, size)
}

/// Key for the deletion of one order item
pub fn order_item_key(item_id: &str) -> String {
    format!("orderitem:{}", item_id)
}

/// Key for an order-level mutation
pub fn order_key(order_id: &str) -> String {
    format!("order:{}", order_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected() {
        let table = OperationLockTable::new();
        let guard = table.try_acquire("order:1");
        assert!(guard.is_some());
        assert!(table.try_acquire("order:1").is_none());
        assert!(table.is_locked("order:1"));
    }

    #[test]
    fn test_released_on_drop() {
        let table = OperationLockTable::new();
        {
            let _guard = table.try_acquire("order:1").unwrap();
            assert!(table.is_locked("order:1"));
        }
        assert!(!table.is_locked("order:1"));
        assert!(table.try_acquire("order:1").is_some());
    }

    #[test]
    fn test_independent_keys() {
        let table = OperationLockTable::new();
        let _a = table.try_acquire(booking_key("p1", 42)).unwrap();
        // Administrative stock edits live in their own key space
        let b = table.try_acquire(stock_key("o1", "p1", 42));
        assert!(b.is_some());
    }

    #[test]
    fn test_key_scoping() {
        assert_eq!(booking_key("p1", 42), "booking:p1:42");
        assert_eq!(stock_key("o1", "p1", 42), "stock:o1:p1:42");
        assert_eq!(order_item_key("i1"), "orderitem:i1");
        assert_eq!(order_key("ord1"), "order:ord1");
    }
}
