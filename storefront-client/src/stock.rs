//! Stock line registry
//!
//! In-memory projection of `(outlet, product, size) -> quantity`, derived
//! from the remote service. The remote is the only source of truth: local
//! mutations are optimistic and must be reconciled by a reload or reversed
//! exactly once the remote call resolves. A reload replaces an outlet's
//! projection wholesale and always wins over in-flight local state.
//!
//! Only this registry mutates the projection, and only through the entry
//! points defined here.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared::error::{AppError, ErrorCode};
use shared::models::{ProductAvailability, SizeAvailability, StockLine};
use shared::request::NewStockLine;
use thiserror::Error;

use crate::error::ClientError;
use crate::locks::{OperationLockTable, stock_key};
use crate::remote::RemoteStore;

/// Registry errors
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Stock line not found: product {product_id} size {size}")]
    LineNotFound { product_id: String, size: i32 },

    #[error("Insufficient stock: product {product_id} size {size}")]
    InsufficientStock { product_id: String, size: i32 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i32),

    #[error("Operation already in progress")]
    OperationInProgress,

    #[error(transparent)]
    Remote(#[from] ClientError),
}

impl StockError {
    /// Map into the shared error code space
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::LineNotFound { .. } => ErrorCode::StockLineNotFound,
            Self::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            Self::InvalidAmount(_) => ErrorCode::ValidationFailed,
            Self::OperationInProgress => ErrorCode::OperationInProgress,
            Self::Remote(e) => e.error_code(),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        AppError::with_message(err.error_code(), err.to_string())
    }
}

pub type StockResult<T> = Result<T, StockError>;

/// Stock line registry
///
/// Holds one projection per outlet. Cheap to share via [`Arc`].
pub struct StockRegistry {
    remote: Arc<dyn RemoteStore>,
    locks: Arc<OperationLockTable>,
    projection: RwLock<HashMap<String, Vec<StockLine>>>,
}

impl StockRegistry {
    pub fn new(remote: Arc<dyn RemoteStore>, locks: Arc<OperationLockTable>) -> Self {
        Self {
            remote,
            locks,
            projection: RwLock::new(HashMap::new()),
        }
    }

    // ========== Reads ==========

    /// Snapshot of an outlet's stock lines
    pub fn lines_for_outlet(&self, outlet_id: &str) -> Vec<StockLine> {
        self.projection
            .read()
            .get(outlet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Quantity of one line, if the line is in the projection
    pub fn quantity(&self, outlet_id: &str, product_id: &str, size: i32) -> Option<i32> {
        self.projection
            .read()
            .get(outlet_id)?
            .iter()
            .find(|l| l.matches(product_id, size))
            .map(|l| l.amount)
    }

    /// Products of an outlet enriched with per-size availability
    ///
    /// Groups the outlet's stock lines by product, preserving the order in
    /// which products first appear.
    pub fn availability_for_outlet(&self, outlet_id: &str) -> Vec<ProductAvailability> {
        let projection = self.projection.read();
        let Some(lines) = projection.get(outlet_id) else {
            return Vec::new();
        };

        let mut products: Vec<ProductAvailability> = Vec::new();
        for line in lines {
            let index = match products.iter().position(|p| p.product.id == line.product.id) {
                Some(index) => index,
                None => {
                    products.push(ProductAvailability {
                        product: line.product.clone(),
                        sizes: Vec::new(),
                        total_stock: 0,
                    });
                    products.len() - 1
                }
            };
            let entry = &mut products[index];
            entry.sizes.push(SizeAvailability {
                size: line.size,
                amount: line.amount,
                available: line.amount > 0,
            });
            entry.total_stock += line.amount;
        }
        products
    }

    /// Availability of one product at one outlet
    pub fn product_availability(
        &self,
        outlet_id: &str,
        product_id: &str,
    ) -> Option<ProductAvailability> {
        self.availability_for_outlet(outlet_id)
            .into_iter()
            .find(|p| p.product.id == product_id)
    }

    // ========== Mutations ==========

    /// Authoritative refresh of one outlet's projection
    ///
    /// Replaces the outlet's lines wholesale. On failure the previous
    /// projection is retained and the error is returned.
    pub async fn load_for_outlet(&self, outlet_id: &str) -> StockResult<()> {
        let lines = self.remote.list_stock_by_outlet(outlet_id).await?;
        tracing::debug!(outlet_id = %outlet_id, lines = lines.len(), "stock projection reloaded");
        self.projection
            .write()
            .insert(outlet_id.to_string(), lines);
        Ok(())
    }

    /// Immediate local quantity adjustment, ahead of remote confirmation
    ///
    /// Returns the new amount. A delta that would drive the amount below
    /// zero is rejected with [`StockError::InsufficientStock`] and the
    /// projection is left unchanged. Callers must pair this with a reload
    /// or an exactly inverse delta once the remote call resolves.
    pub fn apply_delta(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        delta: i32,
    ) -> StockResult<i32> {
        let mut projection = self.projection.write();
        let line = projection
            .get_mut(outlet_id)
            .and_then(|lines| lines.iter_mut().find(|l| l.matches(product_id, size)))
            .ok_or_else(|| StockError::LineNotFound {
                product_id: product_id.to_string(),
                size,
            })?;

        let new_amount = line.amount + delta;
        if new_amount < 0 {
            return Err(StockError::InsufficientStock {
                product_id: product_id.to_string(),
                size,
            });
        }
        line.amount = new_amount;
        Ok(new_amount)
    }

    // ========== Administrative mutations ==========

    /// Set the quantity of one stock line
    ///
    /// Applies the new amount optimistically, then confirms with the
    /// remote. On success the outlet is reloaded authoritatively; on
    /// failure the previous amount is restored exactly.
    pub async fn set_amount(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        new_amount: i32,
    ) -> StockResult<()> {
        if new_amount < 0 {
            return Err(StockError::InvalidAmount(new_amount));
        }

        let key = stock_key(outlet_id, product_id, size);
        let _guard = self
            .locks
            .try_acquire(key)
            .ok_or(StockError::OperationInProgress)?;

        let previous = self.swap_amount(outlet_id, product_id, size, new_amount)?;

        match self
            .remote
            .update_stock_amount(outlet_id, product_id, size, new_amount)
            .await
        {
            Ok(()) => {
                self.reload_after_write(outlet_id).await;
                Ok(())
            }
            Err(e) => {
                // Reverse the optimistic write exactly; if a racing
                // reload replaced the projection meanwhile, the reload
                // wins and there is nothing to reverse
                if self.swap_amount(outlet_id, product_id, size, previous).is_err() {
                    tracing::warn!(
                        outlet_id = %outlet_id,
                        product_id = %product_id,
                        size,
                        "line replaced by reload before rollback"
                    );
                }
                tracing::error!(
                    outlet_id = %outlet_id,
                    product_id = %product_id,
                    size,
                    error = %e,
                    "stock amount update rejected, rolled back"
                );
                Err(e.into())
            }
        }
    }

    /// Delete one stock line
    ///
    /// Removes the line optimistically; restores it if the remote rejects
    /// the deletion.
    pub async fn remove_line(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
    ) -> StockResult<()> {
        let key = stock_key(outlet_id, product_id, size);
        let _guard = self
            .locks
            .try_acquire(key)
            .ok_or(StockError::OperationInProgress)?;

        let (index, line) = {
            let mut projection = self.projection.write();
            let lines = projection
                .get_mut(outlet_id)
                .ok_or_else(|| StockError::LineNotFound {
                    product_id: product_id.to_string(),
                    size,
                })?;
            let index = lines
                .iter()
                .position(|l| l.matches(product_id, size))
                .ok_or_else(|| StockError::LineNotFound {
                    product_id: product_id.to_string(),
                    size,
                })?;
            (index, lines.remove(index))
        };

        match self.remote.delete_stock_line(outlet_id, product_id, size).await {
            Ok(()) => {
                self.reload_after_write(outlet_id).await;
                Ok(())
            }
            Err(e) => {
                let mut projection = self.projection.write();
                if let Some(lines) = projection.get_mut(outlet_id) {
                    let index = index.min(lines.len());
                    lines.insert(index, line);
                }
                tracing::error!(
                    outlet_id = %outlet_id,
                    product_id = %product_id,
                    size,
                    error = %e,
                    "stock line deletion rejected, restored"
                );
                Err(e.into())
            }
        }
    }

    /// Add a new stock line
    ///
    /// The remote write happens first; the projection picks the line up
    /// from the authoritative reload. Lines are never created client-side
    /// without a corresponding remote write having been attempted.
    pub async fn add_line(&self, line: NewStockLine) -> StockResult<()> {
        if line.amount < 0 {
            return Err(StockError::InvalidAmount(line.amount));
        }

        let key = stock_key(&line.sales_outlet_id, &line.product_id, line.size);
        let _guard = self
            .locks
            .try_acquire(key)
            .ok_or(StockError::OperationInProgress)?;

        self.remote.add_stock_line(&line).await?;
        self.reload_after_write(&line.sales_outlet_id).await;
        Ok(())
    }

    /// Swap one line's amount, returning the previous value
    fn swap_amount(
        &self,
        outlet_id: &str,
        product_id: &str,
        size: i32,
        amount: i32,
    ) -> StockResult<i32> {
        let mut projection = self.projection.write();
        let line = projection
            .get_mut(outlet_id)
            .and_then(|lines| lines.iter_mut().find(|l| l.matches(product_id, size)))
            .ok_or_else(|| StockError::LineNotFound {
                product_id: product_id.to_string(),
                size,
            })?;
        let previous = line.amount;
        line.amount = amount;
        Ok(previous)
    }

    /// Reload after a confirmed remote write
    ///
    /// The write itself succeeded; a failed reload leaves the optimistic
    /// value standing until the next refresh, so it is logged rather than
    /// surfaced.
    async fn reload_after_write(&self, outlet_id: &str) {
        if let Err(e) = self.load_for_outlet(outlet_id).await {
            tracing::warn!(outlet_id = %outlet_id, error = %e, "reload after stock write failed");
        }
    }
}

impl std::fmt::Debug for StockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockRegistry")
            .field("outlets", &self.projection.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;

    fn registry_with(remote: MemoryRemote) -> StockRegistry {
        StockRegistry::new(Arc::new(remote), Arc::new(OperationLockTable::new()))
    }

    fn seeded_remote() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.seed_outlet("O1", "Main street 1");
        remote.seed_product("P1", "Runner", 59.9);
        remote.seed_stock("O1", "P1", 42, 3);
        remote.seed_stock("O1", "P1", 43, 0);
        remote
    }

    #[tokio::test]
    async fn test_load_replaces_wholesale() {
        let remote = seeded_remote();
        let registry = registry_with(remote);
        registry.load_for_outlet("O1").await.unwrap();

        assert_eq!(registry.quantity("O1", "P1", 42), Some(3));
        assert_eq!(registry.quantity("O1", "P1", 43), Some(0));
        assert_eq!(registry.lines_for_outlet("O1").len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_retains_previous() {
        let remote = seeded_remote();
        let registry = registry_with(remote.clone());
        registry.load_for_outlet("O1").await.unwrap();

        remote.fail_next(crate::memory::RemoteOp::ListStock);
        let err = registry.load_for_outlet("O1").await.unwrap_err();
        assert!(matches!(err, StockError::Remote(_)));
        // Previous projection survives the failed refresh
        assert_eq!(registry.quantity("O1", "P1", 42), Some(3));
    }

    #[tokio::test]
    async fn test_delta_floor_is_zero() {
        let registry = registry_with(seeded_remote());
        registry.load_for_outlet("O1").await.unwrap();

        assert_eq!(registry.apply_delta("O1", "P1", 42, -1).unwrap(), 2);
        assert_eq!(registry.apply_delta("O1", "P1", 42, -2).unwrap(), 0);

        let err = registry.apply_delta("O1", "P1", 42, -1).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
        assert_eq!(registry.quantity("O1", "P1", 42), Some(0));

        // Reverse deltas restore exactly
        assert_eq!(registry.apply_delta("O1", "P1", 42, 3).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delta_on_unknown_line() {
        let registry = registry_with(seeded_remote());
        registry.load_for_outlet("O1").await.unwrap();

        let err = registry.apply_delta("O1", "P9", 42, 1).unwrap_err();
        assert!(matches!(err, StockError::LineNotFound { .. }));
    }

    #[tokio::test]
    async fn test_availability_grouping() {
        let remote = seeded_remote();
        remote.seed_product("P2", "Boot", 89.0);
        remote.seed_stock("O1", "P2", 0, 5);
        let registry = registry_with(remote);
        registry.load_for_outlet("O1").await.unwrap();

        let availability = registry.availability_for_outlet("O1");
        assert_eq!(availability.len(), 2);

        let runner = registry.product_availability("O1", "P1").unwrap();
        assert!(runner.is_sized());
        assert_eq!(runner.total_stock, 3);
        assert!(runner.size(42).unwrap().available);
        assert!(!runner.size(43).unwrap().available);

        let boot = registry.product_availability("O1", "P2").unwrap();
        assert!(!boot.is_sized());
        assert_eq!(boot.total_stock, 5);
    }

    #[tokio::test]
    async fn test_set_amount_reconciles_with_remote() {
        let remote = seeded_remote();
        let registry = registry_with(remote.clone());
        registry.load_for_outlet("O1").await.unwrap();

        registry.set_amount("O1", "P1", 42, 5).await.unwrap();
        assert_eq!(registry.quantity("O1", "P1", 42), Some(5));
        assert_eq!(remote.stock_amount("O1", "P1", 42), Some(5));
    }

    #[tokio::test]
    async fn test_set_amount_rolls_back_on_remote_failure() {
        let remote = seeded_remote();
        let registry = registry_with(remote.clone());
        registry.load_for_outlet("O1").await.unwrap();

        remote.fail_next(crate::memory::RemoteOp::UpdateStockAmount);
        let err = registry.set_amount("O1", "P1", 42, 10).await.unwrap_err();
        assert!(matches!(err, StockError::Remote(_)));
        // Optimistic write reversed exactly
        assert_eq!(registry.quantity("O1", "P1", 42), Some(3));
        assert_eq!(remote.stock_amount("O1", "P1", 42), Some(3));
    }

    #[tokio::test]
    async fn test_set_amount_rejects_negative() {
        let registry = registry_with(seeded_remote());
        registry.load_for_outlet("O1").await.unwrap();

        let err = registry.set_amount("O1", "P1", 42, -1).await.unwrap_err();
        assert!(matches!(err, StockError::InvalidAmount(-1)));
    }

    #[tokio::test]
    async fn test_remove_line_restores_on_failure() {
        let remote = seeded_remote();
        let registry = registry_with(remote.clone());
        registry.load_for_outlet("O1").await.unwrap();

        remote.fail_next(crate::memory::RemoteOp::DeleteStockLine);
        let err = registry.remove_line("O1", "P1", 42).await.unwrap_err();
        assert!(matches!(err, StockError::Remote(_)));
        assert_eq!(registry.quantity("O1", "P1", 42), Some(3));

        registry.remove_line("O1", "P1", 42).await.unwrap();
        assert_eq!(registry.quantity("O1", "P1", 42), None);
        assert_eq!(remote.stock_amount("O1", "P1", 42), None);
    }

    #[tokio::test]
    async fn test_add_line_appears_after_reload() {
        let remote = seeded_remote();
        remote.seed_product("P2", "Boot", 89.0);
        let registry = registry_with(remote);
        registry.load_for_outlet("O1").await.unwrap();

        registry
            .add_line(NewStockLine {
                sales_outlet_id: "O1".to_string(),
                product_id: "P2".to_string(),
                size: 40,
                amount: 7,
            })
            .await
            .unwrap();
        assert_eq!(registry.quantity("O1", "P2", 40), Some(7));
    }
}
