//! Booking coordinator
//!
//! Turns a "reserve this product/size" action into an order-creation
//! request. Each attempt walks Idle -> Validating -> Submitting ->
//! Succeeded | Failed: preconditions are checked in a fixed order before
//! any remote call, the stock line is single-flighted through the lock
//! table, and on success the registry is reloaded authoritatively. The
//! unit of contention is the stock line, not the user: two rapid attempts
//! on the same size must not both reach the remote service.

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::UNSIZED;
use shared::request::{CreateOrderRequest, OrderItemRequest};
use thiserror::Error;

use crate::error::ClientError;
use crate::locks::{OperationLockTable, booking_key};
use crate::remote::RemoteStore;
use crate::session::SessionContext;
use crate::stock::StockRegistry;

/// Booking failures
///
/// The first four variants are precondition failures: no remote call has
/// been made and no lock was taken.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("No sales outlet selected")]
    NoOutletSelected,

    #[error("Product not found in outlet: {0}")]
    ProductNotFound(String),

    #[error("A size must be selected")]
    SizeRequired,

    #[error("Size {size} is unavailable")]
    SizeUnavailable { size: i32 },

    #[error("A booking for this product and size is already in flight")]
    OperationInProgress,

    #[error(transparent)]
    Remote(#[from] ClientError),
}

impl BookingError {
    /// Map into the shared error code space
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::NotAuthenticated,
            Self::NoOutletSelected => ErrorCode::OutletNotSelected,
            Self::ProductNotFound(_) => ErrorCode::ProductNotFound,
            Self::SizeRequired => ErrorCode::SizeRequired,
            Self::SizeUnavailable { .. } => ErrorCode::SizeUnavailable,
            Self::OperationInProgress => ErrorCode::OperationInProgress,
            Self::Remote(e) => e.error_code(),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::with_message(err.error_code(), err.to_string())
    }
}

/// One booking attempt
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// Selected outlet, if any
    pub outlet_id: Option<String>,
    pub product_id: String,
    /// Selected size; `None` books the unsized variant
    pub size: Option<i32>,
}

/// Successful booking
///
/// Receiving one is the signal to close the presentation surface that
/// started the attempt.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub order_id: String,
    pub outlet_id: String,
    pub product_id: String,
    pub size: i32,
    /// Price captured at booking time
    pub price: f64,
}

/// Booking coordinator
pub struct BookingCoordinator {
    remote: Arc<dyn RemoteStore>,
    registry: Arc<StockRegistry>,
    locks: Arc<OperationLockTable>,
}

impl BookingCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        registry: Arc<StockRegistry>,
        locks: Arc<OperationLockTable>,
    ) -> Self {
        Self {
            remote,
            registry,
            locks,
        }
    }

    /// Book one unit of a product at an outlet
    ///
    /// Preconditions are checked in order: session, outlet, size selection,
    /// availability. The first unmet one aborts with its own error and no
    /// remote call. The session is passed in explicitly; the coordinator
    /// keeps no ambient authentication state.
    pub async fn book(
        &self,
        session: Option<&SessionContext>,
        request: &BookingRequest,
    ) -> Result<BookingReceipt, BookingError> {
        // Validating
        let session = match session {
            Some(s) if !s.is_expired() => s,
            _ => return Err(BookingError::Unauthenticated),
        };

        let outlet_id = request
            .outlet_id
            .as_deref()
            .ok_or(BookingError::NoOutletSelected)?;

        let availability = self
            .registry
            .product_availability(outlet_id, &request.product_id)
            .ok_or_else(|| BookingError::ProductNotFound(request.product_id.clone()))?;

        if availability.is_sized() && request.size.is_none() {
            return Err(BookingError::SizeRequired);
        }
        let size = request.size.unwrap_or(UNSIZED);

        match availability.size(size) {
            Some(line) if line.amount > 0 => {}
            _ => return Err(BookingError::SizeUnavailable { size }),
        }

        // Submitting: one outstanding booking per stock line
        let _guard = self
            .locks
            .try_acquire(booking_key(&request.product_id, size))
            .ok_or(BookingError::OperationInProgress)?;

        let order = CreateOrderRequest {
            user_id: session.user.id.clone(),
            sales_outlet_id: outlet_id.to_string(),
            order_items: vec![OrderItemRequest {
                product_id: request.product_id.clone(),
                amount: 1,
                price: availability.product.price,
                size,
            }],
        };

        tracing::debug!(
            product_id = %request.product_id,
            size,
            outlet_id = %outlet_id,
            "submitting booking"
        );

        let order_id = match self.remote.create_order(&order).await {
            Ok(order_id) => order_id,
            Err(e) => {
                // No optimistic delta was applied at this layer; the
                // projection is untouched.
                tracing::warn!(product_id = %request.product_id, size, error = %e, "booking rejected");
                return Err(e.into());
            }
        };
        drop(_guard);

        tracing::info!(order_id = %order_id, product_id = %request.product_id, size, "booking succeeded");

        // The remote decremented the line; pull the authoritative
        // quantities rather than trusting a local delta.
        if let Err(e) = self.registry.load_for_outlet(outlet_id).await {
            tracing::warn!(outlet_id = %outlet_id, error = %e, "post-booking stock reload failed");
        }

        Ok(BookingReceipt {
            order_id,
            outlet_id: outlet_id.to_string(),
            product_id: request.product_id.clone(),
            size,
            price: order.order_items[0].price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRemote, RemoteOp};
    use shared::models::{User, UserRole};

    fn test_user() -> User {
        User {
            id: "U1".to_string(),
            name: "Test".to_string(),
            surname: "User".to_string(),
            email: "test@example.com".to_string(),
            role: UserRole::User,
            phone: None,
            default_outlet_id: None,
        }
    }

    fn session() -> SessionContext {
        SessionContext::new("token", test_user())
    }

    async fn coordinator_with(remote: MemoryRemote) -> (BookingCoordinator, Arc<StockRegistry>) {
        let remote: Arc<dyn RemoteStore> = Arc::new(remote);
        let locks = Arc::new(OperationLockTable::new());
        let registry = Arc::new(StockRegistry::new(remote.clone(), locks.clone()));
        registry.load_for_outlet("O1").await.unwrap();
        (
            BookingCoordinator::new(remote, registry.clone(), locks),
            registry,
        )
    }

    fn seeded_remote() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.seed_outlet("O1", "Main street 1");
        remote.seed_product("P1", "Runner", 59.9);
        remote.seed_stock("O1", "P1", 42, 3);
        remote
    }

    fn request(size: Option<i32>) -> BookingRequest {
        BookingRequest {
            outlet_id: Some("O1".to_string()),
            product_id: "P1".to_string(),
            size,
        }
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let remote = seeded_remote();
        let (coordinator, _) = coordinator_with(remote.clone()).await;

        let err = coordinator.book(None, &request(Some(42))).await.unwrap_err();
        assert!(matches!(err, BookingError::Unauthenticated));

        let no_outlet = BookingRequest {
            outlet_id: None,
            ..request(Some(42))
        };
        let err = coordinator.book(Some(&session()), &no_outlet).await.unwrap_err();
        assert!(matches!(err, BookingError::NoOutletSelected));

        let err = coordinator.book(Some(&session()), &request(None)).await.unwrap_err();
        assert!(matches!(err, BookingError::SizeRequired));

        let err = coordinator
            .book(Some(&session()), &request(Some(44)))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SizeUnavailable { size: 44 }));

        // No precondition failure reached the remote
        assert_eq!(remote.calls(RemoteOp::CreateOrder), 0);
    }

    #[tokio::test]
    async fn test_successful_booking_reloads_registry() {
        let remote = seeded_remote();
        let (coordinator, registry) = coordinator_with(remote.clone()).await;

        let receipt = coordinator
            .book(Some(&session()), &request(Some(42)))
            .await
            .unwrap();
        assert_eq!(receipt.size, 42);
        assert_eq!(receipt.price, 59.9);
        assert_eq!(registry.quantity("O1", "P1", 42), Some(2));

        let items = remote.order_items_of(&receipt.order_id);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 1);
    }

    #[tokio::test]
    async fn test_failed_booking_leaves_registry_untouched() {
        let remote = seeded_remote();
        let (coordinator, registry) = coordinator_with(remote.clone()).await;

        remote.fail_next(RemoteOp::CreateOrder);
        let err = coordinator
            .book(Some(&session()), &request(Some(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Remote(_)));
        assert_eq!(registry.quantity("O1", "P1", 42), Some(3));
        // The lock was released on the failure path
        let receipt = coordinator
            .book(Some(&session()), &request(Some(42)))
            .await
            .unwrap();
        assert!(!receipt.order_id.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let remote = seeded_remote();
        let (coordinator, _) = coordinator_with(remote.clone()).await;

        let mut expired = session();
        expired.expires_at = Some(1000);
        let err = coordinator
            .book(Some(&expired), &request(Some(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Unauthenticated));
        assert_eq!(remote.calls(RemoteOp::CreateOrder), 0);
    }
}
