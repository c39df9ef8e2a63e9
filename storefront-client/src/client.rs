//! Storefront client facade
//!
//! Wires the remote store, session, stock registry, booking coordinator,
//! and order desk over one shared operation lock table, and exposes them
//! to presentation callers.

use std::sync::Arc;

use parking_lot::RwLock;
use shared::models::{Product, SalesOutlet, User, UserRole};
use shared::request::{OutletPayload, ProductPayload, RegisterRequest};

use crate::booking::{BookingCoordinator, BookingError, BookingReceipt, BookingRequest};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::locks::OperationLockTable;
use crate::orders::OrderDesk;
use crate::remote::{HttpRemote, RemoteStore};
use crate::session::SessionContext;
use crate::stock::StockRegistry;

/// Storefront client
///
/// One instance per signed-in surface. All components share the remote
/// store and the lock table; the stock projection and order state are the
/// only cross-component mutable state, each owned by its component.
pub struct StorefrontClient {
    remote: Arc<dyn RemoteStore>,
    /// Concrete HTTP remote, kept for bearer-token plumbing
    http: Option<Arc<HttpRemote>>,
    locks: Arc<OperationLockTable>,
    stock: Arc<StockRegistry>,
    orders: Arc<OrderDesk>,
    booking: BookingCoordinator,
    session: RwLock<Option<SessionContext>>,
}

impl StorefrontClient {
    /// Create a client talking HTTP to the configured service
    pub fn new(config: ClientConfig) -> Self {
        let http = Arc::new(HttpRemote::new(&config));
        Self::build(http.clone(), Some(http))
    }

    /// Create a client over any remote store (tests, offline development)
    pub fn with_remote(remote: Arc<dyn RemoteStore>) -> Self {
        Self::build(remote, None)
    }

    fn build(remote: Arc<dyn RemoteStore>, http: Option<Arc<HttpRemote>>) -> Self {
        let locks = Arc::new(OperationLockTable::new());
        let stock = Arc::new(StockRegistry::new(remote.clone(), locks.clone()));
        let orders = Arc::new(OrderDesk::new(remote.clone(), locks.clone()));
        let booking = BookingCoordinator::new(remote.clone(), stock.clone(), locks.clone());
        Self {
            remote,
            http,
            locks,
            stock,
            orders,
            booking,
            session: RwLock::new(None),
        }
    }

    // ========== Session ==========

    /// Authenticate and install the session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let response = self.remote.login(email, password).await?;
        if let Some(http) = &self.http {
            http.set_token(Some(response.token.clone()));
        }
        let user = response.user.clone();
        *self.session.write() = Some(SessionContext::new(response.token, response.user));
        tracing::info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    /// Drop the session and the bearer token
    pub fn logout(&self) {
        if let Some(http) = &self.http {
            http.set_token(None);
        }
        *self.session.write() = None;
        tracing::info!("logged out");
    }

    /// Register a new user (does not sign in)
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<()> {
        self.remote.register(request).await
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Option<SessionContext> {
        self.session.read().clone()
    }

    /// Whether a non-expired session is installed
    pub fn is_logged_in(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| !s.is_expired())
    }

    // ========== Components ==========

    /// Stock line registry
    pub fn stock(&self) -> &StockRegistry {
        &self.stock
    }

    /// Order desk
    pub fn orders(&self) -> &OrderDesk {
        &self.orders
    }

    /// In-flight operation markers shared by all components
    pub fn locks(&self) -> &OperationLockTable {
        &self.locks
    }

    // ========== Operations ==========

    /// Book one unit of a product, using the installed session
    pub async fn book(&self, request: &BookingRequest) -> Result<BookingReceipt, BookingError> {
        let session = self.session();
        self.booking.book(session.as_ref(), request).await
    }

    /// List all sales outlets
    pub async fn outlets(&self) -> ClientResult<Vec<SalesOutlet>> {
        self.remote.list_outlets().await
    }

    /// List the whole catalog
    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        self.remote.list_products().await
    }

    // ========== Back-office (admin) ==========

    /// Add a catalog product
    pub async fn add_product(&self, product: &ProductPayload) -> ClientResult<()> {
        self.remote.add_product(product).await
    }

    /// Update a catalog product
    pub async fn update_product(
        &self,
        product_id: &str,
        product: &ProductPayload,
    ) -> ClientResult<()> {
        self.remote.update_product(product_id, product).await
    }

    /// Delete a catalog product
    pub async fn delete_product(&self, product_id: &str) -> ClientResult<()> {
        self.remote.delete_product(product_id).await
    }

    /// Add a sales outlet
    pub async fn add_outlet(&self, outlet: &OutletPayload) -> ClientResult<()> {
        self.remote.add_outlet(outlet).await
    }

    /// Update a sales outlet
    pub async fn update_outlet(&self, outlet_id: &str, outlet: &OutletPayload) -> ClientResult<()> {
        self.remote.update_outlet(outlet_id, outlet).await
    }

    /// Delete a sales outlet
    pub async fn delete_outlet(&self, outlet_id: &str) -> ClientResult<()> {
        self.remote.delete_outlet(outlet_id).await
    }

    /// List all users
    pub async fn users(&self) -> ClientResult<Vec<User>> {
        self.remote.list_users().await
    }

    /// Change a user's role
    pub async fn update_user_role(&self, user_id: &str, role: UserRole) -> ClientResult<()> {
        self.remote.update_user_role(user_id, role).await
    }

    /// Delete a user
    pub async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        self.remote.delete_user(user_id).await
    }
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("logged_in", &self.is_logged_in())
            .field("stock", &self.stock)
            .field("orders", &self.orders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use shared::models::UserRole;

    fn seeded_remote() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.seed_outlet("O1", "Main street 1");
        remote.seed_user(
            User {
                id: "U1".to_string(),
                name: "Test".to_string(),
                surname: "User".to_string(),
                email: "test@example.com".to_string(),
                role: UserRole::User,
                phone: None,
                default_outlet_id: Some("O1".to_string()),
            },
            "secret",
            "token-u1",
        );
        remote
    }

    #[tokio::test]
    async fn test_login_installs_session() {
        let client = StorefrontClient::with_remote(Arc::new(seeded_remote()));
        assert!(!client.is_logged_in());

        let user = client.login("test@example.com", "secret").await.unwrap();
        assert_eq!(user.id, "U1");
        assert!(client.is_logged_in());
        assert_eq!(client.session().unwrap().token, "token-u1");

        client.logout();
        assert!(!client.is_logged_in());
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let client = StorefrontClient::with_remote(Arc::new(seeded_remote()));
        let err = client.login("test@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, crate::ClientError::Unauthorized));
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let client = StorefrontClient::with_remote(Arc::new(seeded_remote()));
        client
            .register(&RegisterRequest {
                name: "New".to_string(),
                surname: "Person".to_string(),
                email: "new@example.com".to_string(),
                password: "pw".to_string(),
                phone: None,
            })
            .await
            .unwrap();

        let user = client.login("new@example.com", "pw").await.unwrap();
        assert_eq!(user.email, "new@example.com");
    }

    #[tokio::test]
    async fn test_outlets_listing() {
        let client = StorefrontClient::with_remote(Arc::new(seeded_remote()));
        let outlets = client.outlets().await.unwrap();
        assert_eq!(outlets.len(), 1);
        assert_eq!(outlets[0].id, "O1");
    }

    #[tokio::test]
    async fn test_back_office_directory() {
        let client = StorefrontClient::with_remote(Arc::new(seeded_remote()));

        client
            .add_outlet(&OutletPayload {
                address: "Side street 2".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(client.outlets().await.unwrap().len(), 2);

        client
            .add_product(&ProductPayload {
                name: "Loafer".to_string(),
                description: String::new(),
                price: 74.0,
                image_path: None,
            })
            .await
            .unwrap();
        let products = client.products().await.unwrap();
        assert_eq!(products.len(), 1);

        let update = ProductPayload {
            name: "Loafer".to_string(),
            description: "Leather".to_string(),
            price: 79.0,
            image_path: None,
        };
        client.update_product(&products[0].id, &update).await.unwrap();
        assert_eq!(client.products().await.unwrap()[0].price, 79.0);

        client.delete_product(&products[0].id).await.unwrap();
        assert!(client.products().await.unwrap().is_empty());

        client
            .update_user_role("U1", UserRole::Admin)
            .await
            .unwrap();
        let users = client.users().await.unwrap();
        assert!(users.iter().any(|u| u.id == "U1" && u.is_admin()));
    }
}
