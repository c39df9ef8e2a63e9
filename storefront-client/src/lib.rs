//! Storefront client
//!
//! Client-side state and consistency management for a small retail
//! operation: per-outlet stock projections, booking with per-line
//! single-flight locking, and order/item lifecycle with cascading
//! deletion, all reconciled against a remote service that is the only
//! source of truth.

pub mod booking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod locks;
pub mod memory;
pub mod orders;
pub mod remote;
pub mod session;
pub mod stock;

pub use booking::{BookingCoordinator, BookingError, BookingReceipt, BookingRequest};
pub use client::StorefrontClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use locks::OperationLockTable;
pub use memory::MemoryRemote;
pub use orders::{ItemDeletion, OrderDesk, OrderError, OrderEvent};
pub use remote::{HttpRemote, RemoteStore};
pub use session::SessionContext;
pub use stock::{StockError, StockRegistry};

// Re-export shared types for convenience
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use shared::models;
pub use shared::request;
