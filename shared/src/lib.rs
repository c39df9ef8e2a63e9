//! Shared types for the storefront client
//!
//! Common types used across crates: domain models, the unified error
//! system, and request payload types.

pub mod error;
pub mod models;
pub mod request;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
