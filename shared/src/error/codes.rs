//! Unified error codes for the storefront client
//!
//! Error codes are shared between the client core and presentation layers.
//! They are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Outlet errors
//! - 4xxx: Order errors
//! - 5xxx: Stock errors
//! - 6xxx: Product errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Another mutation of the same entity is still in flight
    OperationInProgress = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Session has expired
    SessionExpired = 1005,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,

    // ==================== 3xxx: Outlet ====================
    /// No outlet selected
    OutletNotSelected = 3001,
    /// Outlet not found
    OutletNotFound = 3002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order item not found
    OrderItemNotFound = 4002,
    /// Order was already deleted
    OrderAlreadyDeleted = 4003,
    /// Order status does not permit the operation
    InvalidOrderState = 4004,
    /// The order was emptied but could not be deleted
    CascadeDeleteFailed = 4005,

    // ==================== 5xxx: Stock ====================
    /// Stock line not found
    StockLineNotFound = 5001,
    /// Quantity would go below zero
    InsufficientStock = 5002,
    /// Stock line already exists
    StockLineExists = 5003,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// The product has sizes and none was selected
    SizeRequired = 6002,
    /// The selected size is out of stock
    SizeUnavailable = 6003,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Email already registered
    EmailExists = 8002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Network error talking to the remote service
    NetworkError = 9002,
    /// Remote call timed out
    TimeoutError = 9003,
}

impl ErrorCode {
    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::OperationInProgress => "Operation already in progress",
            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid email or password",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::SessionExpired => "Session expired",
            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Administrator role required",
            Self::OutletNotSelected => "No sales outlet selected",
            Self::OutletNotFound => "Sales outlet not found",
            Self::OrderNotFound => "Order not found",
            Self::OrderItemNotFound => "Order item not found",
            Self::OrderAlreadyDeleted => "Order already deleted",
            Self::InvalidOrderState => "Order status does not permit this operation",
            Self::CascadeDeleteFailed => "Order emptied but could not be deleted",
            Self::StockLineNotFound => "Stock line not found",
            Self::InsufficientStock => "Insufficient stock",
            Self::StockLineExists => "Stock line already exists",
            Self::ProductNotFound => "Product not found",
            Self::SizeRequired => "A size must be selected",
            Self::SizeUnavailable => "The selected size is unavailable",
            Self::UserNotFound => "User not found",
            Self::EmailExists => "Email already registered",
            Self::InternalError => "Internal error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Request timed out",
        }
    }

    /// Numeric value of this code
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", *self as u16)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::OperationInProgress,
            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,
            1003 => Self::TokenExpired,
            1004 => Self::TokenInvalid,
            1005 => Self::SessionExpired,
            2001 => Self::PermissionDenied,
            2002 => Self::AdminRequired,
            3001 => Self::OutletNotSelected,
            3002 => Self::OutletNotFound,
            4001 => Self::OrderNotFound,
            4002 => Self::OrderItemNotFound,
            4003 => Self::OrderAlreadyDeleted,
            4004 => Self::InvalidOrderState,
            4005 => Self::CascadeDeleteFailed,
            5001 => Self::StockLineNotFound,
            5002 => Self::InsufficientStock,
            5003 => Self::StockLineExists,
            6001 => Self::ProductNotFound,
            6002 => Self::SizeRequired,
            6003 => Self::SizeUnavailable,
            8001 => Self::UserNotFound,
            8002 => Self::EmailExists,
            9001 => Self::InternalError,
            9002 => Self::NetworkError,
            9003 => Self::TimeoutError,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
