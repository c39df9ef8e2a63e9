//! Sales Outlet Model

use serde::{Deserialize, Serialize};

/// Physical sales outlet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesOutlet {
    pub id: String,
    pub address: String,
}
