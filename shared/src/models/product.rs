//! Product Model

use serde::{Deserialize, Serialize};

/// Catalog product (read-mostly; the consistency core never mutates it)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Price in currency unit
    pub price: f64,
    #[serde(default)]
    pub image: Option<ProductImage>,
}

/// Product image reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: String,
    pub product_id: String,
    pub image_path: String,
}
