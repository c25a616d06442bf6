//! Catalog types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furnish_core::{CategoryId, Price, ProductId};

/// A product category, e.g. sofas or lighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub handle: String,
    pub name: String,
    pub image: Option<String>,
}

/// 3D asset used for the in-room preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArModel {
    /// Bundled asset reference, e.g. `models/klippan_sofa.glb`.
    pub asset: String,
    /// Uniform scale applied when the model is placed.
    pub scale: f32,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub handle: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: CategoryId,
    /// Denormalized for search and display.
    pub category_name: String,
    pub image: Option<String>,
    pub ar_model: Option<ArModel>,
    pub in_stock: bool,
}

impl Product {
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::gbp(self.price)
    }
}

/// Category as loaded by the seeder.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub handle: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Product as loaded by the seeder. The category is referenced by handle.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ar_model: Option<ArModel>,
    #[serde(default = "in_stock_default")]
    pub in_stock: bool,
}

const fn in_stock_default() -> bool {
    true
}
