//! Product catalog model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::util::now_millis;

/// A catalog product
///
/// `price` and `stock` are the live values; orders snapshot both name and
/// unit price at placement time, so later edits never affect existing orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price (2 decimal places)
    pub price: Decimal,
    /// Units available for reservation
    pub stock: u32,
    #[serde(default)]
    pub category: Option<String>,
    /// Inactive products are hidden from the catalog and cannot be ordered
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn new(id: impl Into<String>, input: NewProduct) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            name: input.name,
            description: input.description.unwrap_or_default(),
            price: input.price,
            stock: input.stock,
            category: input.category,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now_millis();
    }
}

/// Payload for creating a product
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Payload for partially updating a product
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}
