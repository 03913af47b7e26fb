use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};
use crate::models::{Category, Product, ProductImage, ProductVariant};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: i64,
    pub compare_price: Option<i64>,
    pub sku: Option<String>,
    pub stock: i32,
    pub low_stock: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub category_id: Uuid,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.slug.trim().is_empty() {
            errors.push(FieldError::new("slug", "must not be empty"));
        }
        if self.price <= 0 {
            errors.push(FieldError::new("price", "must be positive"));
        }
        if self.stock < 0 {
            errors.push(FieldError::new("stock", "must not be negative"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub compare_price: Option<i64>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub low_stock: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub category_id: Option<Uuid>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push(FieldError::new("name", "must not be empty"));
            }
        }
        if let Some(price) = self.price {
            if price <= 0 {
                errors.push(FieldError::new("price", "must be positive"));
            }
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                errors.push(FieldError::new("stock", "must not be negative"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Catalog listing row: product plus the context the storefront renders with.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub image: Option<ProductImage>,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}
