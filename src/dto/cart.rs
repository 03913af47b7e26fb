use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};
use crate::models::{CartItem, Category, ProductImage};

/// Upper bound on a single cart line, matching the storefront UI limit.
pub const MAX_CART_QUANTITY: i32 = 99;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl AddToCartRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.quantity < 1 || self.quantity > MAX_CART_QUANTITY {
            return Err(AppError::Validation(vec![FieldError::new(
                "quantity",
                format!("must be between 1 and {MAX_CART_QUANTITY}"),
            )]));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

impl UpdateCartItemRequest {
    /// Zero is allowed here: it means "remove the line".
    pub fn validate(&self) -> Result<(), AppError> {
        if self.quantity < 0 || self.quantity > MAX_CART_QUANTITY {
            return Err(AppError::Validation(vec![FieldError::new(
                "quantity",
                format!("must be between 0 and {MAX_CART_QUANTITY}"),
            )]));
        }
        Ok(())
    }
}

/// Enough product context to render a cart line without further lookups.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartProduct {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub stock: i32,
    pub image: Option<ProductImage>,
    pub category: Option<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product: CartProduct,
    pub quantity: i32,
}

/// Derived at response time from current cart rows; never persisted.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartSummary {
    pub subtotal: i64,
    pub total_items: i64,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartItemDto>,
    pub summary: CartSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub item: CartItem,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_rejects_out_of_range_quantities() {
        for quantity in [0, -1, 100] {
            let req = AddToCartRequest {
                product_id: Uuid::new_v4(),
                quantity,
            };
            assert!(req.validate().is_err(), "quantity {quantity} should fail");
        }
    }

    #[test]
    fn update_request_accepts_zero() {
        let req = UpdateCartItemRequest { quantity: 0 };
        assert!(req.validate().is_ok());
    }
}
