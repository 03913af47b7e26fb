use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};
use crate::models::{Order, OrderAddress, OrderItem};

pub const PAYMENT_METHODS: [&str; 3] = ["card", "paypal", "cash_on_delivery"];

pub const ORDER_STATUSES: [&str; 7] = [
    "pending",
    "confirmed",
    "processing",
    "shipped",
    "delivered",
    "cancelled",
    "refunded",
];

pub const PAYMENT_STATUSES: [&str; 4] = ["pending", "paid", "failed", "refunded"];

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price as asserted by the client; stored as the line-item snapshot
    /// without recomputation.
    pub price: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl AddressInput {
    fn validate_into(&self, prefix: &str, errors: &mut Vec<FieldError>) {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("{prefix}.{field}"),
                    "must not be empty",
                ));
            }
        }
        if !self.email.contains('@') {
            errors.push(FieldError::new(
                format!("{prefix}.email"),
                "must be a valid email address",
            ));
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub shipping_address: AddressInput,
    pub billing_address: AddressInput,
    pub payment_method: String,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub shipping_amount: i64,
    pub total: i64,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        if self.items.is_empty() {
            errors.push(FieldError::new("items", "must contain at least one item"));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.quantity <= 0 {
                errors.push(FieldError::new(
                    format!("items[{i}].quantity"),
                    "must be positive",
                ));
            }
            if item.price <= 0 {
                errors.push(FieldError::new(
                    format!("items[{i}].price"),
                    "must be positive",
                ));
            }
        }

        self.shipping_address
            .validate_into("shipping_address", &mut errors);
        self.billing_address
            .validate_into("billing_address", &mut errors);

        if !PAYMENT_METHODS.contains(&self.payment_method.as_str()) {
            errors.push(FieldError::new(
                "payment_method",
                format!("must be one of: {}", PAYMENT_METHODS.join(", ")),
            ));
        }
        if self.subtotal <= 0 {
            errors.push(FieldError::new("subtotal", "must be positive"));
        }
        if self.tax_amount < 0 {
            errors.push(FieldError::new("tax_amount", "must not be negative"));
        }
        if self.shipping_amount < 0 {
            errors.push(FieldError::new("shipping_amount", "must not be negative"));
        }
        if self.total <= 0 {
            errors.push(FieldError::new("total", "must be positive"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Partial update: only supplied fields change. Status values are checked for
/// enum membership but no transition table is enforced.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub tracking_number: Option<String>,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Some(status) = &self.status {
            if !ORDER_STATUSES.contains(&status.as_str()) {
                errors.push(FieldError::new(
                    "status",
                    format!("must be one of: {}", ORDER_STATUSES.join(", ")),
                ));
            }
        }
        if let Some(payment_status) = &self.payment_status {
            if !PAYMENT_STATUSES.contains(&payment_status.as_str()) {
                errors.push(FieldError::new(
                    "payment_status",
                    format!("must be one of: {}", PAYMENT_STATUSES.join(", ")),
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<OrderAddress>,
    pub billing_address: Option<OrderAddress>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCustomer {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderRow {
    #[serde(flatten)]
    pub order: Order,
    pub customer: OrderCustomer,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderList {
    pub items: Vec<AdminOrderRow>,
}
