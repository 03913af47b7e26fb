use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, FieldError};
use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.rating < 1 || self.rating > 5 {
            return Err(AppError::Validation(vec![FieldError::new(
                "rating",
                "must be between 1 and 5",
            )]));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<Review>,
}
