use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

/// One field-level validation failure, reported before any mutation happens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Invalid request data")]
    Validation(Vec<FieldError>),

    #[error("Insufficient stock for {product}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        product_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable error kind rendered alongside the human message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation_failed",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::Conflict(_) => "conflict",
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail stays server-side; the caller gets an opaque message.
        let message = match &self {
            AppError::DbError(err) => {
                tracing::error!(error = %err, "database error");
                "Internal Server Error".to_string()
            }
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "orm error");
                "Internal Server Error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            AppError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };

        let body = ApiResponse {
            message,
            data: Some(ErrorData {
                error: self.kind(),
                details,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Map a unique-key violation onto Conflict, leaving other DB errors untouched.
pub fn conflict_on_unique(err: sea_orm::DbErr, message: &str) -> AppError {
    match &err {
        sea_orm::DbErr::Query(runtime_err) | sea_orm::DbErr::Exec(runtime_err) => {
            if runtime_err.to_string().contains("duplicate key") {
                return AppError::Conflict(message.to_string());
            }
            AppError::OrmError(err)
        }
        _ => AppError::OrmError(err),
    }
}

pub type AppResult<T> = Result<T, AppError>;
