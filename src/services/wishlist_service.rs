use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, WishlistItem},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<Vec<Product>>> {
    let (page, limit, offset) = pagination.normalize();
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT p.*
        FROM wishlist_items w
        JOIN products p ON p.id = w.product_id
        WHERE w.user_id = $1
        ORDER BY w.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlist_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", products, Some(meta)))
}

pub async fn add_to_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistItem>> {
    let product_exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    if product_exists.is_none() {
        return Err(AppError::NotFound);
    }

    let existing: Option<WishlistItem> =
        sqlx::query_as("SELECT * FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(product_id)
            .fetch_optional(pool)
            .await?;

    let item = if let Some(item) = existing {
        item
    } else {
        sqlx::query_as::<_, WishlistItem>(
            r#"
            INSERT INTO wishlist_items (id, user_id, product_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(product_id)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_add",
        Some("wishlist_items"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Added to wishlist",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
