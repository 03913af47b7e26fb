use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{
        AddToCartRequest, CartItemDto, CartItemResponse, CartProduct, CartResponse, CartSummary,
        UpdateCartItemRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Category, ProductImage},
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    slug: String,
    price: i64,
    stock: i32,
    image_id: Option<Uuid>,
    image_url: Option<String>,
    image_alt: Option<String>,
    image_position: Option<i32>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_description: Option<String>,
    category_image: Option<String>,
    category_parent_id: Option<Uuid>,
    category_created_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct ProductStockRow {
    id: Uuid,
    name: String,
    stock: i32,
}

/// Current cart plus the derived summary. Subtotal and item counts are
/// computed from the rows at response time, never stored.
pub async fn list_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartResponse>> {
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.slug, p.price, p.stock,
               pi.id AS image_id, pi.url AS image_url, pi.alt AS image_alt,
               pi.position AS image_position,
               c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
               c.description AS category_description, c.image AS category_image,
               c.parent_id AS category_parent_id, c.created_at AS category_created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        LEFT JOIN categories c ON c.id = p.category_id
        LEFT JOIN LATERAL (
            SELECT id, url, alt, position
            FROM product_images
            WHERE product_id = p.id
            ORDER BY position ASC
            LIMIT 1
        ) pi ON TRUE
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let mut subtotal: i64 = 0;
    let mut total_items: i64 = 0;
    let item_count = rows.len() as i64;

    let items = rows
        .into_iter()
        .map(|row| {
            subtotal += row.price * (row.quantity as i64);
            total_items += row.quantity as i64;

            let image = row.image_id.map(|id| ProductImage {
                id,
                product_id: row.product_id,
                url: row.image_url.clone().unwrap_or_default(),
                alt: row.image_alt.clone(),
                position: row.image_position.unwrap_or(0),
            });
            let category = match (row.category_id, &row.category_name, &row.category_slug) {
                (Some(id), Some(name), Some(slug)) => Some(Category {
                    id,
                    name: name.clone(),
                    slug: slug.clone(),
                    description: row.category_description.clone(),
                    image: row.category_image.clone(),
                    parent_id: row.category_parent_id,
                    created_at: row.category_created_at.unwrap_or_else(Utc::now),
                }),
                _ => None,
            };

            CartItemDto {
                id: row.cart_id,
                product: CartProduct {
                    id: row.product_id,
                    name: row.name,
                    slug: row.slug,
                    price: row.price,
                    stock: row.stock,
                    image,
                    category,
                },
                quantity: row.quantity,
            }
        })
        .collect();

    let data = CartResponse {
        items,
        summary: CartSummary {
            subtotal,
            total_items,
            item_count,
        },
    };

    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Upsert: an existing (user, product) row absorbs the new quantity by sum.
/// Stock is read-only context here; cart operations never mutate it.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItemResponse>> {
    payload.validate()?;

    let product: Option<ProductStockRow> = sqlx::query_as(
        "SELECT id, name, stock FROM products WHERE id = $1 AND is_active = TRUE",
    )
    .bind(payload.product_id)
    .fetch_optional(pool)
    .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    let requested = match &existing {
        Some(item) => item.quantity + payload.quantity,
        None => payload.quantity,
    };
    if requested > product.stock {
        return Err(AppError::InsufficientStock {
            product: product.name,
            product_id: product.id,
            available: product.stock,
            requested,
        });
    }

    let cart_item = if let Some(item) = existing {
        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(user.user_id)
        .bind(requested)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(payload.product_id)
        .bind(requested)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item added to cart",
        CartItemResponse { item: cart_item },
        None,
    ))
}

/// Quantity zero removes the row outright, observationally identical to
/// remove_from_cart.
pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    payload.validate()?;

    #[derive(FromRow)]
    struct ItemWithStock {
        id: Uuid,
        product_name: String,
        product_id: Uuid,
        stock: i32,
    }

    let item: Option<ItemWithStock> = sqlx::query_as(
        r#"
        SELECT ci.id, p.name AS product_name, p.id AS product_id, p.stock
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND ci.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .fetch_optional(pool)
    .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    if payload.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item.id)
            .execute(pool)
            .await?;
        return Ok(ApiResponse::success(
            "Item removed from cart",
            serde_json::json!({}),
            Some(Meta::empty()),
        ));
    }

    if payload.quantity > item.stock {
        return Err(AppError::InsufficientStock {
            product: item.product_name,
            product_id: item.product_id,
            available: item.stock,
            requested: payload.quantity,
        });
    }

    let updated: CartItem = sqlx::query_as(
        r#"
        UPDATE cart_items
        SET quantity = $2, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(item.id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Cart item updated",
        serde_json::json!({ "item": updated }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Item removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
