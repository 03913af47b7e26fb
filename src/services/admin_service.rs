use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        orders::{AdminOrderList, AdminOrderRow, OrderCustomer},
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product},
    response::{ApiResponse, Meta},
    routes::params::{AdminOrderQuery, AdminProductQuery},
    state::AppState,
};

#[derive(FromRow)]
struct AdminOrderDbRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: String,
    payment_status: String,
    payment_method: String,
    subtotal: i64,
    tax_amount: i64,
    shipping_amount: i64,
    total: i64,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_name: Option<String>,
    customer_email: String,
}

/// Every order in the system, filterable by status/payment status and a text
/// search over order number and customer name/email.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let rows = sqlx::query_as::<_, AdminOrderDbRow>(
        r#"
        SELECT o.*, u.name AS customer_name, u.email AS customer_email
        FROM orders o
        JOIN users u ON u.id = o.user_id
        WHERE ($1::TEXT IS NULL OR o.status = $1)
          AND ($2::TEXT IS NULL OR o.payment_status = $2)
          AND ($3::TEXT IS NULL
               OR o.order_number ILIKE '%' || $3 || '%'
               OR u.name ILIKE '%' || $3 || '%'
               OR u.email ILIKE '%' || $3 || '%')
        ORDER BY o.created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.status.as_deref().filter(|s| !s.is_empty()))
    .bind(query.payment_status.as_deref().filter(|s| !s.is_empty()))
    .bind(query.search.as_deref().filter(|s| !s.is_empty()))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM orders o
        JOIN users u ON u.id = o.user_id
        WHERE ($1::TEXT IS NULL OR o.status = $1)
          AND ($2::TEXT IS NULL OR o.payment_status = $2)
          AND ($3::TEXT IS NULL
               OR o.order_number ILIKE '%' || $3 || '%'
               OR u.name ILIKE '%' || $3 || '%'
               OR u.email ILIKE '%' || $3 || '%')
        "#,
    )
    .bind(query.status.as_deref().filter(|s| !s.is_empty()))
    .bind(query.payment_status.as_deref().filter(|s| !s.is_empty()))
    .bind(query.search.as_deref().filter(|s| !s.is_empty()))
    .fetch_one(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| AdminOrderRow {
            order: Order {
                id: row.id,
                order_number: row.order_number,
                user_id: row.user_id,
                status: row.status,
                payment_status: row.payment_status,
                payment_method: row.payment_method,
                subtotal: row.subtotal,
                tax_amount: row.tax_amount,
                shipping_amount: row.shipping_amount,
                total: row.total,
                tracking_number: row.tracking_number,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            customer: OrderCustomer {
                id: row.user_id,
                name: row.customer_name,
                email: row.customer_email,
            },
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(meta),
    ))
}

/// Product listing for the admin console. Unlike the public catalog this
/// includes inactive products.
pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    query: AdminProductQuery,
) -> AppResult<ApiResponse<Vec<Product>>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let items = sqlx::query_as::<_, Product>(
        r#"
        SELECT *
        FROM products
        WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%')
          AND ($2::BOOLEAN IS NULL OR is_active = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.search.as_deref().filter(|s| !s.is_empty()))
    .bind(query.is_active)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM products
        WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%')
          AND ($2::BOOLEAN IS NULL OR is_active = $2)
        "#,
    )
    .bind(query.search.as_deref().filter(|s| !s.is_empty()))
    .bind(query.is_active)
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Products", items, Some(meta)))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let category_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
        .bind(payload.category_id)
        .fetch_optional(&state.pool)
        .await?;
    if category_exists.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products
            (id, name, slug, description, price, compare_price, sku, stock,
             low_stock, is_active, is_featured, category_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.slug)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.compare_price)
    .bind(payload.sku)
    .bind(payload.stock)
    .bind(payload.low_stock.unwrap_or(5))
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.is_featured.unwrap_or(false))
    .bind(payload.category_id)
    .fetch_one(&state.pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("A product with this slug already exists".into())
        }
        _ => AppError::DbError(err),
    })?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let slug = payload.slug.unwrap_or(existing.slug);
    let description = payload.description.or(existing.description);
    let price = payload.price.unwrap_or(existing.price);
    let compare_price = payload.compare_price.or(existing.compare_price);
    let sku = payload.sku.or(existing.sku);
    let stock = payload.stock.unwrap_or(existing.stock);
    let low_stock = payload.low_stock.unwrap_or(existing.low_stock);
    let is_active = payload.is_active.unwrap_or(existing.is_active);
    let is_featured = payload.is_featured.unwrap_or(existing.is_featured);
    let category_id = payload.category_id.unwrap_or(existing.category_id);

    let product: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET name = $2, slug = $3, description = $4, price = $5, compare_price = $6,
            sku = $7, stock = $8, low_stock = $9, is_active = $10, is_featured = $11,
            category_id = $12, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(description)
    .bind(price)
    .bind(compare_price)
    .bind(sku)
    .bind(stock)
    .bind(low_stock)
    .bind(is_active)
    .bind(is_featured)
    .bind(category_id)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
