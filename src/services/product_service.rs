use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::{
        products::{CategoryList, ProductDetail, ProductList, ProductSummary},
        reviews::{CreateReviewRequest, ReviewList},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Category, Product, ProductImage, ProductVariant, Review},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
};

#[derive(FromRow)]
struct ProductListRow {
    #[sqlx(flatten)]
    product: Product,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_description: Option<String>,
    category_image: Option<String>,
    category_parent_id: Option<Uuid>,
    category_created_at: Option<DateTime<Utc>>,
    image_id: Option<Uuid>,
    image_url: Option<String>,
    image_alt: Option<String>,
    image_position: Option<i32>,
    average_rating: Option<f64>,
    review_count: Option<i64>,
}

impl ProductListRow {
    fn into_summary(self) -> ProductSummary {
        let category = match (&self.category_name, &self.category_slug) {
            (Some(name), Some(slug)) => Some(Category {
                id: self.product.category_id,
                name: name.clone(),
                slug: slug.clone(),
                description: self.category_description.clone(),
                image: self.category_image.clone(),
                parent_id: self.category_parent_id,
                created_at: self.category_created_at.unwrap_or_else(Utc::now),
            }),
            _ => None,
        };
        let image = self.image_id.map(|id| ProductImage {
            id,
            product_id: self.product.id,
            url: self.image_url.clone().unwrap_or_default(),
            alt: self.image_alt.clone(),
            position: self.image_position.unwrap_or(0),
        });
        ProductSummary {
            average_rating: self.average_rating.unwrap_or(0.0),
            review_count: self.review_count.unwrap_or(0),
            product: self.product,
            category,
            image,
        }
    }
}

/// Public catalog listing: active products only, with category slug filter,
/// case-insensitive search, whitelisted sort keys, and pagination.
pub async fn list_products(
    pool: &DbPool,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    // Sort identifiers come from a whitelist, so interpolation is safe;
    // everything user-supplied is bound.
    let sql = format!(
        r#"
        SELECT p.*,
               c.name AS category_name, c.slug AS category_slug,
               c.description AS category_description, c.image AS category_image,
               c.parent_id AS category_parent_id, c.created_at AS category_created_at,
               pi.id AS image_id, pi.url AS image_url, pi.alt AS image_alt,
               pi.position AS image_position,
               r.average_rating, r.review_count
        FROM products p
        LEFT JOIN categories c ON c.id = p.category_id
        LEFT JOIN LATERAL (
            SELECT id, url, alt, position
            FROM product_images
            WHERE product_id = p.id
            ORDER BY position ASC
            LIMIT 1
        ) pi ON TRUE
        LEFT JOIN LATERAL (
            SELECT AVG(rating)::FLOAT8 AS average_rating, COUNT(*) AS review_count
            FROM reviews
            WHERE product_id = p.id
        ) r ON TRUE
        WHERE p.is_active = TRUE
          AND ($1::TEXT IS NULL OR c.slug = $1)
          AND ($2::TEXT IS NULL OR p.name ILIKE '%' || $2 || '%' OR p.description ILIKE '%' || $2 || '%')
        ORDER BY p.{} {}
        LIMIT $3 OFFSET $4
        "#,
        sort_by.as_sql(),
        sort_order.as_sql(),
    );

    let rows = sqlx::query_as::<_, ProductListRow>(&sql)
        .bind(query.category.as_deref())
        .bind(query.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM products p
        LEFT JOIN categories c ON c.id = p.category_id
        WHERE p.is_active = TRUE
          AND ($1::TEXT IS NULL OR c.slug = $1)
          AND ($2::TEXT IS NULL OR p.name ILIKE '%' || $2 || '%' OR p.description ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(query.category.as_deref())
    .bind(query.search.as_deref())
    .fetch_one(pool)
    .await?;

    let items = rows.into_iter().map(ProductListRow::into_summary).collect();
    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let category: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(product.category_id)
        .fetch_optional(pool)
        .await?;

    let images: Vec<ProductImage> = sqlx::query_as(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY position ASC",
    )
    .bind(product.id)
    .fetch_all(pool)
    .await?;

    let variants: Vec<ProductVariant> =
        sqlx::query_as("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY name")
            .bind(product.id)
            .fetch_all(pool)
            .await?;

    let rating: (Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(rating)::FLOAT8, COUNT(*) FROM reviews WHERE product_id = $1",
    )
    .bind(product.id)
    .fetch_one(pool)
    .await?;

    let detail = ProductDetail {
        product,
        category,
        images,
        variants,
        average_rating: rating.0.unwrap_or(0.0),
        review_count: rating.1,
    };

    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_reviews(
    pool: &DbPool,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();
    let items: Vec<Review> = sqlx::query_as(
        r#"
        SELECT * FROM reviews
        WHERE product_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

/// One review per (user, product); the unique key turns a duplicate into
/// Conflict.
pub async fn create_review(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    payload.validate()?;

    let product_exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    if product_exists.is_none() {
        return Err(AppError::NotFound);
    }

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, product_id, user_id, rating, title, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user.user_id)
    .bind(payload.rating)
    .bind(payload.title)
    .bind(payload.comment)
    .fetch_one(pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("You have already reviewed this product".into())
        }
        _ => AppError::DbError(err),
    })?;

    Ok(ApiResponse::success(
        "Review created",
        review,
        Some(Meta::empty()),
    ))
}
