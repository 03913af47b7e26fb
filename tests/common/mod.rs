#![allow(dead_code)]

use storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{AddressInput, CreateOrderRequest, OrderItemInput},
    middleware::auth::AuthUser,
    state::AppState,
};
use uuid::Uuid;

/// Build an AppState against the configured test database, or None when no
/// database is available so callers can skip.
pub async fn try_setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

/// Tests share one database, so every fixture gets unique identifiers instead
/// of truncating tables.
pub async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    let email = format!("test-{id}@example.com");
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role) VALUES ($1, $2, $3, 'dummy', $4)",
    )
    .bind(id)
    .bind(&email)
    .bind("Test User")
    .bind(role)
    .execute(&state.pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

pub async fn create_category(state: &AppState) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, slug) VALUES ($1, 'Test Category', $2)")
        .bind(id)
        .bind(format!("test-category-{id}"))
        .execute(&state.pool)
        .await?;
    Ok(id)
}

pub async fn create_product(
    state: &AppState,
    category_id: Uuid,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (id, name, slug, description, price, stock, category_id)
        VALUES ($1, $2, $3, 'test product', $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(format!("test-product-{id}"))
    .bind(price)
    .bind(stock)
    .bind(category_id)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

pub async fn product_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

pub async fn cart_row_count(state: &AppState, user: &AuthUser) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

pub async fn order_count(state: &AppState, user: &AuthUser) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

pub fn address(prefix: &str) -> AddressInput {
    AddressInput {
        first_name: format!("{prefix} First"),
        last_name: format!("{prefix} Last"),
        email: format!("{prefix}@example.com"),
        phone: "+1234567890".into(),
        address: "1 Test Street".into(),
        city: "Testville".into(),
        state: "TS".into(),
        zip_code: "12345".into(),
        country: "USA".into(),
    }
}

pub fn order_request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
    let subtotal: i64 = items
        .iter()
        .map(|i| i.price * i.quantity as i64)
        .sum();
    CreateOrderRequest {
        items,
        shipping_address: address("ship"),
        billing_address: address("bill"),
        payment_method: "card".into(),
        subtotal,
        tax_amount: 0,
        shipping_amount: 0,
        total: subtotal,
        notes: None,
    }
}
