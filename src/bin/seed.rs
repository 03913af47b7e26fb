use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use storefront_api::{config::AppConfig, db::create_pool, middleware::auth};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(
        &pool,
        "admin@ecommerce.com",
        "admin123",
        Some("Admin User"),
        auth::ROLE_ADMIN,
    )
    .await?;
    let customer_id = ensure_user(
        &pool,
        "john.doe@example.com",
        "customer123",
        Some("John Doe"),
        auth::ROLE_CUSTOMER,
    )
    .await?;

    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    name: Option<&str>,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let electronics = ensure_category(pool, "Electronics", "electronics", None).await?;
    let smartphones =
        ensure_category(pool, "Smartphones", "smartphones", Some(electronics)).await?;
    let laptops = ensure_category(pool, "Laptops", "laptops", Some(electronics)).await?;

    let products = [
        ("Aurora Phone X", "aurora-phone-x", 79900, 25, smartphones),
        ("Aurora Phone Lite", "aurora-phone-lite", 49900, 60, smartphones),
        ("Borealis Laptop 14", "borealis-laptop-14", 129900, 15, laptops),
        ("Borealis Laptop 16", "borealis-laptop-16", 169900, 8, laptops),
        ("USB-C Charger 65W", "usb-c-charger-65w", 3900, 200, electronics),
    ];

    for (name, slug, price, stock, category_id) in products {
        let product_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, slug, description, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(format!("{name} - seeded demo product"))
        .bind(price)
        .bind(stock)
        .bind(category_id)
        .fetch_optional(pool)
        .await?;

        if let Some((id,)) = product_id {
            sqlx::query(
                r#"
                INSERT INTO product_images (id, product_id, url, alt, position)
                VALUES ($1, $2, $3, $4, 0)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(format!("https://images.example.com/{slug}.jpg"))
            .bind(name)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    name: &str,
    slug: &str,
    parent_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug, parent_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(parent_id)
    .fetch_optional(pool)
    .await?;

    let id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };
    Ok(id)
}
