use storefront_api::{
    dto::products::{CreateProductRequest, UpdateProductRequest},
    error::AppError,
    routes::params::{AdminProductQuery, Pagination},
    services::admin_service,
};
use uuid::Uuid;

mod common;

fn create_request(category_id: Uuid, slug: String) -> CreateProductRequest {
    CreateProductRequest {
        name: "Admin Widget".into(),
        slug,
        description: Some("created through the admin api".into()),
        price: 2500,
        compare_price: None,
        sku: None,
        stock: 12,
        low_stock: None,
        is_active: None,
        is_featured: None,
        category_id,
    }
}

#[tokio::test]
async fn product_crud_requires_admin_role() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;

    let err = admin_service::create_product(
        &state,
        &customer,
        create_request(category, format!("gate-{}", Uuid::new_v4())),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

// The admin listing sees inactive products; the public catalog does not.
#[tokio::test]
async fn admin_listing_includes_inactive_products() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin").await?;
    let category = common::create_category(&state).await?;

    let slug = format!("hidden-{}", Uuid::new_v4());
    let mut request = create_request(category, slug.clone());
    request.is_active = Some(false);
    let created = admin_service::create_product(&state, &admin, request).await?;
    let product_id = created.data.expect("product").id;

    let listed = admin_service::list_products(
        &state,
        &admin,
        AdminProductQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(10),
            },
            search: Some(slug),
            is_active: Some(false),
        },
    )
    .await?;
    let items = listed.data.expect("products");
    assert!(items.iter().any(|p| p.id == product_id));

    Ok(())
}

#[tokio::test]
async fn admin_can_create_update_and_delete_products() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin").await?;
    let category = common::create_category(&state).await?;

    let created = admin_service::create_product(
        &state,
        &admin,
        create_request(category, format!("crud-{}", Uuid::new_v4())),
    )
    .await?;
    let product = created.data.expect("product");
    assert_eq!(product.price, 2500);
    assert_eq!(product.stock, 12);
    assert!(product.is_active);

    let updated = admin_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            name: None,
            slug: None,
            description: None,
            price: Some(1999),
            compare_price: Some(2500),
            sku: None,
            stock: None,
            low_stock: None,
            is_active: None,
            is_featured: Some(true),
            category_id: None,
        },
    )
    .await?;
    let updated = updated.data.expect("product");
    assert_eq!(updated.price, 1999);
    assert_eq!(updated.compare_price, Some(2500));
    assert!(updated.is_featured);
    // Untouched fields keep their values.
    assert_eq!(updated.name, "Admin Widget");
    assert_eq!(updated.stock, 12);

    admin_service::delete_product(&state, &admin, product.id).await?;
    let err = admin_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            name: None,
            slug: None,
            description: None,
            price: None,
            compare_price: None,
            sku: None,
            stock: None,
            low_stock: None,
            is_active: None,
            is_featured: None,
            category_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}
