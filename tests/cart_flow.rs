use storefront_api::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppError,
    services::cart_service,
};

mod common;

// Adding the same product twice merges into one row with the summed quantity.
#[tokio::test]
async fn double_add_merges_into_one_row() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Merge Widget", 1000, 10).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: 2,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: 3,
        },
    )
    .await?;

    let cart = cart_service::list_cart(&state.pool, &user).await?;
    let cart = cart.data.expect("cart data");
    assert_eq!(cart.items.len(), 1, "expected a single merged row");
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.summary.total_items, 5);
    assert_eq!(cart.summary.subtotal, 5000);

    Ok(())
}

#[tokio::test]
async fn add_beyond_stock_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Scarce Widget", 1000, 3).await?;

    // Initial add within stock succeeds.
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: 2,
        },
    )
    .await?;

    // The merged quantity (2 + 2) would exceed stock 3.
    let err = cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 3);
            assert_eq!(requested, 4);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Cart row is untouched by the failed add.
    let cart = cart_service::list_cart(&state.pool, &user).await?;
    assert_eq!(cart.data.expect("cart data").items[0].quantity, 2);

    Ok(())
}

// Updating to quantity zero and deleting are observationally equivalent.
#[tokio::test]
async fn update_to_zero_behaves_like_remove() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product_a = common::create_product(&state, category, "Widget A", 500, 10).await?;
    let product_b = common::create_product(&state, category, "Widget B", 700, 10).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product_a,
            quantity: 1,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product_b,
            quantity: 1,
        },
    )
    .await?;

    let cart = cart_service::list_cart(&state.pool, &user).await?;
    let items = cart.data.expect("cart data").items;
    let item_a = items.iter().find(|i| i.product.id == product_a).unwrap().id;
    let item_b = items.iter().find(|i| i.product.id == product_b).unwrap().id;

    cart_service::update_cart_item(
        &state.pool,
        &user,
        item_a,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    cart_service::remove_from_cart(&state.pool, &user, item_b).await?;

    let cart = cart_service::list_cart(&state.pool, &user).await?;
    let cart = cart.data.expect("cart data");
    assert!(cart.items.is_empty(), "both rows should be gone");
    assert_eq!(cart.summary.subtotal, 0);
    assert_eq!(cart.summary.total_items, 0);

    Ok(())
}

#[tokio::test]
async fn foreign_cart_items_are_invisible() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let owner = common::create_user(&state, "customer").await?;
    let stranger = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Private Widget", 500, 10).await?;

    let added = cart_service::add_to_cart(
        &state.pool,
        &owner,
        AddToCartRequest {
            product_id: product,
            quantity: 1,
        },
    )
    .await?;
    let item_id = added.data.expect("item").item.id;

    let err = cart_service::update_cart_item(
        &state.pool,
        &stranger,
        item_id,
        UpdateCartItemRequest { quantity: 2 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = cart_service::remove_from_cart(&state.pool, &stranger, item_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Owner still has the row.
    assert_eq!(common::cart_row_count(&state, &owner).await?, 1);

    Ok(())
}
