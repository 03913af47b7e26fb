use storefront_api::{
    dto::{
        cart::AddToCartRequest,
        orders::{OrderItemInput, UpdateOrderRequest},
    },
    error::AppError,
    routes::params::{AdminOrderQuery, Pagination},
    services::{admin_service, cart_service, order_service},
};

mod common;

// Full placement: stock decremented, order populated, cart emptied, prices
// and addresses snapshotted.
#[tokio::test]
async fn successful_placement_decrements_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Checkout Widget", 1500, 10).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: product,
            quantity: 2,
        },
    )
    .await?;

    let resp = order_service::place_order(
        &state,
        &user,
        common::order_request(vec![OrderItemInput {
            product_id: product,
            quantity: 2,
            price: 1500,
        }]),
    )
    .await?;
    let detail = resp.data.expect("order detail");

    assert_eq!(detail.order.status, "pending");
    assert_eq!(detail.order.payment_status, "pending");
    assert_eq!(detail.order.total, 3000);
    assert!(detail.order.order_number.starts_with("ORD-"));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);
    assert_eq!(detail.items[0].price, 1500);

    let shipping = detail.shipping_address.expect("shipping snapshot");
    assert_eq!(shipping.kind, "shipping");
    assert_eq!(shipping.first_name, "ship First");
    let billing = detail.billing_address.expect("billing snapshot");
    assert_eq!(billing.kind, "billing");

    assert_eq!(common::product_stock(&state, product).await?, 8);
    assert_eq!(common::cart_row_count(&state, &user).await?, 0);

    Ok(())
}

// A single unsatisfiable line fails the whole order: nothing is decremented,
// no order rows appear, the cart survives.
#[tokio::test]
async fn mixed_cart_failure_rolls_back_everything() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let plenty = common::create_product(&state, category, "Plenty Widget", 1000, 5).await?;
    let scarce = common::create_product(&state, category, "Scarce Widget", 2000, 2).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: plenty,
            quantity: 3,
        },
    )
    .await?;

    let err = order_service::place_order(
        &state,
        &user,
        common::order_request(vec![
            OrderItemInput {
                product_id: plenty,
                quantity: 3,
                price: 1000,
            },
            OrderItemInput {
                product_id: scarce,
                quantity: 10,
                price: 2000,
            },
        ]),
    )
    .await
    .unwrap_err();

    match err {
        AppError::InsufficientStock {
            product,
            product_id,
            available,
            requested,
        } => {
            assert_eq!(product, "Scarce Widget");
            assert_eq!(product_id, scarce);
            assert_eq!(available, 2);
            assert_eq!(requested, 10);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(common::product_stock(&state, plenty).await?, 5);
    assert_eq!(common::product_stock(&state, scarce).await?, 2);
    assert_eq!(common::order_count(&state, &user).await?, 0);
    assert_eq!(common::cart_row_count(&state, &user).await?, 1);

    Ok(())
}

#[tokio::test]
async fn missing_product_aborts_placement() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "customer").await?;

    let err = order_service::place_order(
        &state,
        &user,
        common::order_request(vec![OrderItemInput {
            product_id: uuid::Uuid::new_v4(),
            quantity: 1,
            price: 1000,
        }]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(common::order_count(&state, &user).await?, 0);

    Ok(())
}

// Two simultaneous orders for the last unit: exactly one wins, stock ends at
// zero and never goes negative.
#[tokio::test]
async fn concurrent_orders_for_last_unit_serialize() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user_a = common::create_user(&state, "customer").await?;
    let user_b = common::create_user(&state, "customer").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Last Unit Widget", 9900, 1).await?;

    let request = || {
        common::order_request(vec![OrderItemInput {
            product_id: product,
            quantity: 1,
            price: 9900,
        }])
    };

    let (res_a, res_b) = tokio::join!(
        order_service::place_order(&state, &user_a, request()),
        order_service::place_order(&state, &user_b, request()),
    );

    let successes = [res_a.is_ok(), res_b.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1, "exactly one order must win the last unit");

    for res in [res_a, res_b] {
        if let Err(err) = res {
            assert!(
                matches!(err, AppError::InsufficientStock { .. }),
                "loser must fail with InsufficientStock, got {err:?}"
            );
        }
    }

    assert_eq!(common::product_stock(&state, product).await?, 0);

    Ok(())
}

#[tokio::test]
async fn order_update_is_partial_and_permission_checked() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let owner = common::create_user(&state, "customer").await?;
    let stranger = common::create_user(&state, "customer").await?;
    let admin = common::create_user(&state, "admin").await?;
    let category = common::create_category(&state).await?;
    let product = common::create_product(&state, category, "Update Widget", 1000, 10).await?;

    let placed = order_service::place_order(
        &state,
        &owner,
        common::order_request(vec![OrderItemInput {
            product_id: product,
            quantity: 1,
            price: 1000,
        }]),
    )
    .await?;
    let order_id = placed.data.expect("order").order.id;

    // A stranger cannot touch it.
    let err = order_service::update_order(
        &state,
        &stranger,
        order_id,
        UpdateOrderRequest {
            status: Some("shipped".into()),
            payment_status: None,
            tracking_number: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Admin updates status and tracking; payment status is untouched.
    let updated = order_service::update_order(
        &state,
        &admin,
        order_id,
        UpdateOrderRequest {
            status: Some("shipped".into()),
            payment_status: None,
            tracking_number: Some("TRACK-123".into()),
        },
    )
    .await?;
    let order = updated.data.expect("order").order;
    assert_eq!(order.status, "shipped");
    assert_eq!(order.payment_status, "pending");
    assert_eq!(order.tracking_number.as_deref(), Some("TRACK-123"));

    // No transition table: moving backwards is accepted.
    let reverted = order_service::update_order(
        &state,
        &owner,
        order_id,
        UpdateOrderRequest {
            status: Some("pending".into()),
            payment_status: None,
            tracking_number: None,
        },
    )
    .await?;
    assert_eq!(reverted.data.expect("order").order.status, "pending");

    Ok(())
}

#[tokio::test]
async fn admin_order_listing_enforces_role() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::create_user(&state, "customer").await?;
    let admin = common::create_user(&state, "admin").await?;

    let query = || AdminOrderQuery {
        pagination: Pagination {
            page: Some(1),
            per_page: Some(10),
        },
        status: None,
        payment_status: None,
        search: None,
    };

    let err = admin_service::list_all_orders(&state, &customer, query())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    admin_service::list_all_orders(&state, &admin, query()).await?;

    Ok(())
}
