use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{AddressInput, CreateOrderRequest, OrderDetail, OrderList, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_addresses::{
            ActiveModel as AddressActive, Column as AddressCol, Entity as OrderAddresses,
            Model as AddressModel,
        },
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, conflict_on_unique},
    middleware::auth::AuthUser,
    models::{Order, OrderAddress, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// External, human-readable order identity: a millisecond timestamp prefix
/// plus a short random suffix. A unique-key collision on insert surfaces as
/// Conflict rather than a silent retry.
pub fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        Utc::now().timestamp_millis(),
        suffix[..8].to_uppercase()
    )
}

/// Place an order as one all-or-nothing transaction: re-validate stock under
/// row locks, decrement it, create header + address snapshots + line items,
/// clear the cart. Any failure rolls the whole thing back.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    payload.validate()?;

    let txn = state.orm.begin().await?;

    // Stock is re-read inside the transaction; the advisory checks the cart
    // did earlier count for nothing here.
    for item in &payload.items {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let product = match product {
            Some(p) => p,
            None => return Err(AppError::NotFound),
        };
        if product.stock < item.quantity {
            return Err(AppError::InsufficientStock {
                product: product.name,
                product_id: product.id,
                available: product.stock,
                requested: item.quantity,
            });
        }
    }

    // Sole writer of stock decrements in the system.
    for item in &payload.items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;
    }

    let order_id = Uuid::new_v4();
    let order_number = generate_order_number();

    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(order_number),
        user_id: Set(user.user_id),
        status: Set("pending".into()),
        payment_status: Set("pending".into()),
        payment_method: Set(payload.payment_method.clone()),
        subtotal: Set(payload.subtotal),
        tax_amount: Set(payload.tax_amount),
        shipping_amount: Set(payload.shipping_amount),
        total: Set(payload.total),
        tracking_number: Set(None),
        notes: Set(payload.notes.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| conflict_on_unique(err, "Order number conflict. Please try again."))?;

    let shipping = insert_address(&txn, order.id, "shipping", &payload.shipping_address).await?;
    let billing = insert_address(&txn, order.id, "billing", &payload.billing_address).await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for item in &payload.items {
        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            // Client-asserted unit price, captured as the permanent snapshot.
            price: Set(item.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_from_entity(inserted));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "order_number": order.order_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created successfully",
        OrderDetail {
            order: order_from_entity(order),
            items: order_items,
            shipping_address: Some(address_from_entity(shipping)),
            billing_address: Some(address_from_entity(billing)),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let detail = load_detail(state, order).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

/// Partial update of status, payment status and tracking number; owner or
/// admin only. Any enum member may follow any other.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    payload.validate()?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::NotFound);
    }

    let mut active: OrderActive = order.into();
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(payment_status) = payload.payment_status {
        active.payment_status = Set(payment_status);
    }
    if let Some(tracking_number) = payload.tracking_number {
        active.tracking_number = Set(Some(tracking_number));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_updated",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = load_detail(state, order).await?;
    Ok(ApiResponse::success(
        "Order updated successfully",
        detail,
        Some(Meta::empty()),
    ))
}

async fn load_detail(state: &AppState, order: OrderModel) -> AppResult<OrderDetail> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    let addresses = OrderAddresses::find()
        .filter(AddressCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let mut shipping = None;
    let mut billing = None;
    for addr in addresses {
        match addr.kind.as_str() {
            "shipping" => shipping = Some(address_from_entity(addr)),
            "billing" => billing = Some(address_from_entity(addr)),
            _ => {}
        }
    }

    Ok(OrderDetail {
        order: order_from_entity(order),
        items,
        shipping_address: shipping,
        billing_address: billing,
    })
}

async fn insert_address(
    txn: &sea_orm::DatabaseTransaction,
    order_id: Uuid,
    kind: &str,
    input: &AddressInput,
) -> AppResult<AddressModel> {
    let model = AddressActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        kind: Set(kind.into()),
        first_name: Set(input.first_name.clone()),
        last_name: Set(input.last_name.clone()),
        email: Set(input.email.clone()),
        phone: Set(input.phone.clone()),
        address: Set(input.address.clone()),
        city: Set(input.city.clone()),
        state: Set(input.state.clone()),
        zip_code: Set(input.zip_code.clone()),
        country: Set(input.country.clone()),
    }
    .insert(txn)
    .await?;
    Ok(model)
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        subtotal: model.subtotal,
        tax_amount: model.tax_amount,
        shipping_amount: model.shipping_amount,
        total: model.total,
        tracking_number: model.tracking_number,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn address_from_entity(model: AddressModel) -> OrderAddress {
    OrderAddress {
        id: model.id,
        order_id: model.order_id,
        kind: model.kind,
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
        phone: model.phone,
        address: model.address,
        city: model.city,
        state: model.state,
        zip_code: model.zip_code,
        country: model.country,
    }
}
