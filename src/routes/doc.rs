use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{
            AddToCartRequest, CartItemDto, CartItemResponse, CartProduct, CartResponse,
            CartSummary, UpdateCartItemRequest,
        },
        orders::{
            AddressInput, AdminOrderList, AdminOrderRow, CreateOrderRequest, OrderCustomer,
            OrderDetail, OrderItemInput, OrderList, UpdateOrderRequest,
        },
        products::{
            CategoryList, CreateProductRequest, ProductDetail, ProductList, ProductSummary,
            UpdateProductRequest,
        },
        reviews::{CreateReviewRequest, ReviewList},
    },
    error::FieldError,
    models::{
        CartItem, Category, Order, OrderAddress, OrderItem, Product, ProductImage,
        ProductVariant, Review, User, WishlistItem,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, categories, health, orders, params, products, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        products::list_reviews,
        products::create_review,
        categories::list_categories,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        admin::list_all_orders,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product
    ),
    components(
        schemas(
            User,
            Product,
            ProductImage,
            ProductVariant,
            Category,
            CartItem,
            Order,
            OrderItem,
            OrderAddress,
            Review,
            WishlistItem,
            FieldError,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartProduct,
            CartItemDto,
            CartSummary,
            CartResponse,
            CartItemResponse,
            OrderItemInput,
            AddressInput,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderDetail,
            OrderList,
            OrderCustomer,
            AdminOrderRow,
            AdminOrderList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductSummary,
            ProductList,
            ProductDetail,
            CategoryList,
            CreateReviewRequest,
            ReviewList,
            wishlist::AddWishlistRequest,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            params::ProductQuery,
            params::OrderListQuery,
            params::AdminProductQuery,
            params::AdminOrderQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CartResponse>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<AdminOrderList>,
            ApiResponse<CategoryList>,
            ApiResponse<ReviewList>,
            ApiResponse<CartItemResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
