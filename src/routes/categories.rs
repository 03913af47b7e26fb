use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::products::CategoryList,
    error::AppResult,
    response::ApiResponse,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = product_service::list_categories(&state.pool).await?;
    Ok(Json(resp))
}
