//! # REST API for Discounts

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tracing::info;

use crate::backend::io::rest::auth::CurrentUser;
use crate::backend::io::rest::error::ApiError;
use crate::backend::io::rest::extract::ApiPath;
use crate::backend::AppState;
use shared::DiscountResponse;

/// Create a router for discount related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/:organization_id", get(get_discount))
}

/// Current discount of the caller at an organization
pub async fn get_discount(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(organization_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/discounts/{} by user {}", organization_id, user.id);

    let discount_percentage = state.discount_service.discount_for(user.id, organization_id).await?;
    Ok(Json(DiscountResponse { discount_percentage }))
}
