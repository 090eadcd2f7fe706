//! # REST API for Organization Discount Policies

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::put,
    Router,
};
use tracing::info;

use crate::backend::io::rest::auth::CurrentUser;
use crate::backend::io::rest::error::ApiError;
use crate::backend::io::rest::extract::{ApiJson, ApiPath};
use crate::backend::io::rest::mappers::organization_mapper::OrganizationMapper;
use crate::backend::AppState;
use shared::UpdateDiscountPolicyRequest;

/// Create a router for organization related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/:organization_id/discount-policy", put(update_discount_policy))
}

/// Update the discount policy; omitted fields keep their value
pub async fn update_discount_policy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(organization_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateDiscountPolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("PUT /api/organizations/{}/discount-policy - request: {:?}", organization_id, request);

    let command = OrganizationMapper::to_update_policy_command(request);
    let organization = state
        .organization_service
        .update_discount_policy(organization_id, command, &user)
        .await?;
    Ok(Json(OrganizationMapper::to_policy_response(organization)))
}
