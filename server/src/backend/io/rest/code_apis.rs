//! # REST API for Redemption Codes
//!
//! Issuance for consumers, verification for organization staff.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tracing::{info, warn};

use crate::backend::domain::error::LoyaltyError;
use crate::backend::domain::models::Scope;
use crate::backend::io::rest::auth::CurrentUser;
use crate::backend::io::rest::error::ApiError;
use crate::backend::io::rest::extract::{ApiPath, ApiQuery};
use crate::backend::io::rest::mappers::code_mapper::CodeMapper;
use crate::backend::AppState;
use shared::{IssueCodeQuery, VerifyCodeResponse, VisitedOrganizationsResponse};

/// Create a router for code related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/goal/:goal_id", post(issue_goal_code))
        .route("/organization/:organization_id", post(issue_organization_code))
        .route("/visited", get(visited_organizations))
        .route("/verify/:value", post(verify_code))
        .route("/:value", get(get_code))
}

/// Issue a code for a goal
pub async fn issue_goal_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(goal_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<IssueCodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!("POST /api/codes/goal/{} by user {}", goal_id, user.id);

    let code = state
        .code_service
        .issue(Scope::Goal(goal_id), user.id, query.code_type.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(CodeMapper::to_issue_response(code))))
}

/// Issue a code for an organization
pub async fn issue_organization_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(organization_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<IssueCodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!("POST /api/codes/organization/{} by user {}", organization_id, user.id);

    let code = state
        .code_service
        .issue(Scope::Organization(organization_id), user.id, query.code_type.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(CodeMapper::to_issue_response(code))))
}

/// Look a code up; visible to its owner and platform admins
pub async fn get_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(value): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/codes/{} by user {}", value, user.id);

    let code = state.code_service.validate(&value).await?;
    if code.owner_id != user.id && !user.is_platform_admin() {
        warn!("User {} may not read code {}", user.id, value);
        return Err(LoyaltyError::Forbidden("code belongs to another user".to_string()).into());
    }
    Ok(Json(CodeMapper::to_dto(code)))
}

/// Verify a presented code at the caller's organization and blacklist it
pub async fn verify_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(value): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("POST /api/codes/verify/{} by user {}", value, user.id);

    let organization_id = user.administered_organization().ok_or_else(|| {
        LoyaltyError::Forbidden("only organization administrators verify codes".to_string())
    })?;
    let code = state.code_service.verify_and_blacklist(&value, organization_id).await?;

    Ok(Json(VerifyCodeResponse {
        detail: "Code is valid and has been used".to_string(),
        code: CodeMapper::to_dto(code),
    }))
}

/// Organizations where the caller has used codes
pub async fn visited_organizations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/codes/visited by user {}", user.id);

    let organizations = state.code_service.visited_organizations(user.id).await?;
    Ok(Json(VisitedOrganizationsResponse {
        organizations: organizations.into_iter().map(CodeMapper::organization_to_summary).collect(),
    }))
}
