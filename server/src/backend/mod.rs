//! # Backend Module
//!
//! Everything behind the HTTP port of the loyalty backend.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Domain**: codes, stories, moderation and the discount ledger
//! - **Storage**: SQLite persistence
//! - **IO**: the REST interface
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (Business logic, services)
//!     ↓
//! Storage Layer (Database, persistence)
//! ```

pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::domain::{
    Clock, CodeService, DiscountService, ModerationService, OrganizationService, StoryService,
    SystemClock,
};
use crate::backend::io::rest::{code_apis, discount_apis, organization_apis, story_apis, TokenAuthority};
use crate::backend::storage::DbConnection;
use crate::config::AppConfig;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub tokens: Arc<TokenAuthority>,
    pub code_service: CodeService,
    pub story_service: StoryService,
    pub moderation_service: ModerationService,
    pub discount_service: DiscountService,
    pub organization_service: OrganizationService,
}

impl AppState {
    pub fn new(
        db: DbConnection,
        clock: Arc<dyn Clock>,
        jwt_secret: &str,
        code_ttl: chrono::Duration,
    ) -> Self {
        Self {
            tokens: Arc::new(TokenAuthority::new(jwt_secret.as_bytes())),
            code_service: CodeService::new(db.clone(), clock.clone(), code_ttl),
            story_service: StoryService::new(db.clone(), clock.clone()),
            moderation_service: ModerationService::new(db.clone(), clock.clone()),
            discount_service: DiscountService::new(db.clone(), clock),
            organization_service: OrganizationService::new(db.clone()),
            db,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up application state");
    Ok(AppState::new(
        db,
        Arc::new(SystemClock),
        &config.jwt_secret,
        config.code_ttl,
    ))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: &str) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/codes", code_apis::router())
        .nest("/stories", story_apis::router())
        .nest("/discounts", discount_apis::router())
        .nest("/organizations", organization_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
