//! # REST API Interface Layer
//!
//! HTTP endpoints of the loyalty backend, nested under `/api`.
//! This layer handles:
//! - HTTP request/response serialization and deserialization
//! - Bearer token authentication of the caller
//! - Error translation from domain to HTTP status codes
//! - Request logging
//!
//! ## Design Principles
//!
//! - **Domain Separation**: Pure translation layer without business logic
//! - **Consistent Error Format**: every failure is a `{"detail": ...}` body,
//!   including malformed bodies, paths and queries (see [`extract`])

pub mod auth;
pub mod code_apis;
pub mod discount_apis;
pub mod error;
pub mod extract;
pub mod mappers;
pub mod organization_apis;
pub mod story_apis;

pub use auth::{CurrentUser, TokenAuthority};
pub use error::ApiError;
