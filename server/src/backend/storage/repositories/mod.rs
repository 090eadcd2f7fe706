// Repository modules
pub mod code_repository;
pub mod discount_repository;
pub mod organization_repository;
pub mod story_repository;
pub mod user_repository;

use chrono::{DateTime, Utc};

use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};

// Re-export repository types
pub use code_repository::CodeRepository;
pub use discount_repository::DiscountRepository;
pub use organization_repository::OrganizationRepository;
pub use story_repository::StoryRepository;
pub use user_repository::UserRepository;

/// Decode an epoch-millisecond column
pub(crate) fn from_millis(ms: i64) -> LoyaltyResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| LoyaltyError::Internal(format!("timestamp {} out of range", ms)))
}
