//! # Domain Module
//!
//! Business logic of the loyalty backend: single-use redemption codes, the
//! story moderation state machine and the stepped discount ledger it drives.
//!
//! ## Module Organization
//!
//! - **code_service**: code issuance, validation, redemption and blacklisting
//! - **discount_service**: the per (user, organization) discount ledger
//! - **moderation_service**: moderation state changes and their ledger effects
//! - **story_service**: story creation from a redeemed code, edits and the favorites shelf
//! - **organization_service**: discount policy maintenance
//!
//! ## Business Rules
//!
//! - A code is consumed at most once, even under concurrent redemption
//! - A discount stays within `[common_discount, max_discount]`
//! - Only moderation edges into or out of `allowed` touch the ledger
//! - Every mutation runs in one transaction scoped to the operation

pub mod clock;
pub mod code_service;
pub mod commands;
pub mod discount_service;
pub mod error;
pub mod models;
pub mod moderation_service;
pub mod organization_service;
pub mod story_service;

pub use clock::{Clock, SystemClock};
pub use code_service::CodeService;
pub use discount_service::{DiscountLedger, DiscountService};
pub use error::{LoyaltyError, LoyaltyResult};
pub use moderation_service::ModerationService;
pub use organization_service::OrganizationService;
pub use story_service::StoryService;
