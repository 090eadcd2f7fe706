//! Domain models for codes, stories, discounts and their owners.

pub mod code;
pub mod discount;
pub mod organization;
pub mod scope;
pub mod story;
pub mod user;

pub use code::DomainCode;
pub use discount::{DiscountLedgerEntry, DiscountPolicy};
pub use organization::{Goal, Organization};
pub use scope::Scope;
pub use story::{DomainStory, LedgerEffect, NewStory};
pub use user::{Role, User};
