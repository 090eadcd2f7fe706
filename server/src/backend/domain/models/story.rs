//! Domain model for a story and the ledger side effects of moderation.
use chrono::{DateTime, Utc};
use shared::ModerationState;

use super::scope::Scope;

/// Highest rank on an organization's favorites shelf
pub const MAX_FAVORITE_POSITION: u8 = 6;
pub const MIN_CONTENT_ITEMS: usize = 1;
pub const MAX_CONTENT_ITEMS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct DomainStory {
    pub id: i64,
    pub description: String,
    pub is_recommending: bool,
    pub moderation_state: ModerationState,
    pub position: u8,
    pub owner_id: i64,
    pub scope: Scope,
    pub content: Vec<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    /// Code consumed to create this story
    pub code_value: Option<String>,
}

/// Story fields known before the row exists
#[derive(Debug, Clone)]
pub struct NewStory {
    pub description: String,
    pub is_recommending: bool,
    pub owner_id: i64,
    pub scope: Scope,
    pub content: Vec<Vec<u8>>,
    pub code_value: String,
}

/// Effect a moderation transition has on the discount ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    Approve,
    Reject,
    Unchanged,
}

/// Only edges crossing into or out of `allowed` touch the ledger.
pub fn ledger_effect(from: ModerationState, to: ModerationState) -> LedgerEffect {
    let was_allowed = from == ModerationState::Allowed;
    let is_allowed = to == ModerationState::Allowed;
    match (was_allowed, is_allowed) {
        (false, true) => LedgerEffect::Approve,
        (true, false) => LedgerEffect::Reject,
        _ => LedgerEffect::Unchanged,
    }
}

pub fn moderation_state_to_str(state: ModerationState) -> &'static str {
    match state {
        ModerationState::OnCheck => "on_check",
        ModerationState::Allowed => "allowed",
        ModerationState::Denied => "denied",
    }
}

pub fn moderation_state_from_str(value: &str) -> Option<ModerationState> {
    match value {
        "on_check" => Some(ModerationState::OnCheck),
        "allowed" => Some(ModerationState::Allowed),
        "denied" => Some(ModerationState::Denied),
        _ => None,
    }
}

pub fn is_valid_content_count(count: usize) -> bool {
    (MIN_CONTENT_ITEMS..=MAX_CONTENT_ITEMS).contains(&count)
}
