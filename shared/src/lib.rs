use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Moderation state of a story as exposed over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    /// Waiting for a platform administrator (initial state)
    OnCheck,
    /// Approved and visible
    Allowed,
    /// Rejected by moderation
    Denied,
}

impl fmt::Display for ModerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ModerationState::OnCheck => "on_check",
            ModerationState::Allowed => "allowed",
            ModerationState::Denied => "denied",
        };
        f.write_str(value)
    }
}

/// How a redemption code is rendered for the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    /// SVG QR code
    #[default]
    Qr,
    /// Code128 linear barcode as SVG
    Barcode,
    /// Value only, no rendering
    Digital,
}

/// Redemption code as shown to operators and consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionCode {
    /// Opaque value, format `T:{1|2}-N:{scope_id}-U:{user_id}-{random}`
    pub value: String,
    pub code_type: CodeType,
    pub is_valid: bool,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub expiration: String,
    pub owner_id: i64,
    pub goal_id: Option<i64>,
    pub organization_id: Option<i64>,
}

/// Query parameters accepted when issuing a code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueCodeQuery {
    pub code_type: Option<CodeType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCodeResponse {
    pub detail: String,
    pub value: String,
    /// Base64 encoded rendering, empty for digital codes
    pub barcode: String,
    /// RFC 3339 timestamp
    pub expiration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub detail: String,
    /// Snapshot of the code before it was blacklisted
    pub code: RedemptionCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedOrganizationsResponse {
    pub organizations: Vec<OrganizationSummary>,
}

/// A user review tied to a goal or an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub description: String,
    pub is_recommending: bool,
    pub moderation_state: ModerationState,
    /// 0 = not featured, otherwise rank on the favorites shelf
    pub position: u8,
    pub owner_id: i64,
    pub goal_id: Option<i64>,
    pub organization_id: Option<i64>,
    /// Base64 encoded media blobs (1 to 3)
    pub content: Vec<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Compact story representation used on the favorites shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: i64,
    pub description: String,
    pub is_recommending: bool,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStoryRequest {
    pub description: String,
    pub is_recommending: bool,
    pub goal_id: Option<i64>,
    pub organization_id: Option<i64>,
    /// Base64 encoded media blobs (1 to 3)
    pub content: Vec<String>,
    /// Specific code to redeem; the newest live matching code is used when absent
    #[serde(default)]
    pub code: Option<String>,
}

/// Partial update of a story by its owner; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStoryRequest {
    pub description: Option<String>,
    pub is_recommending: Option<bool>,
    pub content: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryResponse {
    pub detail: String,
    pub story: Story,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryListResponse {
    pub stories: Vec<Story>,
}

/// Favorites shelf keyed by position
pub type FavoriteStoriesResponse = BTreeMap<u8, StorySummary>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeModerationStateRequest {
    pub moderation_state: ModerationState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStoryListQuery {
    pub moderation_state: ModerationState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountResponse {
    pub discount_percentage: f64,
}

/// Discount policy of an organization; all fields unset means discounts are disabled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub common_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub step_amount: Option<u32>,
    pub days_to_step_back: Option<u32>,
}

/// Partial update of a discount policy; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDiscountPolicyRequest {
    pub common_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub step_amount: Option<u32>,
    pub days_to_step_back: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicyResponse {
    pub detail: String,
    pub organization_id: i64,
    pub policy: DiscountPolicy,
}

/// Plain acknowledgement or error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_state_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ModerationState::OnCheck).unwrap();
        assert_eq!(json, "\"on_check\"");

        let parsed: ModerationState = serde_json::from_str("\"allowed\"").unwrap();
        assert_eq!(parsed, ModerationState::Allowed);
        assert_eq!(ModerationState::Denied.to_string(), "denied");
    }

    #[test]
    fn discount_response_is_a_bare_float() {
        let json = serde_json::to_value(DiscountResponse { discount_percentage: 12.5 }).unwrap();
        assert_eq!(json, serde_json::json!({ "discount_percentage": 12.5 }));
    }

    #[test]
    fn favorites_serialize_as_position_map() {
        let mut favorites = FavoriteStoriesResponse::new();
        favorites.insert(
            2,
            StorySummary {
                id: 11,
                description: "Great coffee".to_string(),
                is_recommending: true,
                owner_id: 4,
            },
        );

        let json = serde_json::to_value(&favorites).unwrap();
        assert_eq!(json["2"]["id"], 11);
    }

    #[test]
    fn create_story_request_code_is_optional() {
        let request: CreateStoryRequest = serde_json::from_value(serde_json::json!({
            "description": "Nice",
            "is_recommending": true,
            "goal_id": 42,
            "organization_id": null,
            "content": ["aGVsbG8="]
        }))
        .unwrap();
        assert!(request.code.is_none());
        assert_eq!(request.goal_id, Some(42));
    }
}
