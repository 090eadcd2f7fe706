use shared::{DiscountPolicy, DiscountPolicyResponse, UpdateDiscountPolicyRequest};

use crate::backend::domain::commands::organization::UpdateDiscountPolicyCommand;
use crate::backend::domain::models::Organization;

pub struct OrganizationMapper;

impl OrganizationMapper {
    pub fn to_update_policy_command(request: UpdateDiscountPolicyRequest) -> UpdateDiscountPolicyCommand {
        UpdateDiscountPolicyCommand {
            common_discount: request.common_discount,
            max_discount: request.max_discount,
            step_amount: request.step_amount,
            days_to_step_back: request.days_to_step_back,
        }
    }

    pub fn to_policy_response(domain: Organization) -> DiscountPolicyResponse {
        DiscountPolicyResponse {
            detail: "Discount policy updated".to_string(),
            organization_id: domain.id,
            policy: DiscountPolicy {
                common_discount: domain.common_discount,
                max_discount: domain.max_discount,
                step_amount: domain.step_amount,
                days_to_step_back: domain.days_to_step_back,
            },
        }
    }
}
