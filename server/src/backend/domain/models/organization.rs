//! Organizations, their goals, and the discount policy fields they carry.
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};

use super::discount::DiscountPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub common_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub step_amount: Option<u32>,
    pub days_to_step_back: Option<u32>,
}

impl Organization {
    /// Resolve the configured policy. Organizations missing any of the floor,
    /// ceiling or step count do not run a discount program.
    pub fn discount_policy(&self) -> LoyaltyResult<DiscountPolicy> {
        match (self.common_discount, self.max_discount, self.step_amount) {
            (Some(common_discount), Some(max_discount), Some(step_amount)) => {
                let policy = DiscountPolicy {
                    common_discount,
                    max_discount,
                    step_amount,
                    days_to_step_back: self.days_to_step_back,
                };
                policy.step_size()?;
                Ok(policy)
            }
            _ => Err(LoyaltyError::InvalidPolicy(format!(
                "organization {} has no discount program configured",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: i64,
    /// Organization that posted the goal
    pub owner_id: i64,
    pub title: String,
}
