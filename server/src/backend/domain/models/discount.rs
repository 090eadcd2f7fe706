//! Stepped discount arithmetic.
//!
//! A policy splits the range between the floor (`common_discount`) and the
//! ceiling (`max_discount`) into `step_amount` equal steps. Every value this
//! module produces is clamped into `[common_discount, max_discount]`.

use chrono::{DateTime, Duration, Utc};

use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};

#[derive(Debug, Clone, PartialEq)]
pub struct DiscountLedgerEntry {
    pub id: i64,
    pub discount_percentage: f64,
    pub updated_at: DateTime<Utc>,
    pub user_id: i64,
    pub organization_id: i64,
}

/// Fully configured discount policy of an organization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountPolicy {
    pub common_discount: f64,
    pub max_discount: f64,
    pub step_amount: u32,
    /// No decay when unset
    pub days_to_step_back: Option<u32>,
}

impl DiscountPolicy {
    pub fn step_size(&self) -> LoyaltyResult<f64> {
        if self.step_amount == 0 {
            return Err(LoyaltyError::InvalidPolicy(
                "step_amount must be greater than zero".to_string(),
            ));
        }
        if !self.common_discount.is_finite() || !self.max_discount.is_finite() {
            return Err(LoyaltyError::InvalidPolicy(
                "discount bounds must be finite".to_string(),
            ));
        }
        if self.max_discount < self.common_discount {
            return Err(LoyaltyError::InvalidPolicy(format!(
                "max_discount {} is below common_discount {}",
                self.max_discount, self.common_discount
            )));
        }
        Ok((self.max_discount - self.common_discount) / f64::from(self.step_amount))
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.common_discount).min(self.max_discount)
    }

    /// Value after one approval. A first approval starts the entry at one
    /// step size (not floor + step), raised to the floor when the floor is higher.
    pub fn incremented(&self, current: Option<f64>) -> LoyaltyResult<f64> {
        let step = self.step_size()?;
        let next = match current {
            Some(current) => current + step,
            None => step,
        };
        Ok(self.clamp(next))
    }

    /// Value after one rejection or one decay step
    pub fn decremented(&self, current: f64) -> LoyaltyResult<f64> {
        let step = self.step_size()?;
        Ok(self.clamp(current - step))
    }

    /// True when strictly more than `days_to_step_back` days passed since `updated_at`
    pub fn decay_due(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.days_to_step_back {
            Some(days) => now - updated_at > Duration::days(i64::from(days)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy(common: f64, max: f64, steps: u32) -> DiscountPolicy {
        DiscountPolicy {
            common_discount: common,
            max_discount: max,
            step_amount: steps,
            days_to_step_back: Some(7),
        }
    }

    #[test]
    fn step_size_splits_the_range() {
        assert_eq!(policy(0.0, 20.0, 4).step_size().unwrap(), 5.0);
        assert_eq!(policy(5.0, 15.0, 4).step_size().unwrap(), 2.5);
    }

    #[test]
    fn zero_steps_is_an_invalid_policy() {
        let result = policy(0.0, 20.0, 0).step_size();
        assert!(matches!(result, Err(LoyaltyError::InvalidPolicy(_))));
    }

    #[test]
    fn inverted_bounds_are_an_invalid_policy() {
        let result = policy(20.0, 10.0, 2).step_size();
        assert!(matches!(result, Err(LoyaltyError::InvalidPolicy(_))));
    }

    #[test]
    fn first_approval_starts_at_one_step() {
        assert_eq!(policy(0.0, 20.0, 4).incremented(None).unwrap(), 5.0);
    }

    #[test]
    fn first_approval_never_lands_below_the_floor() {
        // step 2.5 is below the 5.0 floor
        assert_eq!(policy(5.0, 15.0, 4).incremented(None).unwrap(), 5.0);
    }

    #[test]
    fn increments_saturate_at_the_ceiling() {
        let policy = policy(0.0, 20.0, 4);
        let mut value = policy.incremented(None).unwrap();
        for _ in 0..10 {
            value = policy.incremented(Some(value)).unwrap();
            assert!(value <= 20.0);
        }
        assert_eq!(value, 20.0);
    }

    #[test]
    fn decrements_saturate_at_the_floor() {
        let policy = policy(2.0, 22.0, 4);
        let mut value = 22.0;
        for _ in 0..10 {
            value = policy.decremented(value).unwrap();
            assert!(value >= 2.0);
        }
        assert_eq!(value, 2.0);
    }

    #[test]
    fn decay_requires_strictly_more_than_the_window() {
        let policy = policy(0.0, 20.0, 4);
        let updated = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        assert!(!policy.decay_due(updated, updated + Duration::days(7)));
        assert!(policy.decay_due(updated, updated + Duration::days(7) + Duration::seconds(1)));
    }

    #[test]
    fn policy_without_window_never_decays() {
        let mut policy = policy(0.0, 20.0, 4);
        policy.days_to_step_back = None;
        let updated = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(!policy.decay_due(updated, updated + Duration::days(3650)));
    }
}
