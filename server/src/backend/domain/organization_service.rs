use tracing::{info, warn};

use crate::backend::domain::commands::organization::UpdateDiscountPolicyCommand;
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::{Organization, User};
use crate::backend::storage::{DbConnection, OrganizationRepository};

/// Discount policy maintenance for organizations
#[derive(Clone)]
pub struct OrganizationService {
    db: DbConnection,
}

impl OrganizationService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Merge `command` into the stored policy and persist it.
    /// Allowed for platform admins and administrators of that organization.
    pub async fn update_discount_policy(
        &self,
        organization_id: i64,
        command: UpdateDiscountPolicyCommand,
        actor: &User,
    ) -> LoyaltyResult<Organization> {
        info!("User {} updating discount policy of organization {}", actor.id, organization_id);

        if !actor.is_platform_admin() && actor.administered_organization() != Some(organization_id) {
            warn!("User {} may not change organization {}", actor.id, organization_id);
            return Err(LoyaltyError::Forbidden(
                "only the organization's administrators change its discount policy".to_string(),
            ));
        }

        let mut conn = self.db.pool().acquire().await?;
        let stored = OrganizationRepository::find_by_id(&mut conn, organization_id)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Organization {}", organization_id)))?;

        let merged = Organization {
            common_discount: command.common_discount.or(stored.common_discount),
            max_discount: command.max_discount.or(stored.max_discount),
            step_amount: command.step_amount.or(stored.step_amount),
            days_to_step_back: command.days_to_step_back.or(stored.days_to_step_back),
            ..stored
        };
        validate_policy(&merged)?;

        OrganizationRepository::update_policy(&mut conn, &merged).await?;
        info!("Organization {} discount policy updated", organization_id);
        Ok(merged)
    }
}

fn validate_policy(organization: &Organization) -> LoyaltyResult<()> {
    for (name, value) in [
        ("common_discount", organization.common_discount),
        ("max_discount", organization.max_discount),
    ] {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(LoyaltyError::InvalidRequest(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }
    }
    if organization.step_amount == Some(0) {
        return Err(LoyaltyError::InvalidRequest("step_amount must be greater than zero".to_string()));
    }
    if let (Some(common), Some(max)) = (organization.common_discount, organization.max_discount) {
        if common > max {
            return Err(LoyaltyError::InvalidRequest(format!(
                "common_discount {} exceeds max_discount {}",
                common, max
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::Role;
    use crate::backend::storage::test_utils::{cafe_policy, seed_organization};

    async fn setup_test() -> OrganizationService {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        seed_organization(&db, 3, "Corner Cafe", Some(cafe_policy())).await;
        seed_organization(&db, 4, "Bookshop", None).await;
        OrganizationService::new(db)
    }

    fn staff_of(organization_id: i64) -> User {
        User { id: 20, role: Role::OrgAdmin, organization_id: Some(organization_id) }
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let service = setup_test().await;
        let command = UpdateDiscountPolicyCommand {
            max_discount: Some(30.0),
            ..Default::default()
        };

        let updated = service.update_discount_policy(3, command, &staff_of(3)).await.unwrap();

        assert_eq!(updated.max_discount, Some(30.0));
        assert_eq!(updated.common_discount, Some(0.0));
        assert_eq!(updated.step_amount, Some(4));
        assert_eq!(updated.discount_policy().unwrap().step_size().unwrap(), 7.5);
    }

    #[tokio::test]
    async fn test_staff_of_other_organization_is_forbidden() {
        let service = setup_test().await;
        let result = service
            .update_discount_policy(3, UpdateDiscountPolicyCommand::default(), &staff_of(4))
            .await;
        assert!(matches!(result, Err(LoyaltyError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_inconsistent_policies_are_rejected() {
        let service = setup_test().await;
        let admin = User { id: 1, role: Role::Admin, organization_id: None };

        let zero_steps = UpdateDiscountPolicyCommand { step_amount: Some(0), ..Default::default() };
        let inverted = UpdateDiscountPolicyCommand { common_discount: Some(25.0), ..Default::default() };
        let negative = UpdateDiscountPolicyCommand { common_discount: Some(-1.0), ..Default::default() };

        for command in [zero_steps, inverted, negative] {
            let result = service.update_discount_policy(3, command, &admin).await;
            assert!(matches!(result, Err(LoyaltyError::InvalidRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_policy_can_be_configured_from_scratch() {
        let service = setup_test().await;
        let command = UpdateDiscountPolicyCommand {
            common_discount: Some(2.0),
            max_discount: Some(12.0),
            step_amount: Some(5),
            days_to_step_back: None,
        };

        let updated = service.update_discount_policy(4, command, &staff_of(4)).await.unwrap();
        let policy = updated.discount_policy().unwrap();
        assert_eq!(policy.step_size().unwrap(), 2.0);
        assert_eq!(policy.days_to_step_back, None);
    }
}
