//! Discount ledger: per (user, organization) stepped discount.
//!
//! Approvals raise the entry by one step, rejections lower it by one step,
//! and an entry left alone for longer than the organization's window loses
//! one step the next time it is read. Decay is lazy; nothing runs in the
//! background.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::clock::Clock;
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::{DiscountLedgerEntry, DiscountPolicy};
use crate::backend::storage::{DbConnection, DiscountRepository, OrganizationRepository};

/// Ledger transitions that run on a caller-provided connection, so moderation
/// can apply them inside its own transaction.
pub struct DiscountLedger;

impl DiscountLedger {
    pub async fn apply_approval(
        conn: &mut SqliteConnection,
        user_id: i64,
        organization_id: i64,
        policy: &DiscountPolicy,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<DiscountLedgerEntry> {
        let current = DiscountRepository::find(conn, user_id, organization_id)
            .await?
            .map(|entry| entry.discount_percentage);
        let next = policy.incremented(current)?;

        info!(
            "Discount of user {} at organization {}: {:?} -> {}",
            user_id, organization_id, current, next
        );
        DiscountRepository::upsert(conn, user_id, organization_id, next, now).await
    }

    pub async fn apply_rejection(
        conn: &mut SqliteConnection,
        user_id: i64,
        organization_id: i64,
        policy: &DiscountPolicy,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<DiscountLedgerEntry> {
        let entry = DiscountRepository::find(conn, user_id, organization_id)
            .await?
            .ok_or_else(|| {
                LoyaltyError::NotFound(format!(
                    "Discount of user {} at organization {}",
                    user_id, organization_id
                ))
            })?;
        let next = policy.decremented(entry.discount_percentage)?;

        info!(
            "Discount of user {} at organization {}: {} -> {}",
            user_id, organization_id, entry.discount_percentage, next
        );
        DiscountRepository::upsert(conn, user_id, organization_id, next, now).await
    }

    /// Current discount, applying at most one step of decay.
    /// Users without an entry get the floor and no row is created.
    pub async fn read_with_decay(
        conn: &mut SqliteConnection,
        user_id: i64,
        organization_id: i64,
        policy: &DiscountPolicy,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<f64> {
        let Some(entry) = DiscountRepository::find(conn, user_id, organization_id).await? else {
            return Ok(policy.common_discount);
        };

        if !policy.decay_due(entry.updated_at, now) {
            return Ok(policy.clamp(entry.discount_percentage));
        }

        let decayed = policy.decremented(entry.discount_percentage)?;
        if DiscountRepository::update_if_unchanged(conn, entry.id, decayed, now, entry.updated_at).await? {
            info!(
                "Decayed discount of user {} at organization {}: {} -> {}",
                user_id, organization_id, entry.discount_percentage, decayed
            );
            return Ok(decayed);
        }

        // Another request already decayed or changed the entry
        let current = DiscountRepository::find(conn, user_id, organization_id)
            .await?
            .map(|entry| entry.discount_percentage)
            .unwrap_or(policy.common_discount);
        Ok(policy.clamp(current))
    }
}

#[derive(Clone)]
pub struct DiscountService {
    db: DbConnection,
    clock: Arc<dyn Clock>,
}

impl DiscountService {
    pub fn new(db: DbConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn get(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> LoyaltyResult<Option<DiscountLedgerEntry>> {
        let mut conn = self.db.pool().acquire().await?;
        DiscountRepository::find(&mut conn, user_id, organization_id).await
    }

    pub async fn read_with_decay(
        &self,
        user_id: i64,
        organization_id: i64,
        policy: &DiscountPolicy,
    ) -> LoyaltyResult<f64> {
        let mut conn = self.db.pool().acquire().await?;
        DiscountLedger::read_with_decay(&mut conn, user_id, organization_id, policy, self.clock.now())
            .await
    }

    /// Discount of `user_id` at an organization, resolving its policy first
    pub async fn discount_for(&self, user_id: i64, organization_id: i64) -> LoyaltyResult<f64> {
        info!("Reading discount of user {} at organization {}", user_id, organization_id);
        let policy = {
            let mut conn = self.db.pool().acquire().await?;
            let organization = OrganizationRepository::find_by_id(&mut conn, organization_id)
                .await?
                .ok_or_else(|| LoyaltyError::NotFound(format!("Organization {}", organization_id)))?;

            organization.discount_policy().map_err(|e| {
                warn!("Organization {} has no usable discount policy: {}", organization_id, e);
                LoyaltyError::NotFound(format!("Discount program of organization {}", organization_id))
            })?
        };

        self.read_with_decay(user_id, organization_id, &policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::clock::FixedClock;
    use crate::backend::storage::test_utils::{cafe_policy, seed_organization, seed_user};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    async fn setup_test() -> (DiscountService, DbConnection, Arc<FixedClock>) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        seed_organization(&db, 3, "Corner Cafe", Some(cafe_policy())).await;
        seed_organization(&db, 4, "Bookshop", None).await;
        seed_user(&db, 9, "consumer", None).await;
        let clock = Arc::new(FixedClock::new(start()));
        (DiscountService::new(db.clone(), clock.clone()), db, clock)
    }

    #[tokio::test]
    async fn test_no_history_reads_the_floor_without_writing() {
        let (service, _, _) = setup_test().await;

        assert_eq!(service.discount_for(9, 3).await.unwrap(), 0.0);
        assert!(service.get(9, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_without_entry_is_not_found() {
        let (_, db, _) = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let result = DiscountLedger::apply_rejection(&mut conn, 9, 3, &cafe_policy(), start()).await;
        assert!(matches!(result, Err(LoyaltyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_approve_approve_reject_then_decay() {
        let (service, db, clock) = setup_test().await;
        let policy = cafe_policy();
        let mut conn = db.pool().acquire().await.unwrap();

        let entry = DiscountLedger::apply_approval(&mut conn, 9, 3, &policy, clock.now()).await.unwrap();
        assert_eq!(entry.discount_percentage, 5.0);
        let entry = DiscountLedger::apply_approval(&mut conn, 9, 3, &policy, clock.now()).await.unwrap();
        assert_eq!(entry.discount_percentage, 10.0);
        let entry = DiscountLedger::apply_rejection(&mut conn, 9, 3, &policy, clock.now()).await.unwrap();
        assert_eq!(entry.discount_percentage, 5.0);
        drop(conn);

        clock.advance(Duration::days(8));
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 0.0);

        // already at the floor, further decay never goes negative
        clock.advance(Duration::days(8));
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_decay_is_idempotent_within_the_window() {
        let (service, db, clock) = setup_test().await;
        let policy = cafe_policy();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            for _ in 0..3 {
                DiscountLedger::apply_approval(&mut conn, 9, 3, &policy, clock.now()).await.unwrap();
            }
        }

        clock.advance(Duration::days(8));
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 10.0);
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 10.0);

        clock.advance(Duration::days(7));
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 10.0, "exactly at the window");

        clock.advance(Duration::seconds(1));
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_approvals_saturate_at_the_ceiling() {
        let (service, db, clock) = setup_test().await;
        let policy = cafe_policy();
        let mut conn = db.pool().acquire().await.unwrap();

        for _ in 0..10 {
            let entry = DiscountLedger::apply_approval(&mut conn, 9, 3, &policy, clock.now()).await.unwrap();
            assert!(entry.discount_percentage <= policy.max_discount);
            assert!(entry.discount_percentage >= policy.common_discount);
        }
        drop(conn);
        assert_eq!(service.discount_for(9, 3).await.unwrap(), 20.0);
    }

    #[tokio::test]
    async fn test_organization_without_program_is_not_found() {
        let (service, _, _) = setup_test().await;

        assert!(matches!(service.discount_for(9, 4).await, Err(LoyaltyError::NotFound(_))));
        assert!(matches!(service.discount_for(9, 77).await, Err(LoyaltyError::NotFound(_))));
    }
}
