//! Seed helpers for tests that need organizations, goals and users in place.
//!
//! Foreign keys are enforced, so codes, stories and ledger entries can only be
//! written once their owners exist.

use super::repositories::{OrganizationRepository, UserRepository};
use super::DbConnection;
use crate::backend::domain::models::{DiscountPolicy, Goal, Organization, Role, User};

pub async fn seed_organization(
    db: &DbConnection,
    id: i64,
    name: &str,
    policy: Option<DiscountPolicy>,
) {
    let organization = Organization {
        id,
        name: name.to_string(),
        common_discount: policy.map(|p| p.common_discount),
        max_discount: policy.map(|p| p.max_discount),
        step_amount: policy.map(|p| p.step_amount),
        days_to_step_back: policy.and_then(|p| p.days_to_step_back),
    };
    let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");
    OrganizationRepository::insert(&mut conn, &organization)
        .await
        .expect("Failed to seed organization");
}

pub async fn seed_goal(db: &DbConnection, id: i64, owner_organization_id: i64) {
    let goal = Goal {
        id,
        owner_id: owner_organization_id,
        title: format!("Goal {}", id),
    };
    let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");
    OrganizationRepository::insert_goal(&mut conn, &goal)
        .await
        .expect("Failed to seed goal");
}

pub async fn seed_user(db: &DbConnection, id: i64, role: &str, organization_id: Option<i64>) -> User {
    let user = User {
        id,
        role: Role::parse(role).expect("Unknown role in test seed"),
        organization_id,
    };
    let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");
    UserRepository::insert(&mut conn, &user, &format!("user{}@example.com", id))
        .await
        .expect("Failed to seed user");
    user
}

/// The policy used across ledger tests: 0..20 in four steps of 5, one week window
pub fn cafe_policy() -> DiscountPolicy {
    DiscountPolicy {
        common_discount: 0.0,
        max_discount: 20.0,
        step_amount: 4,
        days_to_step_back: Some(7),
    }
}
