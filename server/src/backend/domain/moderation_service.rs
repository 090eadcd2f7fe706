//! Story moderation state machine.
//!
//! Any state may move to any other state. The discount ledger only reacts to
//! edges that enter `allowed` (one approval) or leave it (one rejection), and
//! the state change and its ledger effect commit together or not at all.

use shared::ModerationState;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::domain::clock::Clock;
use crate::backend::domain::discount_service::DiscountLedger;
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::story::ledger_effect;
use crate::backend::domain::models::{DomainStory, LedgerEffect, Scope, User};
use crate::backend::storage::{DbConnection, OrganizationRepository, StoryRepository};

#[derive(Clone)]
pub struct ModerationService {
    db: DbConnection,
    clock: Arc<dyn Clock>,
}

impl ModerationService {
    pub fn new(db: DbConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn change_moderation_state(
        &self,
        story_id: i64,
        new_state: ModerationState,
        actor: &User,
    ) -> LoyaltyResult<DomainStory> {
        info!("User {} moving story {} to {}", actor.id, story_id, new_state);

        if !actor.is_platform_admin() {
            warn!("User {} may not moderate stories", actor.id);
            return Err(LoyaltyError::Forbidden("only administrators moderate stories".to_string()));
        }

        let story = {
            let mut conn = self.db.pool().acquire().await?;
            StoryRepository::find_by_id(&mut conn, story_id)
                .await?
                .ok_or_else(|| LoyaltyError::NotFound(format!("Story {}", story_id)))?
        };
        let effect = ledger_effect(story.moderation_state, new_state);
        let now = self.clock.now();

        let mut tx = self.db.begin().await?;

        // The write comes first so the transaction holds the write lock before reading anything
        if !StoryRepository::set_moderation_state(&mut tx, story_id, story.moderation_state, new_state).await? {
            warn!("Story {} changed while it was being moderated", story_id);
            return Err(LoyaltyError::Conflict(format!(
                "story {} was moderated concurrently",
                story_id
            )));
        }

        if effect != LedgerEffect::Unchanged {
            let organization_id = match story.scope {
                Scope::Organization(id) => id,
                Scope::Goal(goal_id) => OrganizationRepository::goal_owner(&mut tx, goal_id).await?,
            };
            let organization = OrganizationRepository::find_by_id(&mut tx, organization_id)
                .await?
                .ok_or_else(|| LoyaltyError::NotFound(format!("Organization {}", organization_id)))?;

            match organization.discount_policy() {
                Ok(policy) => match effect {
                    LedgerEffect::Approve => {
                        DiscountLedger::apply_approval(&mut tx, story.owner_id, organization_id, &policy, now)
                            .await?;
                    }
                    LedgerEffect::Reject => {
                        match DiscountLedger::apply_rejection(
                            &mut tx,
                            story.owner_id,
                            organization_id,
                            &policy,
                            now,
                        )
                        .await
                        {
                            Ok(_) => {}
                            Err(LoyaltyError::NotFound(what)) => {
                                warn!("{} not found, nothing to reject", what);
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    LedgerEffect::Unchanged => {}
                },
                Err(LoyaltyError::InvalidPolicy(reason)) => {
                    debug!("Skipping ledger for organization {}: {}", organization_id, reason);
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;
        info!("Story {} is now {}", story_id, new_state);

        Ok(DomainStory {
            moderation_state: new_state,
            ..story
        })
    }
}
