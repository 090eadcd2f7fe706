//! Stories: the review half of the redemption/review workflow.
//!
//! ## Business Rules
//!
//! - A story is attached to exactly one goal or organization
//! - A story carries 1 to 3 content blobs
//! - Creating a story consumes one live code of its author for the same
//!   target, in the same transaction, so a code backs at most one story
//! - New stories start `on_check`; only their owner edits or deletes them
//! - Deleting a story never reverses discount changes it caused
//! - Each organization shelf has positions 1..=6 holding at most one story each

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::ModerationState;
use tracing::{info, warn};

use crate::backend::domain::clock::Clock;
use crate::backend::domain::commands::story::{CreateStoryCommand, UpdateStoryCommand};
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::story::{is_valid_content_count, MAX_CONTENT_ITEMS, MAX_FAVORITE_POSITION};
use crate::backend::domain::models::{DomainStory, NewStory, Scope, User};
use crate::backend::storage::{CodeRepository, DbConnection, OrganizationRepository, StoryRepository};

#[derive(Clone)]
pub struct StoryService {
    db: DbConnection,
    clock: Arc<dyn Clock>,
}

impl StoryService {
    pub fn new(db: DbConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Create a story, consuming the code that proves the visit
    pub async fn create_story(
        &self,
        command: CreateStoryCommand,
        author: &User,
    ) -> LoyaltyResult<DomainStory> {
        info!("User {} creating story", author.id);

        let scope = Scope::from_ids(command.goal_id, command.organization_id).ok_or_else(|| {
            LoyaltyError::InvalidRequest("exactly one of goal_id and organization_id is required".to_string())
        })?;
        if !is_valid_content_count(command.content.len()) {
            return Err(LoyaltyError::InvalidRequest(format!(
                "a story needs between 1 and {} content items, got {}",
                MAX_CONTENT_ITEMS,
                command.content.len()
            )));
        }

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let code_value = match command.code {
            Some(value) => {
                if !CodeRepository::consume_owned(&mut tx, &value, author.id, scope, now).await? {
                    warn!("User {} has no redeemable code {} for {:?}", author.id, value, scope);
                    return Err(LoyaltyError::Forbidden("no redeemable code for this review".to_string()));
                }
                value
            }
            None => CodeRepository::consume_latest_for_owner(&mut tx, author.id, scope, now)
                .await?
                .ok_or_else(|| {
                    warn!("User {} has no live code for {:?}", author.id, scope);
                    LoyaltyError::Forbidden("no redeemable code for this review".to_string())
                })?,
        };

        let new_story = NewStory {
            description: command.description,
            is_recommending: command.is_recommending,
            owner_id: author.id,
            scope,
            content: command.content,
            code_value,
        };
        let story = StoryRepository::insert(&mut tx, &new_story, now).await?;
        tx.commit().await?;

        info!("Created story {} using code {}", story.id, new_story.code_value);
        Ok(story)
    }

    pub async fn get_story(&self, story_id: i64) -> LoyaltyResult<DomainStory> {
        let mut conn = self.db.pool().acquire().await?;
        StoryRepository::find_by_id(&mut conn, story_id)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Story {}", story_id)))
    }

    pub async fn list_by_organization(&self, organization_id: i64) -> LoyaltyResult<Vec<DomainStory>> {
        let mut conn = self.db.pool().acquire().await?;
        StoryRepository::list_by_organization(&mut conn, organization_id).await
    }

    pub async fn list_by_owner(&self, owner_id: i64) -> LoyaltyResult<Vec<DomainStory>> {
        let mut conn = self.db.pool().acquire().await?;
        StoryRepository::list_by_owner(&mut conn, owner_id).await
    }

    /// Moderation queue view, platform admins only
    pub async fn list_by_state(
        &self,
        state: ModerationState,
        actor: &User,
    ) -> LoyaltyResult<Vec<DomainStory>> {
        if !actor.is_platform_admin() {
            return Err(LoyaltyError::Forbidden("only administrators list stories by state".to_string()));
        }
        let mut conn = self.db.pool().acquire().await?;
        StoryRepository::list_by_state(&mut conn, state).await
    }

    pub async fn update_story(
        &self,
        story_id: i64,
        command: UpdateStoryCommand,
        actor: &User,
    ) -> LoyaltyResult<DomainStory> {
        info!("User {} editing story {}", actor.id, story_id);

        if let Some(content) = &command.content {
            if !is_valid_content_count(content.len()) {
                return Err(LoyaltyError::InvalidRequest(format!(
                    "a story needs between 1 and {} content items, got {}",
                    MAX_CONTENT_ITEMS,
                    content.len()
                )));
            }
        }

        let mut conn = self.db.pool().acquire().await?;
        let story = Self::owned_story(&mut conn, story_id, actor).await?;
        let description = command.description.unwrap_or_else(|| story.description.clone());
        let is_recommending = command.is_recommending.unwrap_or(story.is_recommending);
        StoryRepository::update_content(
            &mut conn,
            story.id,
            &description,
            is_recommending,
            command.content.as_deref(),
        )
        .await?;

        Ok(DomainStory {
            description,
            is_recommending,
            content: command.content.unwrap_or(story.content),
            ..story
        })
    }

    pub async fn delete_story(&self, story_id: i64, actor: &User) -> LoyaltyResult<()> {
        info!("User {} deleting story {}", actor.id, story_id);
        let mut conn = self.db.pool().acquire().await?;
        let story = Self::owned_story(&mut conn, story_id, actor).await?;
        if !StoryRepository::delete(&mut conn, story.id).await? {
            return Err(LoyaltyError::NotFound(format!("Story {}", story_id)));
        }
        Ok(())
    }

    /// Put a story on its organization's favorites shelf; position 0 takes it off
    pub async fn set_position(
        &self,
        story_id: i64,
        position: u8,
        actor: &User,
    ) -> LoyaltyResult<DomainStory> {
        info!("User {} placing story {} at position {}", actor.id, story_id, position);

        if position > MAX_FAVORITE_POSITION {
            return Err(LoyaltyError::InvalidRequest(format!(
                "position must be between 0 and {}",
                MAX_FAVORITE_POSITION
            )));
        }

        let (story, organization_id) = {
            let mut conn = self.db.pool().acquire().await?;
            let story = StoryRepository::find_by_id(&mut conn, story_id)
                .await?
                .ok_or_else(|| LoyaltyError::NotFound(format!("Story {}", story_id)))?;
            let organization_id = match story.scope {
                Scope::Organization(id) => id,
                Scope::Goal(goal_id) => OrganizationRepository::goal_owner(&mut conn, goal_id).await?,
            };
            (story, organization_id)
        };

        if actor.administered_organization() != Some(organization_id) {
            warn!("User {} does not administer organization {}", actor.id, organization_id);
            return Err(LoyaltyError::Forbidden(
                "only the organization's administrators arrange its favorites".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        if position > 0 {
            StoryRepository::clear_position_on_shelf(&mut tx, organization_id, position, story_id).await?;
        }
        StoryRepository::set_position(&mut tx, story_id, position).await?;
        tx.commit().await?;

        Ok(DomainStory { position, ..story })
    }

    /// Favorites shelf of an organization keyed by position
    pub async fn favorites(&self, organization_id: i64) -> LoyaltyResult<BTreeMap<u8, DomainStory>> {
        let mut conn = self.db.pool().acquire().await?;
        let stories = StoryRepository::favorites(&mut conn, organization_id).await?;
        Ok(stories.into_iter().map(|story| (story.position, story)).collect())
    }

    async fn owned_story(
        conn: &mut sqlx::SqliteConnection,
        story_id: i64,
        actor: &User,
    ) -> LoyaltyResult<DomainStory> {
        let story = StoryRepository::find_by_id(conn, story_id)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Story {}", story_id)))?;
        if story.owner_id != actor.id {
            warn!("User {} does not own story {}", actor.id, story_id);
            return Err(LoyaltyError::Forbidden("only the author may change this story".to_string()));
        }
        Ok(story)
    }
}
