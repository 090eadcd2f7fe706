use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use shared::ModerationState;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::from_millis;
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::story::{moderation_state_from_str, moderation_state_to_str};
use crate::backend::domain::models::{DomainStory, NewStory, Scope};

const STORY_COLUMNS: &str = "s.id, s.description, s.is_recommending, s.moderation_state, s.position, \
     s.owner_id, s.goal_id, s.organization_id, s.content, s.code_value, s.created_at";

/// Stories of an organization: posted against it directly or against one of its goals
const ORGANIZATION_FILTER: &str =
    "(s.organization_id = ? OR s.goal_id IN (SELECT id FROM goals WHERE owner_id = ?))";

/// Repository for stories. Content blobs are persisted as a JSON array of base64 strings.
pub struct StoryRepository;

impl StoryRepository {
    /// Insert a story in `on_check` with no shelf position
    pub async fn insert(
        conn: &mut SqliteConnection,
        story: &NewStory,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<DomainStory> {
        let result = sqlx::query(
            r#"
            INSERT INTO stories (description, is_recommending, moderation_state, position,
                                 owner_id, goal_id, organization_id, content, code_value, created_at)
            VALUES (?, ?, ?, 0, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&story.description)
        .bind(story.is_recommending)
        .bind(moderation_state_to_str(ModerationState::OnCheck))
        .bind(story.owner_id)
        .bind(story.scope.goal_id())
        .bind(story.scope.organization_id())
        .bind(encode_content(&story.content)?)
        .bind(&story.code_value)
        .bind(now.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        Ok(DomainStory {
            id: result.last_insert_rowid(),
            description: story.description.clone(),
            is_recommending: story.is_recommending,
            moderation_state: ModerationState::OnCheck,
            position: 0,
            owner_id: story.owner_id,
            scope: story.scope,
            content: story.content.clone(),
            created_at: from_millis(now.timestamp_millis())?,
            code_value: Some(story.code_value.clone()),
        })
    }

    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        story_id: i64,
    ) -> LoyaltyResult<Option<DomainStory>> {
        let row = sqlx::query(&format!("SELECT {} FROM stories s WHERE s.id = ?", STORY_COLUMNS))
            .bind(story_id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(story_from_row).transpose()
    }

    pub async fn list_by_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
    ) -> LoyaltyResult<Vec<DomainStory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM stories s WHERE s.owner_id = ? ORDER BY s.created_at DESC, s.id DESC",
            STORY_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    pub async fn list_by_organization(
        conn: &mut SqliteConnection,
        organization_id: i64,
    ) -> LoyaltyResult<Vec<DomainStory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM stories s WHERE {} ORDER BY s.created_at DESC, s.id DESC",
            STORY_COLUMNS, ORGANIZATION_FILTER
        ))
        .bind(organization_id)
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    pub async fn list_by_state(
        conn: &mut SqliteConnection,
        state: ModerationState,
    ) -> LoyaltyResult<Vec<DomainStory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM stories s WHERE s.moderation_state = ? ORDER BY s.created_at, s.id",
            STORY_COLUMNS
        ))
        .bind(moderation_state_to_str(state))
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    /// Stories with a non-zero shelf position, lowest position first
    pub async fn favorites(
        conn: &mut SqliteConnection,
        organization_id: i64,
    ) -> LoyaltyResult<Vec<DomainStory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM stories s WHERE {} AND s.position > 0 ORDER BY s.position, s.id",
            STORY_COLUMNS, ORGANIZATION_FILTER
        ))
        .bind(organization_id)
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(story_from_row).collect()
    }

    /// Replace the editable fields; `content: None` keeps the stored blobs
    pub async fn update_content(
        conn: &mut SqliteConnection,
        story_id: i64,
        description: &str,
        is_recommending: bool,
        content: Option<&[Vec<u8>]>,
    ) -> LoyaltyResult<()> {
        match content {
            Some(content) => {
                sqlx::query(
                    "UPDATE stories SET description = ?, is_recommending = ?, content = ? WHERE id = ?",
                )
                .bind(description)
                .bind(is_recommending)
                .bind(encode_content(content)?)
                .bind(story_id)
                .execute(&mut *conn)
                .await?;
            }
            None => {
                sqlx::query("UPDATE stories SET description = ?, is_recommending = ? WHERE id = ?")
                    .bind(description)
                    .bind(is_recommending)
                    .bind(story_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }

    /// Move a story from `expected` to `state`. Returns false when the stored
    /// state was no longer `expected`.
    pub async fn set_moderation_state(
        conn: &mut SqliteConnection,
        story_id: i64,
        expected: ModerationState,
        state: ModerationState,
    ) -> LoyaltyResult<bool> {
        let result = sqlx::query(
            "UPDATE stories SET moderation_state = ? WHERE id = ? AND moderation_state = ?",
        )
        .bind(moderation_state_to_str(state))
        .bind(story_id)
        .bind(moderation_state_to_str(expected))
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Free `position` on an organization's shelf, except for `keep_story_id`
    pub async fn clear_position_on_shelf(
        conn: &mut SqliteConnection,
        organization_id: i64,
        position: u8,
        keep_story_id: i64,
    ) -> LoyaltyResult<()> {
        sqlx::query(&format!(
            "UPDATE stories SET position = 0 WHERE id IN \
             (SELECT s.id FROM stories s WHERE {} AND s.position = ? AND s.id <> ?)",
            ORGANIZATION_FILTER
        ))
        .bind(organization_id)
        .bind(organization_id)
        .bind(position)
        .bind(keep_story_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn set_position(
        conn: &mut SqliteConnection,
        story_id: i64,
        position: u8,
    ) -> LoyaltyResult<()> {
        sqlx::query("UPDATE stories SET position = ? WHERE id = ?")
            .bind(position)
            .bind(story_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Returns false when the story did not exist
    pub async fn delete(conn: &mut SqliteConnection, story_id: i64) -> LoyaltyResult<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(story_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn encode_content(content: &[Vec<u8>]) -> LoyaltyResult<String> {
    let encoded: Vec<String> = content.iter().map(|blob| STANDARD.encode(blob)).collect();
    serde_json::to_string(&encoded)
        .map_err(|e| LoyaltyError::Internal(format!("failed to encode story content: {}", e)))
}

fn decode_content(story_id: i64, raw: &str) -> LoyaltyResult<Vec<Vec<u8>>> {
    let encoded: Vec<String> = serde_json::from_str(raw).map_err(|e| {
        LoyaltyError::Internal(format!("story {} has malformed content: {}", story_id, e))
    })?;
    encoded
        .iter()
        .map(|item| {
            STANDARD.decode(item).map_err(|e| {
                LoyaltyError::Internal(format!("story {} has malformed content: {}", story_id, e))
            })
        })
        .collect()
}

fn story_from_row(row: &SqliteRow) -> LoyaltyResult<DomainStory> {
    let id: i64 = row.try_get("id")?;
    let state: String = row.try_get("moderation_state")?;
    let content: String = row.try_get("content")?;
    let scope = Scope::from_ids(row.try_get("goal_id")?, row.try_get("organization_id")?)
        .ok_or_else(|| LoyaltyError::Internal(format!("story {} has an invalid scope", id)))?;

    Ok(DomainStory {
        description: row.try_get("description")?,
        is_recommending: row.try_get("is_recommending")?,
        moderation_state: moderation_state_from_str(&state).ok_or_else(|| {
            LoyaltyError::Internal(format!("story {} has unknown moderation state {}", id, state))
        })?,
        position: row.try_get("position")?,
        owner_id: row.try_get("owner_id")?,
        scope,
        content: decode_content(id, &content)?,
        created_at: from_millis(row.try_get("created_at")?)?,
        code_value: row.try_get("code_value")?,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::test_utils::{seed_goal, seed_organization, seed_user};
    use crate::backend::storage::DbConnection;
    use chrono::{Duration, TimeZone};

    fn new_story(scope: Scope, owner_id: i64, code_value: &str) -> NewStory {
        NewStory {
            description: "Great coffee".to_string(),
            is_recommending: true,
            owner_id,
            scope,
            content: vec![b"photo-1".to_vec(), vec![0, 159, 146, 150]],
            code_value: code_value.to_string(),
        }
    }

    async fn setup_test() -> DbConnection {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        seed_organization(&db, 3, "Corner Cafe", None).await;
        seed_organization(&db, 8, "Tattoo Studio", None).await;
        seed_goal(&db, 42, 8).await;
        seed_user(&db, 9, "consumer", None).await;
        seed_user(&db, 10, "consumer", None).await;
        db
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 15, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_story() {
        let db = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let created = StoryRepository::insert(&mut conn, &new_story(Scope::Goal(42), 9, "c1"), t0())
            .await
            .expect("Failed to insert story");
        let found = StoryRepository::find_by_id(&mut conn, created.id)
            .await
            .unwrap()
            .expect("Story should exist");

        assert_eq!(found, created);
        assert_eq!(found.moderation_state, ModerationState::OnCheck);
        assert_eq!(found.content[1], vec![0, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_list_by_organization_includes_goal_stories() {
        let db = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let via_goal = StoryRepository::insert(&mut conn, &new_story(Scope::Goal(42), 9, "c1"), t0())
            .await
            .unwrap();
        let direct = StoryRepository::insert(
            &mut conn,
            &new_story(Scope::Organization(8), 10, "c2"),
            t0() + Duration::minutes(1),
        )
        .await
        .unwrap();
        StoryRepository::insert(&mut conn, &new_story(Scope::Organization(3), 9, "c3"), t0())
            .await
            .unwrap();

        let ids: Vec<i64> = StoryRepository::list_by_organization(&mut conn, 8)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![direct.id, via_goal.id]);

        let mine = StoryRepository::list_by_owner(&mut conn, 9).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn test_shelf_position_is_exclusive() {
        let db = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let first = StoryRepository::insert(&mut conn, &new_story(Scope::Goal(42), 9, "c1"), t0())
            .await
            .unwrap();
        let second = StoryRepository::insert(&mut conn, &new_story(Scope::Organization(8), 10, "c2"), t0())
            .await
            .unwrap();

        StoryRepository::set_position(&mut conn, first.id, 2).await.unwrap();
        StoryRepository::clear_position_on_shelf(&mut conn, 8, 2, second.id).await.unwrap();
        StoryRepository::set_position(&mut conn, second.id, 2).await.unwrap();

        let shelf = StoryRepository::favorites(&mut conn, 8).await.unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].id, second.id);
    }

    #[tokio::test]
    async fn test_update_state_and_delete() {
        let db = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let story = StoryRepository::insert(&mut conn, &new_story(Scope::Organization(3), 9, "c1"), t0())
            .await
            .unwrap();

        assert!(StoryRepository::set_moderation_state(
            &mut conn,
            story.id,
            ModerationState::OnCheck,
            ModerationState::Allowed
        )
        .await
        .unwrap());
        assert!(!StoryRepository::set_moderation_state(
            &mut conn,
            story.id,
            ModerationState::OnCheck,
            ModerationState::Denied
        )
        .await
        .unwrap());
        StoryRepository::update_content(&mut conn, story.id, "Edited", false, None)
            .await
            .unwrap();

        let allowed = StoryRepository::list_by_state(&mut conn, ModerationState::Allowed).await.unwrap();
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].description, "Edited");
        assert_eq!(allowed[0].content, story.content);

        assert!(StoryRepository::delete(&mut conn, story.id).await.unwrap());
        assert!(!StoryRepository::delete(&mut conn, story.id).await.unwrap());
    }
}
