use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::{Goal, Organization};

/// Read/write access to organizations and the goals they post.
///
/// Organization and goal CRUD live outside this service; only the accessors
/// needed for scope resolution and the discount policy are exposed here.
pub struct OrganizationRepository;

impl OrganizationRepository {
    pub async fn insert(conn: &mut SqliteConnection, organization: &Organization) -> LoyaltyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, common_discount, max_discount, step_amount, days_to_step_back)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(organization.id)
        .bind(&organization.name)
        .bind(organization.common_discount)
        .bind(organization.max_discount)
        .bind(organization.step_amount)
        .bind(organization.days_to_step_back)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        organization_id: i64,
    ) -> LoyaltyResult<Option<Organization>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, common_discount, max_discount, step_amount, days_to_step_back
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.as_ref().map(organization_from_row).transpose()
    }

    /// Persist the discount policy columns of an organization
    pub async fn update_policy(
        conn: &mut SqliteConnection,
        organization: &Organization,
    ) -> LoyaltyResult<()> {
        sqlx::query(
            r#"
            UPDATE organizations
            SET common_discount = ?, max_discount = ?, step_amount = ?, days_to_step_back = ?
            WHERE id = ?
            "#,
        )
        .bind(organization.common_discount)
        .bind(organization.max_discount)
        .bind(organization.step_amount)
        .bind(organization.days_to_step_back)
        .bind(organization.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn insert_goal(conn: &mut SqliteConnection, goal: &Goal) -> LoyaltyResult<()> {
        sqlx::query("INSERT INTO goals (id, owner_id, title) VALUES (?, ?, ?)")
            .bind(goal.id)
            .bind(goal.owner_id)
            .bind(&goal.title)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn find_goal(conn: &mut SqliteConnection, goal_id: i64) -> LoyaltyResult<Option<Goal>> {
        let row = sqlx::query("SELECT id, owner_id, title FROM goals WHERE id = ?")
            .bind(goal_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(r) => Ok(Some(Goal {
                id: r.try_get("id")?,
                owner_id: r.try_get("owner_id")?,
                title: r.try_get("title")?,
            })),
            None => Ok(None),
        }
    }

    /// Organization a goal belongs to, `NotFound` when the goal does not exist
    pub async fn goal_owner(conn: &mut SqliteConnection, goal_id: i64) -> LoyaltyResult<i64> {
        Self::find_goal(conn, goal_id)
            .await?
            .map(|goal| goal.owner_id)
            .ok_or_else(|| LoyaltyError::NotFound(format!("Goal {}", goal_id)))
    }
}

pub(crate) fn organization_from_row(row: &SqliteRow) -> LoyaltyResult<Organization> {
    Ok(Organization {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        common_discount: row.try_get("common_discount")?,
        max_discount: row.try_get("max_discount")?,
        step_amount: row.try_get("step_amount")?,
        days_to_step_back: row.try_get("days_to_step_back")?,
    })
}
