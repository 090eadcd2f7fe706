use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{from_millis, organization_repository::organization_from_row};
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::code::{code_type_from_str, code_type_to_str};
use crate::backend::domain::models::{DomainCode, Organization, Scope};

const CODE_COLUMNS: &str =
    "value, code_type, content, is_valid, created_at, expiration, owner_id, goal_id, organization_id";

/// Repository for redemption codes.
///
/// Every transition from valid to invalid is a single conditional UPDATE so
/// that concurrent callers cannot both observe a valid code and consume it.
pub struct CodeRepository;

impl CodeRepository {
    /// Store a freshly issued code
    pub async fn insert(conn: &mut SqliteConnection, code: &DomainCode) -> LoyaltyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO codes (value, code_type, content, is_valid, created_at, expiration,
                               owner_id, goal_id, organization_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code.value)
        .bind(code_type_to_str(code.code_type))
        .bind(&code.content)
        .bind(code.is_valid)
        .bind(code.created_at.timestamp_millis())
        .bind(code.expiration.timestamp_millis())
        .bind(code.owner_id)
        .bind(code.scope.goal_id())
        .bind(code.scope.organization_id())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Get a code by its value, whatever its validity
    pub async fn find_by_value(
        conn: &mut SqliteConnection,
        value: &str,
    ) -> LoyaltyResult<Option<DomainCode>> {
        let row = sqlx::query(&format!("SELECT {} FROM codes WHERE value = ?", CODE_COLUMNS))
            .bind(value)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(code_from_row).transpose()
    }

    /// Consume a code if it is still valid, unexpired and attached to `scope`.
    /// Returns false when no row matched.
    pub async fn consume(
        conn: &mut SqliteConnection,
        value: &str,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE codes
            SET is_valid = 0
            WHERE value = ?
              AND is_valid = 1
              AND expiration > ?
              AND goal_id IS ?
              AND organization_id IS ?
            "#,
        )
        .bind(value)
        .bind(now.timestamp_millis())
        .bind(scope.goal_id())
        .bind(scope.organization_id())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Consume a code only if it also belongs to `owner_id`; other users' codes are never written
    pub async fn consume_owned(
        conn: &mut SqliteConnection,
        value: &str,
        owner_id: i64,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE codes
            SET is_valid = 0
            WHERE value = ?
              AND owner_id = ?
              AND is_valid = 1
              AND expiration > ?
              AND goal_id IS ?
              AND organization_id IS ?
            "#,
        )
        .bind(value)
        .bind(owner_id)
        .bind(now.timestamp_millis())
        .bind(scope.goal_id())
        .bind(scope.organization_id())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Consume the newest live code `owner_id` holds for `scope`, returning its value
    pub async fn consume_latest_for_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<Option<String>> {
        let row = sqlx::query(
            r#"
            UPDATE codes
            SET is_valid = 0
            WHERE value = (
                SELECT value FROM codes
                WHERE owner_id = ?
                  AND goal_id IS ?
                  AND organization_id IS ?
                  AND is_valid = 1
                  AND expiration > ?
                ORDER BY created_at DESC, value
                LIMIT 1
            )
              AND is_valid = 1
            RETURNING value
            "#,
        )
        .bind(owner_id)
        .bind(scope.goal_id())
        .bind(scope.organization_id())
        .bind(now.timestamp_millis())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Blacklist a code regardless of scope if it is still valid and unexpired
    pub async fn blacklist(
        conn: &mut SqliteConnection,
        value: &str,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE codes
            SET is_valid = 0
            WHERE value = ? AND is_valid = 1 AND expiration > ?
            "#,
        )
        .bind(value)
        .bind(now.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Organizations where the user consumed a code, directly or through one of their goals
    pub async fn visited_organizations(
        conn: &mut SqliteConnection,
        owner_id: i64,
    ) -> LoyaltyResult<Vec<Organization>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT o.id, o.name, o.common_discount, o.max_discount,
                            o.step_amount, o.days_to_step_back
            FROM codes c
            LEFT JOIN goals g ON g.id = c.goal_id
            JOIN organizations o ON o.id = COALESCE(c.organization_id, g.owner_id)
            WHERE c.owner_id = ? AND c.is_valid = 0
            ORDER BY o.id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(organization_from_row).collect()
    }
}

fn code_from_row(row: &SqliteRow) -> LoyaltyResult<DomainCode> {
    let value: String = row.try_get("value")?;
    let code_type: String = row.try_get("code_type")?;
    let scope = Scope::from_ids(row.try_get("goal_id")?, row.try_get("organization_id")?)
        .ok_or_else(|| LoyaltyError::Internal(format!("code {} has an invalid scope", value)))?;

    Ok(DomainCode {
        code_type: code_type_from_str(&code_type).ok_or_else(|| {
            LoyaltyError::Internal(format!("code {} has unknown type {}", value, code_type))
        })?,
        content: row.try_get("content")?,
        is_valid: row.try_get("is_valid")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        expiration: from_millis(row.try_get("expiration")?)?,
        owner_id: row.try_get("owner_id")?,
        scope,
        value,
    })
}
