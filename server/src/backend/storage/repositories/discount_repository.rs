use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::from_millis;
use crate::backend::domain::error::LoyaltyResult;
use crate::backend::domain::models::DiscountLedgerEntry;

/// Repository for per (user, organization) discount ledger entries
pub struct DiscountRepository;

impl DiscountRepository {
    pub async fn find(
        conn: &mut SqliteConnection,
        user_id: i64,
        organization_id: i64,
    ) -> LoyaltyResult<Option<DiscountLedgerEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, discount_percentage, updated_at, user_id, organization_id
            FROM discounts
            WHERE user_id = ? AND organization_id = ?
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    /// Create the entry or overwrite its value
    pub async fn upsert(
        conn: &mut SqliteConnection,
        user_id: i64,
        organization_id: i64,
        discount_percentage: f64,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<DiscountLedgerEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO discounts (discount_percentage, updated_at, user_id, organization_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, organization_id) DO UPDATE SET
                discount_percentage = excluded.discount_percentage,
                updated_at = excluded.updated_at
            RETURNING id, discount_percentage, updated_at, user_id, organization_id
            "#,
        )
        .bind(discount_percentage)
        .bind(now.timestamp_millis())
        .bind(user_id)
        .bind(organization_id)
        .fetch_one(&mut *conn)
        .await?;

        entry_from_row(&row)
    }

    /// Overwrite the value only if nobody touched the entry since `expected_updated_at`.
    /// Returns false when another writer got there first.
    pub async fn update_if_unchanged(
        conn: &mut SqliteConnection,
        entry_id: i64,
        discount_percentage: f64,
        now: DateTime<Utc>,
        expected_updated_at: DateTime<Utc>,
    ) -> LoyaltyResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE discounts
            SET discount_percentage = ?, updated_at = ?
            WHERE id = ? AND updated_at = ?
            "#,
        )
        .bind(discount_percentage)
        .bind(now.timestamp_millis())
        .bind(entry_id)
        .bind(expected_updated_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn entry_from_row(row: &SqliteRow) -> LoyaltyResult<DiscountLedgerEntry> {
    Ok(DiscountLedgerEntry {
        id: row.try_get("id")?,
        discount_percentage: row.try_get("discount_percentage")?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
        user_id: row.try_get("user_id")?,
        organization_id: row.try_get("organization_id")?,
    })
}
