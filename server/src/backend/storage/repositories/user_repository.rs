use sqlx::{Row, SqliteConnection};

use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::{Role, User};

/// Read access to the identities the auth collaborator resolves
pub struct UserRepository;

impl UserRepository {
    pub async fn insert(conn: &mut SqliteConnection, user: &User, login: &str) -> LoyaltyResult<()> {
        sqlx::query("INSERT INTO users (id, login, role, organization_id) VALUES (?, ?, ?, ?)")
            .bind(user.id)
            .bind(login)
            .bind(user.role.as_str())
            .bind(user.organization_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, user_id: i64) -> LoyaltyResult<Option<User>> {
        let row = sqlx::query("SELECT id, role, organization_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row.try_get("role")?;
        Ok(Some(User {
            id: row.try_get("id")?,
            role: Role::parse(&role).ok_or_else(|| {
                LoyaltyError::Internal(format!("user {} has unknown role {}", user_id, role))
            })?,
            organization_id: row.try_get("organization_id")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::DbConnection;

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let mut conn = db.pool().acquire().await.unwrap();
        sqlx::query("INSERT INTO organizations (id, name) VALUES (5, 'Bakery')")
            .execute(&mut *conn)
            .await
            .unwrap();

        let staff = User { id: 11, role: Role::OrgAdmin, organization_id: Some(5) };
        UserRepository::insert(&mut conn, &staff, "baker@example.com").await.unwrap();

        assert_eq!(UserRepository::find_by_id(&mut conn, 11).await.unwrap(), Some(staff));
        assert_eq!(UserRepository::find_by_id(&mut conn, 12).await.unwrap(), None);
    }
}
