//! Staff directory repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::StaffDirectory;
use crate::{
    error::{AppError, AppResult},
    models::staff::{CreateStaff, Role, StaffRow, StaffUser},
};

#[derive(Clone)]
pub struct StaffRepository {
    pool: Pool<Postgres>,
}

impl StaffRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &str, role: Option<String>) -> AppResult<Vec<StaffUser>> {
        let mut builder = sqlx::query_as::<_, StaffRow>(query);
        if let Some(role) = role {
            builder = builder.bind(role);
        }
        let rows = builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(StaffUser::try_from).collect()
    }
}

#[async_trait]
impl StaffDirectory for StaffRepository {
    async fn create(&self, staff: &CreateStaff) -> AppResult<StaffUser> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            INSERT INTO staff_users (username, role, is_active, created_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (username) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&staff.username)
        .bind(staff.role.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::Conflict(format!(
                "Username {} is already taken",
                staff.username
            ))),
        }
    }

    async fn get(&self, id: i32) -> AppResult<Option<StaffUser>> {
        sqlx::query_as::<_, StaffRow>("SELECT * FROM staff_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(StaffUser::try_from)
            .transpose()
    }

    async fn list(&self) -> AppResult<Vec<StaffUser>> {
        self.fetch("SELECT * FROM staff_users ORDER BY username", None)
            .await
    }

    async fn users_for_floor(&self, floor: u8) -> AppResult<Vec<StaffUser>> {
        self.fetch(
            "SELECT * FROM staff_users WHERE is_active AND role = $1 ORDER BY id",
            Some(Role::Floor(floor).to_string()),
        )
        .await
    }

    async fn active_users(&self) -> AppResult<Vec<StaffUser>> {
        self.fetch("SELECT * FROM staff_users WHERE is_active ORDER BY id", None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs a reachable DATABASE_URL: cargo test -- --ignored
    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_concurrent_duplicate_username_is_conflict(pool: Pool<Postgres>) {
        let repo = StaffRepository::new(pool);
        let staff = CreateStaff {
            username: "piso2".to_string(),
            role: Role::Floor(2),
        };

        let (a, b) = tokio::join!(repo.create(&staff), repo.create(&staff));
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
        assert!(repo.get(999).await.unwrap().is_none());
    }
}
