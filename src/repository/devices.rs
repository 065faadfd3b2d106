//! Device token repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::DeviceTokenRegistry;
use crate::{
    error::AppResult,
    models::device::{DeviceRegistration, DeviceRow, RegisterDevice},
};

#[derive(Clone)]
pub struct DevicesRepository {
    pool: Pool<Postgres>,
}

impl DevicesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceTokenRegistry for DevicesRepository {
    async fn register(&self, device: &RegisterDevice) -> AppResult<DeviceRegistration> {
        sqlx::query_as::<_, DeviceRow>(
            r#"
            INSERT INTO device_tokens (user_id, token, platform, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, NOW(), NOW())
            ON CONFLICT (token) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                platform = EXCLUDED.platform,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(device.user_id)
        .bind(&device.token)
        .bind(device.platform.as_str())
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn deactivate(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_tokens SET is_active = FALSE, updated_at = NOW() WHERE token = $1",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn active_tokens_for(&self, user_ids: &[i32]) -> AppResult<Vec<DeviceRegistration>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT * FROM device_tokens WHERE is_active AND user_id = ANY($1) ORDER BY id",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DeviceRegistration::try_from).collect()
    }
}
