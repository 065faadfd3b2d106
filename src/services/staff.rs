//! Staff directory service

use validator::Validate;

use crate::{
    error::AppResult,
    models::staff::{CreateStaff, StaffUser},
    repository::Repository,
};

#[derive(Clone)]
pub struct StaffService {
    repository: Repository,
}

impl StaffService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, mut staff: CreateStaff) -> AppResult<StaffUser> {
        staff.username = staff.username.trim().to_string();
        staff.validate()?;
        let user = self.repository.staff.create(&staff).await?;
        tracing::info!(user_id = user.id, role = %user.role, "Staff user created");
        Ok(user)
    }

    pub async fn list(&self) -> AppResult<Vec<StaffUser>> {
        self.repository.staff.list().await
    }
}
