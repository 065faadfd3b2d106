//! Push device registrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Mobile platform of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => Err(format!("Invalid platform: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    id: i32,
    user_id: i32,
    token: String,
    platform: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for DeviceRegistration {
    type Error = AppError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let platform = row
            .platform
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Device {}: {}", row.id, e)))?;
        Ok(DeviceRegistration {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            platform,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Push token registered by a staff member's device. Tokens are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeviceRegistration {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub platform: Platform,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register (or re-register) a device
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterDevice {
    pub user_id: i32,
    #[validate(length(min = 1, max = 255, message = "Token must be 1 to 255 characters"))]
    pub token: String,
    pub platform: Platform,
}

/// Unregister a device (on logout)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UnregisterDevice {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}
