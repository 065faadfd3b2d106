//! Staff directory: users of the reception and floor terminals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Staff role. Floor staff carry the floor number they serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Reception,
    Floor(u8),
}

impl Role {
    /// Floor served, for floor staff
    pub fn floor(&self) -> Option<u8> {
        match self {
            Role::Floor(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Reception => write!(f, "reception"),
            Role::Floor(n) => write!(f, "floor{}", n),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// `admin`, `reception`, `floor3`, `floor_3`; legacy `recepcion` / `piso3` accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "admin" => return Ok(Role::Admin),
            "reception" | "recepcion" => return Ok(Role::Reception),
            _ => {}
        }
        lower
            .strip_prefix("floor")
            .or_else(|| lower.strip_prefix("piso"))
            .map(|rest| rest.trim_start_matches('_'))
            .and_then(|n| n.parse::<u8>().ok())
            .map(Role::Floor)
            .ok_or_else(|| format!("Invalid role: {}", s))
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct StaffRow {
    id: i32,
    username: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<StaffRow> for StaffUser {
    type Error = AppError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Staff user {}: {}", row.id, e)))?;
        Ok(StaffUser {
            id: row.id,
            username: row.username,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffUser {
    pub id: i32,
    pub username: String,
    /// `admin`, `reception` or `floor<n>`
    #[schema(value_type = String)]
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create staff request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStaff {
    #[validate(length(min = 1, max = 100, message = "Username must be 1 to 100 characters"))]
    pub username: String,
    #[schema(value_type = String)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("RECEPCION".parse::<Role>(), Ok(Role::Reception));
        assert_eq!("floor3".parse::<Role>(), Ok(Role::Floor(3)));
        assert_eq!("piso1".parse::<Role>(), Ok(Role::Floor(1)));
        assert_eq!("floor_2".parse::<Role>(), Ok(Role::Floor(2)));
        assert!("janitor".parse::<Role>().is_err());
        assert!("piso".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_round_trip_through_string() {
        for role in [Role::Admin, Role::Reception, Role::Floor(2)] {
            let s: String = role.into();
            assert_eq!(s.parse::<Role>(), Ok(role));
        }
        assert_eq!(Role::Floor(2).floor(), Some(2));
        assert_eq!(Role::Reception.floor(), None);
    }
}
