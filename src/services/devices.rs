//! Device token registration for push notifications

use validator::Validate;

use super::push::EXPO_TOKEN_PREFIX;
use crate::{
    error::{AppError, AppResult},
    models::device::{DeviceRegistration, RegisterDevice},
    repository::Repository,
};

#[derive(Clone)]
pub struct DevicesService {
    repository: Repository,
}

impl DevicesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a device, or re-activate and reassign an already known token
    pub async fn register(&self, mut device: RegisterDevice) -> AppResult<DeviceRegistration> {
        device.token = device.token.trim().to_string();
        device.validate()?;
        if !device.token.starts_with(EXPO_TOKEN_PREFIX) {
            return Err(AppError::Validation(format!(
                "Token must start with {}",
                EXPO_TOKEN_PREFIX
            )));
        }

        if self.repository.staff.get(device.user_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Staff user with id {} not found",
                device.user_id
            )));
        }

        let registration = self.repository.devices.register(&device).await?;
        tracing::info!(user_id = registration.user_id, platform = registration.platform.as_str(), "Device registered");
        Ok(registration)
    }

    pub async fn unregister(&self, token: &str) -> AppResult<()> {
        let token = token.trim();
        if !self.repository.devices.deactivate(token).await? {
            return Err(AppError::NotFound("Device token not registered".to_string()));
        }
        tracing::info!("Device unregistered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        device::Platform,
        staff::{CreateStaff, Role},
    };

    async fn with_staff() -> DevicesService {
        let repository = Repository::in_memory();
        repository
            .staff
            .create(&CreateStaff {
                username: "piso1".to_string(),
                role: Role::Floor(1),
            })
            .await
            .unwrap();
        DevicesService::new(repository)
    }

    #[tokio::test]
    async fn test_register_requires_expo_token() {
        let devices = with_staff().await;
        let err = devices
            .register(RegisterDevice {
                user_id: 1,
                token: "fcm:123".to_string(),
                platform: Platform::Android,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let ok = devices
            .register(RegisterDevice {
                user_id: 1,
                token: " ExponentPushToken[xyz] ".to_string(),
                platform: Platform::Ios,
            })
            .await
            .unwrap();
        assert_eq!(ok.token, "ExponentPushToken[xyz]");

        devices.unregister("ExponentPushToken[xyz]").await.unwrap();
        assert!(matches!(
            devices.unregister("ExponentPushToken[nope]").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_register_for_unknown_user_is_not_found() {
        let devices = with_staff().await;
        let err = devices
            .register(RegisterDevice {
                user_id: 42,
                token: "ExponentPushToken[orphan]".to_string(),
                platform: Platform::Android,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
