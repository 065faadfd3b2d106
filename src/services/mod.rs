//! Business logic services

pub mod chat;
pub mod devices;
pub mod notifications;
pub mod push;
pub mod queue;
pub mod staff;
pub mod stats;
pub mod turns;

use std::{sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    normalizer::Normalizer,
    repository::Repository,
};

use notifications::{NotificationDispatcher, NotificationQueue};
use push::{ExpoPushTransport, NoopTransport, PushTransport};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub normalizer: Normalizer,
    pub turns: turns::TurnsService,
    pub queue: queue::QueueService,
    pub stats: stats::StatsService,
    pub chat: chat::ChatService,
    pub devices: devices::DevicesService,
    pub staff: staff::StaffService,
}

impl Services {
    /// Create all services with the given repository. Spawns the notification
    /// worker, so this must run inside the tokio runtime.
    pub async fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        config.catalog.validate()?;
        let normalizer = Normalizer::new(Arc::new(config.catalog.clone()));

        let timeout = Duration::from_millis(config.notifications.timeout_ms);
        let transport: Arc<dyn PushTransport> = if config.notifications.enabled {
            let expo = ExpoPushTransport::new(config.notifications.push_url.clone(), timeout)
                .map_err(|e| AppError::Internal(format!("Push client: {}", e)))?;
            Arc::new(expo)
        } else {
            tracing::info!("Push notifications disabled");
            Arc::new(NoopTransport)
        };

        let dispatcher = NotificationDispatcher::new(
            repository.staff.clone(),
            repository.devices.clone(),
            transport,
            timeout,
        );
        let notifications =
            NotificationQueue::start(dispatcher, config.notifications.queue_capacity);

        Ok(Self {
            normalizer: normalizer.clone(),
            turns: turns::TurnsService::new(
                repository.clone(),
                normalizer,
                notifications.clone(),
                config.turns.clone(),
            ),
            queue: queue::QueueService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone()),
            chat: chat::ChatService::new(repository.clone(), notifications),
            devices: devices::DevicesService::new(repository.clone()),
            staff: staff::StaffService::new(repository.clone()),
            repository,
        })
    }
}
