//! Notification fan-out to staff devices.
//!
//! State transitions enqueue a [`NotificationEvent`] after they commit. A
//! background worker drains the queue and hands each event to the
//! [`NotificationDispatcher`], which resolves the audience, looks up active
//! device tokens and pushes one message per token. Delivery is best effort:
//! failures are logged and counted, never returned to the request that caused
//! the event.

use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinSet};

use super::push::{NotificationError, PushMessage, PushTransport};
use crate::{
    models::{chat::ChatMessage, device::DeviceRegistration, staff::StaffUser, turn::Turn},
    repository::{DeviceTokenRegistry, StaffDirectory},
};

/// Chat bodies are cut to this many characters in the push preview
const CHAT_PREVIEW_CHARS: usize = 100;

/// Something staff should hear about
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    NewTurn(Turn),
    TurnAuthorized(Turn),
    ChatMessage(ChatMessage),
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::NewTurn(_) => "new_turn",
            NotificationEvent::TurnAuthorized(_) => "turn_authorized",
            NotificationEvent::ChatMessage(_) => "chat_message",
        }
    }
}

/// What happened to one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nobody to notify (no staff on that floor, or the turn has no numeric floor)
    NoAudience,
    /// Audience found but none of them has an active device
    NoTokens,
    /// The staff directory or token registry failed
    LookupFailed,
    Sent {
        attempted: usize,
        delivered: usize,
        failed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event: &'static str,
    pub outcome: DispatchOutcome,
}

/// Resolves audiences and pushes messages
#[derive(Clone)]
pub struct NotificationDispatcher {
    staff: Arc<dyn StaffDirectory>,
    devices: Arc<dyn DeviceTokenRegistry>,
    transport: Arc<dyn PushTransport>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        staff: Arc<dyn StaffDirectory>,
        devices: Arc<dyn DeviceTokenRegistry>,
        transport: Arc<dyn PushTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            staff,
            devices,
            transport,
            timeout,
        }
    }

    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        match event {
            NotificationEvent::NewTurn(turn) => self.on_new_turn(turn).await,
            NotificationEvent::TurnAuthorized(turn) => self.on_turn_authorized(turn).await,
            NotificationEvent::ChatMessage(message) => self.on_chat_message(message).await,
        }
    }

    /// Tell the floor staff a visitor is waiting at reception
    pub async fn on_new_turn(&self, turn: &Turn) -> DispatchReport {
        let floor = turn.floor.clone().unwrap_or_default();
        let message = PushMessage {
            title: format!("🔔 New turn - {}", turn.area_display_name),
            body: format!("{} is waiting at reception", turn.name),
            data: json!({
                "type": "new_turn",
                "turn_id": turn.id,
                "floor": floor,
                "area": turn.area_display_name,
            }),
        };
        let outcome = self.notify_floor(turn, &message).await;
        DispatchReport {
            event: "new_turn",
            outcome,
        }
    }

    /// Tell the floor staff the visitor is on the way up
    pub async fn on_turn_authorized(&self, turn: &Turn) -> DispatchReport {
        let floor = turn.floor.clone().unwrap_or_default();
        let message = PushMessage {
            title: "✅ Visitor authorized".to_string(),
            body: format!("{} is on the way to floor {}", turn.name, floor),
            data: json!({
                "type": "turn_authorized",
                "turn_id": turn.id,
                "floor": floor,
            }),
        };
        let outcome = self.notify_floor(turn, &message).await;
        DispatchReport {
            event: "turn_authorized",
            outcome,
        }
    }

    /// Tell every active staff member except the sender
    pub async fn on_chat_message(&self, chat: &ChatMessage) -> DispatchReport {
        let message = PushMessage {
            title: format!("💬 Message from {}", chat.sender),
            body: chat.body.chars().take(CHAT_PREVIEW_CHARS).collect(),
            data: json!({
                "type": "chat_message",
                "message_id": chat.id,
                "origin": chat.origin.to_string(),
            }),
        };

        let outcome = match self.staff.active_users().await {
            Ok(users) => {
                let audience: Vec<StaffUser> =
                    users.into_iter().filter(|u| u.username != chat.sender).collect();
                self.push_to(&audience, &message).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve chat audience");
                DispatchOutcome::LookupFailed
            }
        };
        DispatchReport {
            event: "chat_message",
            outcome,
        }
    }

    async fn notify_floor(&self, turn: &Turn, message: &PushMessage) -> DispatchOutcome {
        let floor = match turn.floor.as_deref().and_then(|f| f.trim().parse::<u8>().ok()) {
            Some(floor) => floor,
            None => {
                tracing::debug!(turn_id = %turn.id, floor = ?turn.floor, "Turn has no numeric floor, nobody to notify");
                return DispatchOutcome::NoAudience;
            }
        };

        match self.staff.users_for_floor(floor).await {
            Ok(users) => self.push_to(&users, message).await,
            Err(e) => {
                tracing::warn!(error = %e, floor, "Failed to resolve floor staff");
                DispatchOutcome::LookupFailed
            }
        }
    }

    /// One independent send per active token
    async fn push_to(&self, audience: &[StaffUser], message: &PushMessage) -> DispatchOutcome {
        if audience.is_empty() {
            return DispatchOutcome::NoAudience;
        }

        let user_ids: Vec<i32> = audience.iter().map(|u| u.id).collect();
        let devices = match self.devices.active_tokens_for(&user_ids).await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to look up device tokens");
                return DispatchOutcome::LookupFailed;
            }
        };
        if devices.is_empty() {
            return DispatchOutcome::NoTokens;
        }

        let attempted = devices.len();
        let mut sends = JoinSet::new();
        for device in devices {
            let transport = self.transport.clone();
            let message = message.clone();
            let timeout = self.timeout;
            sends.spawn(async move {
                let result = match tokio::time::timeout(timeout, transport.send(&device, &message)).await {
                    Ok(result) => result,
                    Err(_) => Err(NotificationError::Timeout(timeout)),
                };
                (device, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((device, Err(e))) => log_failure(&device, &e),
                Err(e) => tracing::warn!(error = %e, "Push task panicked"),
            }
        }

        DispatchOutcome::Sent {
            attempted,
            delivered,
            failed: attempted - delivered,
        }
    }
}

fn log_failure(device: &DeviceRegistration, error: &NotificationError) {
    tracing::warn!(
        user_id = device.user_id,
        device_id = device.id,
        error = %error,
        "Push notification failed"
    );
}

/// Bounded hand-off between request handlers and the dispatch worker
#[derive(Clone)]
pub struct NotificationQueue {
    sender: Option<mpsc::Sender<NotificationEvent>>,
}

impl NotificationQueue {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(dispatcher: NotificationDispatcher, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<NotificationEvent>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let report = dispatcher.dispatch(&event).await;
                tracing::info!(event = report.event, outcome = ?report.outcome, "Notification dispatched");
            }
            tracing::debug!("Notification worker stopped");
        });

        Self {
            sender: Some(sender),
        }
    }

    /// Queue that drops every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Never blocks: when the queue is full the event is dropped with a warning
    pub fn enqueue(&self, event: NotificationEvent) {
        let Some(ref sender) = self.sender else {
            return;
        };
        let kind = event.kind();
        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(event = kind, "Notification queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(event = kind, "Notification worker gone, event dropped");
            }
        }
    }
}
