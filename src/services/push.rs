//! Push transports: Expo push API and a no-op sink

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::device::DeviceRegistration;

/// Prefix of every valid Expo push token
pub const EXPO_TOKEN_PREFIX: &str = "ExponentPushToken";

/// Failure to deliver one push. Logged by the dispatcher, never surfaced to API callers.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid push token: {0}")]
    InvalidToken(String),

    #[error("Push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Push service rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Push timed out after {0:?}")]
    Timeout(Duration),
}

/// Message pushed to one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Sends a single push to a single device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        device: &DeviceRegistration,
        message: &PushMessage,
    ) -> Result<(), NotificationError>;
}

/// Expo request payload
#[derive(Serialize)]
struct ExpoPayload<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
    priority: &'static str,
    #[serde(rename = "channelId")]
    channel_id: &'static str,
}

/// Expo push ticket; delivery errors come back in a 200 response
#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    message: Option<String>,
    details: Option<serde_json::Value>,
}

/// `data` is one ticket for a single `to`, a list for batched sends
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpoTickets {
    One(ExpoTicket),
    Many(Vec<ExpoTicket>),
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    data: Option<ExpoTickets>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Map an Expo HTTP response to the outcome of one push
fn check_expo_response(status: u16, body: &str) -> Result<(), NotificationError> {
    let rejected = |body: String| NotificationError::Rejected { status, body };

    if !(200..300).contains(&status) {
        return Err(rejected(body.to_string()));
    }
    let response: ExpoResponse = serde_json::from_str(body)
        .map_err(|e| rejected(format!("Unreadable push response: {}", e)))?;
    if !response.errors.is_empty() {
        return Err(rejected(serde_json::Value::from(response.errors).to_string()));
    }

    let ticket = match response.data {
        Some(ExpoTickets::One(ticket)) => ticket,
        Some(ExpoTickets::Many(tickets)) => tickets
            .into_iter()
            .next()
            .ok_or_else(|| rejected("Empty push ticket list".to_string()))?,
        None => return Err(rejected("Missing push ticket".to_string())),
    };

    if ticket.status == "ok" {
        return Ok(());
    }
    let reason = ticket
        .details
        .as_ref()
        .and_then(|d| d.get("error"))
        .and_then(|e| e.as_str())
        .map(str::to_string);
    Err(rejected(match (ticket.message, reason) {
        (Some(message), Some(reason)) => format!("{}: {}", reason, message),
        (Some(message), None) => message,
        (None, Some(reason)) => reason,
        (None, None) => format!("Push ticket status {}", ticket.status),
    }))
}

/// Transport posting to the Expo push API
#[derive(Debug, Clone)]
pub struct ExpoPushTransport {
    client: reqwest::Client,
    url: String,
}

impl ExpoPushTransport {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PushTransport for ExpoPushTransport {
    async fn send(
        &self,
        device: &DeviceRegistration,
        message: &PushMessage,
    ) -> Result<(), NotificationError> {
        if !device.token.starts_with(EXPO_TOKEN_PREFIX) {
            return Err(NotificationError::InvalidToken(device.token.clone()));
        }

        let payload = ExpoPayload {
            to: &device.token,
            sound: "default",
            title: &message.title,
            body: &message.body,
            data: &message.data,
            priority: "high",
            channel_id: "default",
        };

        let response = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        check_expo_response(status, &body)?;
        tracing::debug!(user_id = device.user_id, "Push delivered");
        Ok(())
    }
}

/// Transport used when notifications are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl PushTransport for NoopTransport {
    async fn send(
        &self,
        device: &DeviceRegistration,
        message: &PushMessage,
    ) -> Result<(), NotificationError> {
        tracing::debug!(user_id = device.user_id, title = %message.title, "Push skipped (notifications disabled)");
        Ok(())
    }
}
