//! In-memory implementation of every store.
//!
//! Not durable: all state is lost on restart. Mutations take the write lock,
//! which also serializes compare-and-set updates on turns, so two terminals
//! racing on the same turn see exactly one winner.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChatStore, DeviceTokenRegistry, StaffDirectory, TurnStore, UpdateOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        chat::{ChatMessage, CreateChatMessage},
        device::{DeviceRegistration, RegisterDevice},
        staff::{CreateStaff, Role, StaffUser},
        turn::{ArrivalOrder, Turn, TurnFilter, TurnState},
    },
};

#[derive(Debug, Default)]
struct State {
    turns: HashMap<Uuid, Turn>,
    chat: Vec<ChatMessage>,
    devices: Vec<DeviceRegistration>,
    staff: Vec<StaffUser>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[async_trait]
impl TurnStore for InMemoryStore {
    async fn create(&self, turn: &Turn) -> AppResult<Turn> {
        let mut state = self.state.write().await;
        if state.turns.contains_key(&turn.id) {
            return Err(AppError::Conflict(format!("Turn {} already exists", turn.id)));
        }
        state.turns.insert(turn.id, turn.clone());
        Ok(turn.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Turn> {
        self.state
            .read()
            .await
            .turns
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Turn with id {} not found", id)))
    }

    async fn list(&self, filter: &TurnFilter) -> AppResult<Vec<Turn>> {
        let state = self.state.read().await;
        let mut turns: Vec<Turn> = state
            .turns
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        turns.sort_by(|a, b| (a.arrived_at, a.id).cmp(&(b.arrived_at, b.id)));
        if filter.order == ArrivalOrder::NewestFirst {
            turns.reverse();
        }
        if let Some(limit) = filter.limit {
            turns.truncate(limit.max(0) as usize);
        }
        Ok(turns)
    }

    async fn update_if_state(&self, turn: &Turn, expected: TurnState) -> AppResult<UpdateOutcome> {
        let mut state = self.state.write().await;
        let stored = state
            .turns
            .get_mut(&turn.id)
            .ok_or_else(|| AppError::NotFound(format!("Turn with id {} not found", turn.id)))?;

        if stored.state != expected {
            return Ok(UpdateOutcome::StateChanged(stored.state));
        }
        *stored = turn.clone();
        Ok(UpdateOutcome::Updated(turn.clone()))
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn append(&self, message: &CreateChatMessage) -> AppResult<ChatMessage> {
        let mut state = self.state.write().await;
        let id = state.chat.last().map(|m| m.id + 1).unwrap_or(1);
        let stored = ChatMessage {
            id,
            sender: message.sender.clone(),
            origin: message.origin,
            body: message.body.clone(),
            created_at: Utc::now(),
            read: false,
        };
        state.chat.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let skip = state.chat.len().saturating_sub(limit.max(0) as usize);
        Ok(state.chat[skip..].to_vec())
    }

    async fn mark_read(&self, id: i64) -> AppResult<ChatMessage> {
        let mut state = self.state.write().await;
        let message = state
            .chat
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Chat message with id {} not found", id)))?;
        message.read = true;
        Ok(message.clone())
    }
}

#[async_trait]
impl DeviceTokenRegistry for InMemoryStore {
    async fn register(&self, device: &RegisterDevice) -> AppResult<DeviceRegistration> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state.devices.iter_mut().find(|d| d.token == device.token) {
            existing.user_id = device.user_id;
            existing.platform = device.platform;
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let registration = DeviceRegistration {
            id: state.devices.len() as i32 + 1,
            user_id: device.user_id,
            token: device.token.clone(),
            platform: device.platform,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.devices.push(registration.clone());
        Ok(registration)
    }

    async fn deactivate(&self, token: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.devices.iter_mut().find(|d| d.token == token) {
            Some(device) => {
                device.is_active = false;
                device.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn active_tokens_for(&self, user_ids: &[i32]) -> AppResult<Vec<DeviceRegistration>> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .iter()
            .filter(|d| d.is_active && user_ids.contains(&d.user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StaffDirectory for InMemoryStore {
    async fn create(&self, staff: &CreateStaff) -> AppResult<StaffUser> {
        let mut state = self.state.write().await;
        if state.staff.iter().any(|u| u.username == staff.username) {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                staff.username
            )));
        }
        let user = StaffUser {
            id: state.staff.len() as i32 + 1,
            username: staff.username.clone(),
            role: staff.role,
            is_active: true,
            created_at: Utc::now(),
        };
        state.staff.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: i32) -> AppResult<Option<StaffUser>> {
        let state = self.state.read().await;
        Ok(state.staff.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<StaffUser>> {
        let mut users = self.state.read().await.staff.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn users_for_floor(&self, floor: u8) -> AppResult<Vec<StaffUser>> {
        let state = self.state.read().await;
        Ok(state
            .staff
            .iter()
            .filter(|u| u.is_active && u.role == Role::Floor(floor))
            .cloned()
            .collect())
    }

    async fn active_users(&self) -> AppResult<Vec<StaffUser>> {
        let state = self.state.read().await;
        Ok(state.staff.iter().filter(|u| u.is_active).cloned().collect())
    }
}
