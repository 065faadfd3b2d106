//! Repository layer: storage traits and their Postgres / in-memory backends

pub mod chat;
pub mod devices;
pub mod memory;
pub mod staff;
pub mod turns;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        chat::{ChatMessage, CreateChatMessage},
        device::{DeviceRegistration, RegisterDevice},
        staff::{CreateStaff, StaffUser},
        turn::{Turn, TurnFilter, TurnState},
    },
};

/// Result of a compare-and-set update on a turn
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Turn),
    /// The stored state no longer matched; carries the state found
    StateChanged(TurnState),
}

/// Persistent record of turns. Turns are never deleted.
#[async_trait]
pub trait TurnStore: Send + Sync {
    async fn create(&self, turn: &Turn) -> AppResult<Turn>;

    /// Fails with `NotFound` when the id is unknown
    async fn get(&self, id: Uuid) -> AppResult<Turn>;

    /// Ties on `arrived_at` are broken by id
    async fn list(&self, filter: &TurnFilter) -> AppResult<Vec<Turn>>;

    /// Persist `turn` only if the stored state is still `expected`
    async fn update_if_state(&self, turn: &Turn, expected: TurnState) -> AppResult<UpdateOutcome>;

    async fn health_check(&self) -> AppResult<()>;
}

/// Append-only chat log
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append(&self, message: &CreateChatMessage) -> AppResult<ChatMessage>;

    /// Most recent `limit` messages, returned oldest first
    async fn recent(&self, limit: i64) -> AppResult<Vec<ChatMessage>>;

    async fn mark_read(&self, id: i64) -> AppResult<ChatMessage>;
}

/// Push tokens of staff devices
#[async_trait]
pub trait DeviceTokenRegistry: Send + Sync {
    /// Upsert by token: an existing token is reassigned to the user and reactivated
    async fn register(&self, device: &RegisterDevice) -> AppResult<DeviceRegistration>;

    /// Returns false when the token was unknown
    async fn deactivate(&self, token: &str) -> AppResult<bool>;

    async fn active_tokens_for(&self, user_ids: &[i32]) -> AppResult<Vec<DeviceRegistration>>;
}

/// Staff users, used to resolve notification audiences
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Fails with `Conflict` when the username is taken
    async fn create(&self, staff: &CreateStaff) -> AppResult<StaffUser>;

    async fn get(&self, id: i32) -> AppResult<Option<StaffUser>>;

    async fn list(&self) -> AppResult<Vec<StaffUser>>;

    /// Active staff whose role is `Floor(floor)`
    async fn users_for_floor(&self, floor: u8) -> AppResult<Vec<StaffUser>>;

    async fn active_users(&self) -> AppResult<Vec<StaffUser>>;
}

/// Main repository struct holding one handle per store
#[derive(Clone)]
pub struct Repository {
    pub turns: Arc<dyn TurnStore>,
    pub chat: Arc<dyn ChatStore>,
    pub devices: Arc<dyn DeviceTokenRegistry>,
    pub staff: Arc<dyn StaffDirectory>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            turns: Arc::new(turns::TurnsRepository::new(pool.clone())),
            chat: Arc::new(chat::ChatRepository::new(pool.clone())),
            devices: Arc::new(devices::DevicesRepository::new(pool.clone())),
            staff: Arc::new(staff::StaffRepository::new(pool)),
        }
    }

    /// Create a non-durable repository, for development and tests
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::InMemoryStore::default());
        Self {
            turns: store.clone(),
            chat: store.clone(),
            devices: store.clone(),
            staff: store,
        }
    }
}
