//! Live queue views for reception and floor terminals

use crate::{
    error::AppResult,
    models::turn::{non_blank, ArrivalOrder, Turn, TurnFilter, TurnState},
    repository::Repository,
};

/// States a visitor is still "in the building" in
const OPEN_STATES: [TurnState; 2] = [TurnState::Waiting, TurnState::Authorized];

#[derive(Clone)]
pub struct QueueService {
    repository: Repository,
}

impl QueueService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// WAITING and AUTHORIZED turns, first come first served
    pub async fn waiting_queue(&self, area_key: Option<String>) -> AppResult<Vec<Turn>> {
        self.open_turns(TurnFilter {
            area_key: non_blank(area_key),
            ..Default::default()
        })
        .await
    }

    /// Open turns routed to one floor
    pub async fn floor_queue(&self, floor: &str) -> AppResult<Vec<Turn>> {
        self.open_turns(TurnFilter {
            floor: Some(floor.trim().to_string()),
            ..Default::default()
        })
        .await
    }

    async fn open_turns(&self, filter: TurnFilter) -> AppResult<Vec<Turn>> {
        let filter = TurnFilter {
            states: OPEN_STATES.to_vec(),
            order: ArrivalOrder::OldestFirst,
            limit: None,
            ..filter
        };
        self.repository.turns.list(&filter).await
    }
}
