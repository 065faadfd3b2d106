//! Turns repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{TurnStore, UpdateOutcome};
use crate::{
    error::{AppError, AppResult},
    models::turn::{ArrivalOrder, NationalIdMatch, Turn, TurnFilter, TurnRow, TurnState},
};

#[derive(Clone)]
pub struct TurnsRepository {
    pool: Pool<Postgres>,
}

impl TurnsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Build the WHERE clause for a filter, numbering placeholders from `$1`
fn where_clause(filter: &TurnFilter) -> String {
    let mut conditions = Vec::new();
    let mut idx = 1;

    if !filter.states.is_empty() {
        conditions.push(format!("state = ANY(${})", idx));
        idx += 1;
    }
    if filter.area_key.is_some() {
        conditions.push(format!("area_key = ${}", idx));
        idx += 1;
    }
    if filter.floor.is_some() {
        conditions.push(format!("floor = ${}", idx));
        idx += 1;
    }
    match filter.national_id {
        Some(NationalIdMatch::Exact(_)) => {
            conditions.push(format!("national_id = ${}", idx));
            idx += 1;
        }
        Some(NationalIdMatch::Contains(_)) => {
            conditions.push(format!("national_id LIKE ${}", idx));
            idx += 1;
        }
        None => {}
    }
    if filter.name_contains.is_some() {
        conditions.push(format!("name ILIKE ${}", idx));
        idx += 1;
    }
    if filter.arrived_from.is_some() {
        conditions.push(format!("arrived_at >= ${}", idx));
        idx += 1;
    }
    if filter.arrived_before.is_some() {
        conditions.push(format!("arrived_at < ${}", idx));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// Escape LIKE wildcards in user input
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl TurnStore for TurnsRepository {
    async fn create(&self, turn: &Turn) -> AppResult<Turn> {
        let row = sqlx::query_as::<_, TurnRow>(
            r#"
            INSERT INTO visitor_turns (
                id, name, national_id, area_key, area_display_name, floor,
                motive_key, motive_text, state, arrived_at, authorized_at,
                attended_at, updated_at, called_by, handled_by, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(turn.id)
        .bind(&turn.name)
        .bind(&turn.national_id)
        .bind(&turn.area_key)
        .bind(&turn.area_display_name)
        .bind(&turn.floor)
        .bind(&turn.motive_key)
        .bind(&turn.motive_text)
        .bind(turn.state.as_str())
        .bind(turn.arrived_at)
        .bind(turn.authorized_at)
        .bind(turn.attended_at)
        .bind(turn.updated_at)
        .bind(&turn.called_by)
        .bind(&turn.handled_by)
        .bind(&turn.notes)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> AppResult<Turn> {
        sqlx::query_as::<_, TurnRow>("SELECT * FROM visitor_turns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Turn with id {} not found", id)))?
            .try_into()
    }

    async fn list(&self, filter: &TurnFilter) -> AppResult<Vec<Turn>> {
        let order = match filter.order {
            ArrivalOrder::NewestFirst => "arrived_at DESC, id DESC",
            ArrivalOrder::OldestFirst => "arrived_at ASC, id ASC",
        };
        let limit = filter
            .limit
            .map(|l| format!(" LIMIT {}", l.max(0)))
            .unwrap_or_default();

        let query = format!(
            "SELECT * FROM visitor_turns {} ORDER BY {}{}",
            where_clause(filter),
            order,
            limit
        );

        let mut builder = sqlx::query_as::<_, TurnRow>(&query);
        if !filter.states.is_empty() {
            let states: Vec<String> = filter.states.iter().map(|s| s.as_str().to_string()).collect();
            builder = builder.bind(states);
        }
        if let Some(ref area_key) = filter.area_key {
            builder = builder.bind(area_key);
        }
        if let Some(ref floor) = filter.floor {
            builder = builder.bind(floor);
        }
        match filter.national_id {
            Some(NationalIdMatch::Exact(ref id)) => builder = builder.bind(id),
            Some(NationalIdMatch::Contains(ref part)) => builder = builder.bind(like_pattern(part)),
            None => {}
        }
        if let Some(ref name) = filter.name_contains {
            builder = builder.bind(like_pattern(name));
        }
        if let Some(from) = filter.arrived_from {
            builder = builder.bind(from);
        }
        if let Some(before) = filter.arrived_before {
            builder = builder.bind(before);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        rows.into_iter().map(Turn::try_from).collect()
    }

    async fn update_if_state(&self, turn: &Turn, expected: TurnState) -> AppResult<UpdateOutcome> {
        let updated = sqlx::query_as::<_, TurnRow>(
            r#"
            UPDATE visitor_turns
            SET state = $3, authorized_at = $4, attended_at = $5, updated_at = $6,
                called_by = $7, handled_by = $8, notes = $9
            WHERE id = $1 AND state = $2
            RETURNING *
            "#,
        )
        .bind(turn.id)
        .bind(expected.as_str())
        .bind(turn.state.as_str())
        .bind(turn.authorized_at)
        .bind(turn.attended_at)
        .bind(turn.updated_at)
        .bind(&turn.called_by)
        .bind(&turn.handled_by)
        .bind(&turn.notes)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(UpdateOutcome::Updated(row.try_into()?));
        }

        // Lost the race, or the turn is gone
        let current: String = sqlx::query_scalar("SELECT state FROM visitor_turns WHERE id = $1")
            .bind(turn.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Turn with id {} not found", turn.id)))?;
        let current = current
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Turn {}: {}", turn.id, e)))?;
        Ok(UpdateOutcome::StateChanged(current))
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
