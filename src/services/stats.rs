//! Read-only rollups over turns. Days are UTC calendar days on `arrived_at`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::turn::{Turn, TurnFilter, TurnState},
    repository::Repository,
};

/// Areas listed in the daily summary
const SUMMARY_TOP_AREAS: usize = 5;
/// Motives listed by the motive breakdown
const MOTIVE_LIMIT: usize = 20;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StateCounts {
    pub waiting: i64,
    pub authorized: i64,
    pub attended: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AreaCount {
    pub area_key: String,
    /// Display name at the time the turns were created
    pub area: String,
    pub count: i64,
}

/// Daily dashboard
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsSummary {
    pub date: NaiveDate,
    pub total_today: i64,
    /// Turns that arrived today, by current state
    pub today: StateCounts,
    /// Open turns regardless of arrival day
    pub waiting_now: i64,
    pub authorized_now: i64,
    pub top_areas: Vec<AreaCount>,
    /// Mean seconds between arrival and authorization, over today's called turns
    pub average_wait_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FloorCount {
    pub floor: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AreaStats {
    pub area_display_name: String,
    pub floor: Option<String>,
    pub total: i64,
    pub attended: i64,
    pub waiting: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MotiveCount {
    pub motive: String,
    pub total: i64,
}

/// Day selector (defaults to today)
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DayQuery {
    /// YYYY-MM-DD
    pub date: Option<NaiveDate>,
}

/// Inclusive day range (defaults to today)
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RangeQuery {
    /// YYYY-MM-DD, defaults to `to`
    pub from: Option<NaiveDate>,
    /// YYYY-MM-DD, defaults to today
    pub to: Option<NaiveDate>,
}

/// `[from 00:00, to + 1 day 00:00)` in UTC
fn day_window(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
    (start, end)
}

pub fn count_states(turns: &[Turn]) -> StateCounts {
    let mut counts = StateCounts::default();
    for turn in turns {
        match turn.state {
            TurnState::Waiting => counts.waiting += 1,
            TurnState::Authorized => counts.authorized += 1,
            TurnState::Attended => counts.attended += 1,
            TurnState::Rejected => counts.rejected += 1,
        }
    }
    counts
}

/// Busiest areas first, grouped by area key, ties by key
pub fn top_areas(turns: &[Turn], limit: usize) -> Vec<AreaCount> {
    let mut counts: HashMap<&str, (&str, i64)> = HashMap::new();
    for turn in turns {
        counts
            .entry(turn.area_key.as_str())
            .or_insert((turn.area_display_name.as_str(), 0))
            .1 += 1;
    }
    let mut areas: Vec<AreaCount> = counts
        .into_iter()
        .map(|(key, (area, count))| AreaCount {
            area_key: key.to_string(),
            area: area.to_string(),
            count,
        })
        .collect();
    areas.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.area_key.cmp(&b.area_key))
    });
    areas.truncate(limit);
    areas
}

pub fn average_wait_seconds(turns: &[Turn]) -> Option<f64> {
    let waits: Vec<i64> = turns.iter().filter_map(Turn::wait_seconds).collect();
    if waits.is_empty() {
        None
    } else {
        Some(waits.iter().sum::<i64>() as f64 / waits.len() as f64)
    }
}

/// Totals per floor, ordered by floor (unknown floor last)
pub fn count_by_floor(turns: &[Turn]) -> Vec<FloorCount> {
    let mut counts: HashMap<Option<&str>, i64> = HashMap::new();
    for turn in turns {
        *counts.entry(turn.floor.as_deref()).or_default() += 1;
    }
    let mut floors: Vec<FloorCount> = counts
        .into_iter()
        .map(|(floor, total)| FloorCount {
            floor: floor.map(str::to_string),
            total,
        })
        .collect();
    floors.sort_by(|a, b| match (&a.floor, &b.floor) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    floors
}

/// Per area and floor, busiest first
pub fn count_by_area(turns: &[Turn]) -> Vec<AreaStats> {
    let mut groups: HashMap<(&str, Option<&str>), AreaStats> = HashMap::new();
    for turn in turns {
        let entry = groups
            .entry((turn.area_display_name.as_str(), turn.floor.as_deref()))
            .or_insert_with(|| AreaStats {
                area_display_name: turn.area_display_name.clone(),
                floor: turn.floor.clone(),
                total: 0,
                attended: 0,
                waiting: 0,
            });
        entry.total += 1;
        match turn.state {
            TurnState::Attended => entry.attended += 1,
            TurnState::Waiting => entry.waiting += 1,
            TurnState::Authorized | TurnState::Rejected => {}
        }
    }
    let mut areas: Vec<AreaStats> = groups.into_values().collect();
    areas.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.area_display_name.cmp(&b.area_display_name))
    });
    areas
}

/// Most frequent motive texts first
pub fn count_by_motive(turns: &[Turn], limit: usize) -> Vec<MotiveCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for turn in turns.iter().filter(|t| !t.motive_text.trim().is_empty()) {
        *counts.entry(turn.motive_text.as_str()).or_default() += 1;
    }
    let mut motives: Vec<MotiveCount> = counts
        .into_iter()
        .map(|(motive, total)| MotiveCount {
            motive: motive.to_string(),
            total,
        })
        .collect();
    motives.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.motive.cmp(&b.motive)));
    motives.truncate(limit);
    motives
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn turns_between(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Turn>> {
        let (start, end) = day_window(from, to);
        self.repository
            .turns
            .list(&TurnFilter {
                arrived_from: Some(start),
                arrived_before: Some(end),
                ..Default::default()
            })
            .await
    }

    pub async fn summary(&self, date: Option<NaiveDate>) -> AppResult<StatsSummary> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let today = self.turns_between(date, date).await?;
        let open = self
            .repository
            .turns
            .list(&TurnFilter {
                states: vec![TurnState::Waiting, TurnState::Authorized],
                ..Default::default()
            })
            .await?;
        let open_counts = count_states(&open);

        Ok(StatsSummary {
            date,
            total_today: today.len() as i64,
            today: count_states(&today),
            waiting_now: open_counts.waiting,
            authorized_now: open_counts.authorized,
            top_areas: top_areas(&today, SUMMARY_TOP_AREAS),
            average_wait_seconds: average_wait_seconds(&today),
        })
    }

    pub async fn by_floor(&self, date: Option<NaiveDate>) -> AppResult<Vec<FloorCount>> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        Ok(count_by_floor(&self.turns_between(date, date).await?))
    }

    pub async fn by_area(&self, date: Option<NaiveDate>) -> AppResult<Vec<AreaStats>> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        Ok(count_by_area(&self.turns_between(date, date).await?))
    }

    pub async fn by_motive(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<MotiveCount>> {
        let to = to.unwrap_or_else(|| Utc::now().date_naive());
        let from = from.unwrap_or(to);
        if from > to {
            return Err(AppError::BadRequest(format!(
                "Range start {} is after its end {}",
                from, to
            )));
        }
        Ok(count_by_motive(&self.turns_between(from, to).await?, MOTIVE_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{AreaMatch, MatchKind, MotiveMatch};

    fn turn(area: &str, floor: Option<&str>, motive: &str, arrived_at: DateTime<Utc>) -> Turn {
        let area = AreaMatch {
            key: area.to_uppercase(),
            display_name: area.to_string(),
            floor: floor.map(str::to_string),
            resolved_by: MatchKind::CatalogKey,
        };
        let motive = MotiveMatch {
            key: None,
            text: motive.to_string(),
            resolved_by: MatchKind::Unresolved,
        };
        Turn::new("Visitor".to_string(), None, area, motive, arrived_at)
    }

    fn sample(now: DateTime<Utc>) -> Vec<Turn> {
        let mut turns = vec![
            turn("Comedor", Some("1"), "Reclamo", now),
            turn("Comedor", Some("1"), "Reclamo", now),
            turn("Niñez", Some("2"), "Consulta", now),
            turn("Desconocida", None, "Reclamo", now),
        ];
        turns[0]
            .authorize(None, None, now + Duration::seconds(60))
            .unwrap();
        turns[0].attend(None, now + Duration::seconds(120)).unwrap();
        turns[1]
            .authorize(None, None, now + Duration::seconds(180))
            .unwrap();
        turns[2].reject(None, true, now).unwrap();
        turns
    }

    #[test]
    fn test_state_counts_and_wait() {
        let turns = sample(Utc::now());
        let counts = count_states(&turns);
        assert_eq!(
            counts,
            StateCounts {
                waiting: 1,
                authorized: 1,
                attended: 1,
                rejected: 1
            }
        );
        assert_eq!(average_wait_seconds(&turns), Some(120.0));
        assert_eq!(average_wait_seconds(&[]), None);
    }

    #[test]
    fn test_top_areas() {
        let areas = top_areas(&sample(Utc::now()), 2);
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].area_key, "COMEDOR");
        assert_eq!(areas[0].area, "Comedor");
        assert_eq!(areas[0].count, 2);
        assert_eq!(areas[1].area_key, "DESCONOCIDA");
    }

    #[test]
    fn test_by_floor_puts_unknown_last() {
        let floors = count_by_floor(&sample(Utc::now()));
        let keys: Vec<Option<&str>> = floors.iter().map(|f| f.floor.as_deref()).collect();
        assert_eq!(keys, vec![Some("1"), Some("2"), None]);
        assert_eq!(floors[0].total, 2);
    }

    #[test]
    fn test_by_area_breakdown() {
        let areas = count_by_area(&sample(Utc::now()));
        let comedor = &areas[0];
        assert_eq!(comedor.area_display_name, "Comedor");
        assert_eq!((comedor.total, comedor.attended, comedor.waiting), (2, 1, 0));
        let unknown = areas
            .iter()
            .find(|a| a.area_display_name == "Desconocida")
            .unwrap();
        assert_eq!(unknown.waiting, 1);
    }

    #[test]
    fn test_by_motive() {
        let motives = count_by_motive(&sample(Utc::now()), 20);
        assert_eq!(motives[0].motive, "Reclamo");
        assert_eq!(motives[0].total, 3);
        assert_eq!(count_by_motive(&sample(Utc::now()), 1).len(), 1);
    }

    #[tokio::test]
    async fn test_service_only_counts_the_selected_day() {
        let repository = Repository::in_memory();
        let today = Utc::now();
        let yesterday = today - Duration::days(1);
        for t in sample(today) {
            repository.turns.create(&t).await.unwrap();
        }
        repository
            .turns
            .create(&turn("Comedor", Some("1"), "Reclamo", yesterday))
            .await
            .unwrap();

        let stats = StatsService::new(repository);
        let summary = stats.summary(Some(today.date_naive())).await.unwrap();
        assert_eq!(summary.total_today, 4);
        assert_eq!(summary.waiting_now, 2);
        assert_eq!(summary.authorized_now, 1);

        let motives = stats
            .by_motive(Some(yesterday.date_naive()), Some(today.date_naive()))
            .await
            .unwrap();
        assert_eq!(motives[0].total, 4);

        let inverted = stats
            .by_motive(Some(today.date_naive()), Some(yesterday.date_naive()))
            .await;
        assert!(matches!(inverted, Err(AppError::BadRequest(_))));
    }
}
