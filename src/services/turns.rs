//! Turn lifecycle service: creation, transitions and lookups

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

use super::notifications::{NotificationEvent, NotificationQueue};
use crate::{
    config::TurnsConfig,
    error::{AppError, AppResult},
    models::turn::{
        non_blank, ArrivalOrder, AttendTurn, AuthorizeTurn, CreateTurn, NationalIdMatch,
        RejectTurn, Turn, TurnAction, TurnDetails, TurnFilter, TurnQuery, TurnState,
        VisitorHistory, VisitorRecord,
    },
    normalizer::Normalizer,
    repository::{Repository, UpdateOutcome},
};

/// Re-reads attempted when a concurrent writer changes the turn under us
const MAX_TRANSITION_ATTEMPTS: usize = 3;
/// Visits considered by the reception autocomplete
const HISTORY_DEPTH: i64 = 5;
const MIN_NAME_SEARCH_CHARS: usize = 3;

#[derive(Clone)]
pub struct TurnsService {
    repository: Repository,
    normalizer: Normalizer,
    notifications: NotificationQueue,
    config: TurnsConfig,
}

impl TurnsService {
    pub fn new(
        repository: Repository,
        normalizer: Normalizer,
        notifications: NotificationQueue,
        config: TurnsConfig,
    ) -> Self {
        Self {
            repository,
            normalizer,
            notifications,
            config,
        }
    }

    /// Register a visitor at reception
    pub async fn create(&self, request: CreateTurn) -> AppResult<Turn> {
        request.validate()?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        let area_raw = non_blank(request.area_key)
            .ok_or_else(|| AppError::Validation("Area is required".to_string()))?;

        let area = self.normalizer.normalize_area(&area_raw);
        let motive = self
            .normalizer
            .normalize_motive(request.motive_text.as_deref().unwrap_or_default());
        let (area_stage, motive_stage) = (area.resolved_by, motive.resolved_by);

        let turn = Turn::new(
            name.to_string(),
            non_blank(request.national_id),
            area,
            motive,
            Utc::now(),
        );
        let turn = self.repository.turns.create(&turn).await?;

        if turn.needs_review() {
            tracing::warn!(
                turn_id = %turn.id,
                area = %area_raw,
                motive = %turn.motive_text,
                "Turn could not be fully normalized, needs review"
            );
        }
        tracing::info!(
            turn_id = %turn.id,
            area_key = %turn.area_key,
            area_stage = ?area_stage,
            motive_stage = ?motive_stage,
            "Turn created"
        );

        self.notifications
            .enqueue(NotificationEvent::NewTurn(turn.clone()));
        Ok(turn)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Turn> {
        self.repository.turns.get(id).await
    }

    /// Filtered list, most recent first
    pub async fn list(&self, query: TurnQuery) -> AppResult<Vec<Turn>> {
        let states = match non_blank(query.state) {
            Some(state) => vec![state.parse::<TurnState>().map_err(AppError::BadRequest)?],
            None => Vec::new(),
        };

        let name_contains = non_blank(query.name);
        if let Some(ref name) = name_contains {
            if name.chars().count() < MIN_NAME_SEARCH_CHARS {
                return Err(AppError::Validation(format!(
                    "Name search needs at least {} characters",
                    MIN_NAME_SEARCH_CHARS
                )));
            }
        }

        let filter = TurnFilter {
            states,
            area_key: non_blank(query.area_key),
            floor: non_blank(query.floor),
            national_id: non_blank(query.national_id).map(NationalIdMatch::Contains),
            name_contains,
            limit: Some(self.clamp_limit(query.limit)),
            order: ArrivalOrder::NewestFirst,
            ..Default::default()
        };

        self.repository.turns.list(&filter).await
    }

    fn clamp_limit(&self, limit: Option<i64>) -> i64 {
        limit
            .unwrap_or(self.config.default_list_limit)
            .clamp(1, self.config.max_list_limit.max(1))
    }

    /// Floor calls the visitor up
    pub async fn authorize(&self, id: Uuid, request: AuthorizeTurn) -> AppResult<Turn> {
        let called_by = non_blank(request.called_by);
        let handled_by = non_blank(request.handled_by);

        let turn = self
            .transition(id, TurnAction::Authorize, |turn, now| {
                turn.authorize(called_by.clone(), handled_by.clone(), now)
            })
            .await?;

        self.notifications
            .enqueue(NotificationEvent::TurnAuthorized(turn.clone()));
        Ok(turn)
    }

    pub async fn attend(&self, id: Uuid, request: AttendTurn) -> AppResult<Turn> {
        let handled_by = non_blank(request.handled_by);
        self.transition(id, TurnAction::Attend, |turn, now| {
            turn.attend(handled_by.clone(), now)
        })
        .await
    }

    pub async fn reject(&self, id: Uuid, request: RejectTurn) -> AppResult<Turn> {
        let allow_after_authorization = self.config.allow_reject_authorized;
        self.transition(id, TurnAction::Reject, |turn, now| {
            turn.reject(request.reason.as_deref(), allow_after_authorization, now)
        })
        .await
    }

    pub async fn revert_authorization(&self, id: Uuid) -> AppResult<Turn> {
        self.transition(id, TurnAction::RevertAuthorization, |turn, now| {
            turn.revert_authorization(now)
        })
        .await
    }

    /// Apply `mutate` to the stored turn and persist it with a compare-and-set
    /// on the state it was read in. A lost race re-reads the turn, so the
    /// transition is judged against the state that actually won.
    async fn transition<F>(&self, id: Uuid, action: TurnAction, mutate: F) -> AppResult<Turn>
    where
        F: Fn(&mut Turn, DateTime<Utc>) -> AppResult<()>,
    {
        let mut last_seen = None;

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let mut turn = self.repository.turns.get(id).await?;
            let expected = turn.state;

            if let Err(e) = mutate(&mut turn, Utc::now()) {
                tracing::info!(turn_id = %id, state = %expected, action = %action, "Transition refused");
                return Err(e);
            }

            match self.repository.turns.update_if_state(&turn, expected).await? {
                UpdateOutcome::Updated(turn) => {
                    tracing::info!(turn_id = %id, from = %expected, to = %turn.state, "Turn transitioned");
                    return Ok(turn);
                }
                UpdateOutcome::StateChanged(current) => {
                    tracing::debug!(turn_id = %id, expected = %expected, current = %current, "Concurrent update, retrying");
                    last_seen = Some(current);
                }
            }
        }

        Err(AppError::InvalidState {
            current: last_seen.unwrap_or(TurnState::Waiting),
            requested: action,
        })
    }

    /// Most recent visitor with this exact national id, for reception autocomplete
    pub async fn history(&self, national_id: &str) -> AppResult<Option<VisitorHistory>> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(AppError::Validation("National id is required".to_string()));
        }

        let recent = self
            .repository
            .turns
            .list(&TurnFilter {
                national_id: Some(NationalIdMatch::Exact(national_id.to_string())),
                limit: Some(HISTORY_DEPTH),
                order: ArrivalOrder::NewestFirst,
                ..Default::default()
            })
            .await?;

        Ok(recent.first().map(|last| VisitorHistory {
            name: last.name.clone(),
            national_id: national_id.to_string(),
            previous_visits: recent.len() as i64,
        }))
    }

    /// Every visit whose national id contains `national_id`
    pub async fn visitor_record(&self, national_id: &str) -> AppResult<VisitorRecord> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(AppError::Validation("National id is required".to_string()));
        }

        let turns = self
            .repository
            .turns
            .list(&TurnFilter {
                national_id: Some(NationalIdMatch::Contains(national_id.to_string())),
                order: ArrivalOrder::NewestFirst,
                ..Default::default()
            })
            .await?;

        let (last, first) = match (turns.first(), turns.last()) {
            (Some(last), Some(first)) => (last.clone(), first.clone()),
            _ => {
                return Err(AppError::NotFound(format!(
                    "No visits found for national id {}",
                    national_id
                )))
            }
        };

        let areas_visited: BTreeSet<String> =
            turns.iter().map(|t| t.area_display_name.clone()).collect();
        let motives: BTreeSet<String> = turns.iter().map(|t| t.motive_text.clone()).collect();

        Ok(VisitorRecord {
            national_id: national_id.to_string(),
            name: last.name,
            total_visits: turns.len() as i64,
            areas_visited: areas_visited.into_iter().collect(),
            motives: motives.into_iter().collect(),
            first_visit: first.arrived_at,
            last_visit: last.arrived_at,
            turns: turns.into_iter().map(TurnDetails::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Catalog;
    use std::sync::Arc;

    fn service_with(config: TurnsConfig) -> TurnsService {
        TurnsService::new(
            Repository::in_memory(),
            Normalizer::new(Arc::new(Catalog::default())),
            NotificationQueue::disabled(),
            config,
        )
    }

    fn service() -> TurnsService {
        service_with(TurnsConfig::default())
    }

    fn request(name: &str, national_id: Option<&str>, area: &str, motive: Option<&str>) -> CreateTurn {
        CreateTurn {
            name: name.to_string(),
            national_id: national_id.map(str::to_string),
            area_key: Some(area.to_string()),
            motive_text: motive.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_input() {
        let turn = service()
            .create(request(
                " Juan Pérez ",
                Some("30123456"),
                "Dirección General de Políticas Alimentarias",
                Some("SOLICITUD DE MATERIALES"),
            ))
            .await
            .unwrap();

        assert_eq!(turn.name, "Juan Pérez");
        assert_eq!(turn.area_key, "POLITICAS_ALIMENTARIAS");
        assert_eq!(turn.floor.as_deref(), Some("1"));
        assert_eq!(turn.motive_key.as_deref(), Some("MATERIALES"));
        assert_eq!(turn.state, TurnState::Waiting);
        assert!(!turn.needs_review());
    }

    #[tokio::test]
    async fn test_create_requires_name_and_area() {
        let svc = service();
        let err = svc.create(request("   ", None, "AC", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = svc.create(request("Ana", None, "  ", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let listed = svc.list(TurnQuery::default()).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_area_is_kept_for_review() {
        let turn = service()
            .create(request("Ana", None, "Tesorería", None))
            .await
            .unwrap();
        assert_eq!(turn.area_key, "UNKNOWN");
        assert_eq!(turn.area_display_name, "Tesorería");
        assert!(turn.floor.is_none());
        assert!(turn.needs_review());
    }

    #[tokio::test]
    async fn test_double_authorize_is_refused() {
        let svc = service();
        let turn = svc.create(request("Ana", None, "AC", None)).await.unwrap();
        svc.authorize(turn.id, AuthorizeTurn::default()).await.unwrap();

        let err = svc
            .authorize(turn.id, AuthorizeTurn::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidState {
                current: TurnState::Authorized,
                requested: TurnAction::Authorize
            }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_authorize_has_one_winner() {
        let svc = service();
        let turn = svc.create(request("Ana", None, "AC", None)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..6 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.authorize(
                    turn.id,
                    AuthorizeTurn {
                        called_by: Some(format!("floor{}", i)),
                        handled_by: None,
                    },
                )
                .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AppError::InvalidState { .. })),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_reject_policy_after_authorization() {
        let strict = service_with(TurnsConfig {
            allow_reject_authorized: false,
            ..Default::default()
        });
        let turn = strict.create(request("Ana", None, "AC", None)).await.unwrap();
        strict.authorize(turn.id, AuthorizeTurn::default()).await.unwrap();
        let err = strict
            .reject(turn.id, RejectTurn { reason: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
        assert_eq!(strict.get(turn.id).await.unwrap().state, TurnState::Authorized);

        let lenient = service();
        let turn = lenient.create(request("Ana", None, "AC", None)).await.unwrap();
        lenient.authorize(turn.id, AuthorizeTurn::default()).await.unwrap();
        let rejected = lenient
            .reject(
                turn.id,
                RejectTurn {
                    reason: Some("did not show up".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.state, TurnState::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("Rejected: did not show up"));
    }

    #[tokio::test]
    async fn test_unknown_turn() {
        let err = service()
            .attend(Uuid::new_v4(), AttendTurn::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let svc = service();
        svc.create(request("Juan Pérez", Some("30123456"), "AC", None))
            .await
            .unwrap();
        svc.create(request("María López", Some("28999111"), "Niñez", None))
            .await
            .unwrap();

        let by_name = svc
            .list(TurnQuery {
                name: Some("pér".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_floor = svc
            .list(TurnQuery {
                floor: Some("2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_floor.len(), 1);
        assert_eq!(by_floor[0].name, "María López");

        let short = svc
            .list(TurnQuery {
                name: Some("ju".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let bad_state = svc
            .list(TurnQuery {
                state: Some("DONE".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad_state, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_history_and_visitor_record() {
        let svc = service();
        assert!(svc.history("30123456").await.unwrap().is_none());

        for _ in 0..7 {
            svc.create(request("Juan Pérez", Some("30123456"), "AC", Some("Reclamo")))
                .await
                .unwrap();
        }
        svc.create(request("Juan P.", Some("30123456"), "Comedor", Some("Consulta")))
            .await
            .unwrap();

        let history = svc.history("30123456").await.unwrap().unwrap();
        assert_eq!(history.name, "Juan P.");
        assert_eq!(history.previous_visits, 5);

        let record = svc.visitor_record("3012").await.unwrap();
        assert_eq!(record.total_visits, 8);
        assert_eq!(record.name, "Juan P.");
        assert!(record.first_visit <= record.last_visit);
        assert!(record.motives.contains(&"Reclamo".to_string()));

        let missing = svc.visitor_record("99").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
