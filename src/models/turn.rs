//! Visitor turn model and its state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    normalizer::{AreaMatch, MotiveMatch, UNKNOWN_AREA_KEY},
};

/// Motive text stored when reception leaves the reason empty
pub const UNSPECIFIED_MOTIVE: &str = "UNSPECIFIED";

const REJECTION_PREFIX: &str = "Rejected: ";
const DEFAULT_REJECTION_REASON: &str = "unspecified";

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// Lifecycle state of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    /// Registered at reception, not yet called
    Waiting,
    /// Called up by floor staff
    Authorized,
    /// Served (terminal)
    Attended,
    /// Turned away (terminal)
    Rejected,
}

impl TurnState {
    pub const ALL: [TurnState; 4] = [
        TurnState::Waiting,
        TurnState::Authorized,
        TurnState::Attended,
        TurnState::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Waiting => "WAITING",
            TurnState::Authorized => "AUTHORIZED",
            TurnState::Attended => "ATTENDED",
            TurnState::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Attended | TurnState::Rejected)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TurnState {
    type Err = String;

    /// Accepts the canonical names and the legacy Spanish names found in
    /// visit logs imported from the previous system.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WAITING" | "ESPERA" => Ok(TurnState::Waiting),
            "AUTHORIZED" | "AUTORIZADO_SUBIR" => Ok(TurnState::Authorized),
            "ATTENDED" | "ATENDIDO" => Ok(TurnState::Attended),
            "REJECTED" | "RECHAZADO" => Ok(TurnState::Rejected),
            _ => Err(format!("Invalid turn state: {}", s)),
        }
    }
}

/// Transition requested on a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    Authorize,
    Attend,
    Reject,
    RevertAuthorization,
}

impl std::fmt::Display for TurnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TurnAction::Authorize => "authorize",
            TurnAction::Attend => "attend",
            TurnAction::Reject => "reject",
            TurnAction::RevertAuthorization => "revert the authorization of",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// Internal row structure for database queries (state stored as text)
#[derive(Debug, Clone, FromRow)]
pub struct TurnRow {
    id: Uuid,
    name: String,
    national_id: Option<String>,
    area_key: String,
    area_display_name: String,
    floor: Option<String>,
    motive_key: Option<String>,
    motive_text: String,
    state: String,
    arrived_at: DateTime<Utc>,
    authorized_at: Option<DateTime<Utc>>,
    attended_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    called_by: Option<String>,
    handled_by: Option<String>,
    notes: Option<String>,
}

impl TryFrom<TurnRow> for Turn {
    type Error = AppError;

    fn try_from(row: TurnRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Turn {}: {}", row.id, e)))?;

        Ok(Turn {
            id: row.id,
            name: row.name,
            national_id: row.national_id,
            area_key: row.area_key,
            area_display_name: row.area_display_name,
            floor: row.floor,
            motive_key: row.motive_key,
            motive_text: row.motive_text,
            state,
            arrived_at: row.arrived_at,
            authorized_at: row.authorized_at,
            attended_at: row.attended_at,
            updated_at: row.updated_at,
            called_by: row.called_by,
            handled_by: row.handled_by,
            notes: row.notes,
        })
    }
}

/// One visitor's request for service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Turn {
    pub id: Uuid,
    /// Visitor display name
    pub name: String,
    /// National id as typed at reception (not unique)
    pub national_id: Option<String>,
    /// Canonical area key, or UNKNOWN
    pub area_key: String,
    pub area_display_name: String,
    pub floor: Option<String>,
    /// Canonical motive key, null when unrecognized
    pub motive_key: Option<String>,
    /// Motive as typed at reception
    pub motive_text: String,
    pub state: TurnState,
    pub arrived_at: DateTime<Utc>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Staff member who called the visitor up
    pub called_by: Option<String>,
    /// Staff member who served the visitor
    pub handled_by: Option<String>,
    /// Append-only log, one entry per line
    pub notes: Option<String>,
}

impl Turn {
    /// Build a fresh WAITING turn from normalized reception input
    pub fn new(
        name: String,
        national_id: Option<String>,
        area: AreaMatch,
        motive: MotiveMatch,
        now: DateTime<Utc>,
    ) -> Self {
        let motive_text = if motive.text.is_empty() {
            UNSPECIFIED_MOTIVE.to_string()
        } else {
            motive.text
        };

        Self {
            id: Uuid::new_v4(),
            name,
            national_id,
            area_key: area.key,
            area_display_name: area.display_name,
            floor: area.floor,
            motive_key: motive.key,
            motive_text,
            state: TurnState::Waiting,
            arrived_at: now,
            authorized_at: None,
            attended_at: None,
            updated_at: now,
            called_by: None,
            handled_by: None,
            notes: None,
        }
    }

    fn ensure(&self, allowed: bool, requested: TurnAction) -> AppResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(AppError::InvalidState {
                current: self.state,
                requested,
            })
        }
    }

    /// WAITING -> AUTHORIZED. A second call is refused so two floor
    /// terminals cannot call the same visitor.
    pub fn authorize(
        &mut self,
        called_by: Option<String>,
        handled_by: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure(self.state == TurnState::Waiting, TurnAction::Authorize)?;

        self.state = TurnState::Authorized;
        self.authorized_at = Some(now);
        if called_by.is_some() {
            self.called_by = called_by;
        }
        if handled_by.is_some() {
            self.handled_by = handled_by;
        }
        self.updated_at = now;
        Ok(())
    }

    /// WAITING or AUTHORIZED -> ATTENDED. Walk-ins may skip authorization.
    pub fn attend(&mut self, handled_by: Option<String>, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure(!self.state.is_terminal(), TurnAction::Attend)?;

        self.state = TurnState::Attended;
        self.attended_at = Some(now);
        if handled_by.is_some() {
            self.handled_by = handled_by;
        }
        self.updated_at = now;
        Ok(())
    }

    /// WAITING -> REJECTED, and AUTHORIZED -> REJECTED when the policy allows it.
    /// `authorized_at` is kept so the audit log shows the visitor had been called.
    pub fn reject(
        &mut self,
        reason: Option<&str>,
        allow_after_authorization: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let allowed = match self.state {
            TurnState::Waiting => true,
            TurnState::Authorized => allow_after_authorization,
            TurnState::Attended | TurnState::Rejected => false,
        };
        self.ensure(allowed, TurnAction::Reject)?;

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON);
        self.append_note(&format!("{}{}", REJECTION_PREFIX, reason));
        self.state = TurnState::Rejected;
        self.updated_at = now;
        Ok(())
    }

    /// AUTHORIZED -> WAITING, undoing a call made by mistake
    pub fn revert_authorization(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure(
            self.state == TurnState::Authorized,
            TurnAction::RevertAuthorization,
        )?;

        self.state = TurnState::Waiting;
        self.authorized_at = None;
        self.called_by = None;
        self.updated_at = now;
        Ok(())
    }

    fn append_note(&mut self, entry: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, entry),
            _ => entry.to_string(),
        });
    }

    /// Seconds between arrival and the floor calling the visitor
    pub fn wait_seconds(&self) -> Option<i64> {
        self.authorized_at
            .map(|at| (at - self.arrived_at).num_seconds())
    }

    /// True when normalization could not place the turn in the catalog
    pub fn needs_review(&self) -> bool {
        self.area_key == UNKNOWN_AREA_KEY
            || (self.motive_key.is_none() && self.motive_text != UNSPECIFIED_MOTIVE)
    }
}

/// Turn representation returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TurnDetails {
    #[serde(flatten)]
    pub turn: Turn,
    /// Seconds waited before being called, when called
    pub wait_seconds: Option<i64>,
    /// Area or motive could not be resolved and should be checked by staff
    pub needs_review: bool,
}

impl From<Turn> for TurnDetails {
    fn from(turn: Turn) -> Self {
        Self {
            wait_seconds: turn.wait_seconds(),
            needs_review: turn.needs_review(),
            turn,
        }
    }
}

// ---------------------------------------------------------------------------
// Store filters
// ---------------------------------------------------------------------------

/// Ordering of list results by arrival time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrivalOrder {
    /// Recency views
    #[default]
    NewestFirst,
    /// FIFO queue views
    OldestFirst,
}

/// National id predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NationalIdMatch {
    Exact(String),
    Contains(String),
}

/// Filter understood by every turn store backend
#[derive(Debug, Clone, Default)]
pub struct TurnFilter {
    /// Any of these states; empty means any state
    pub states: Vec<TurnState>,
    pub area_key: Option<String>,
    pub floor: Option<String>,
    pub national_id: Option<NationalIdMatch>,
    /// Case-insensitive substring of the visitor name
    pub name_contains: Option<String>,
    /// Inclusive lower bound on `arrived_at`
    pub arrived_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `arrived_at`
    pub arrived_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub order: ArrivalOrder,
}

impl TurnFilter {
    /// Evaluate every predicate except `limit` and `order`
    pub fn matches(&self, turn: &Turn) -> bool {
        if !self.states.is_empty() && !self.states.contains(&turn.state) {
            return false;
        }
        if let Some(ref area_key) = self.area_key {
            if &turn.area_key != area_key {
                return false;
            }
        }
        if let Some(ref floor) = self.floor {
            if turn.floor.as_ref() != Some(floor) {
                return false;
            }
        }
        if let Some(ref national_id) = self.national_id {
            let candidate = turn.national_id.as_deref().unwrap_or_default();
            let hit = match national_id {
                NationalIdMatch::Exact(id) => !candidate.is_empty() && candidate == id,
                NationalIdMatch::Contains(part) => {
                    turn.national_id.is_some() && candidate.contains(part.as_str())
                }
            };
            if !hit {
                return false;
            }
        }
        if let Some(ref name) = self.name_contains {
            if !turn.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(from) = self.arrived_from {
            if turn.arrived_at < from {
                return false;
            }
        }
        if let Some(before) = self.arrived_before {
            if turn.arrived_at >= before {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// Create turn request (reception)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateTurn {
    /// Visitor name
    #[serde(default)]
    #[validate(length(max = 200, message = "Name is too long"))]
    pub name: String,
    #[validate(length(max = 20, message = "National id is too long"))]
    pub national_id: Option<String>,
    /// Canonical area key or any free-text area name
    #[serde(alias = "area")]
    #[validate(length(max = 200, message = "Area is too long"))]
    pub area_key: Option<String>,
    /// Free-text reason for the visit
    #[serde(alias = "motive")]
    #[validate(length(max = 300, message = "Motive is too long"))]
    pub motive_text: Option<String>,
}

/// Authorize (call up) request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthorizeTurn {
    pub called_by: Option<String>,
    pub handled_by: Option<String>,
}

/// Attend request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AttendTurn {
    pub handled_by: Option<String>,
}

/// Reject request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectTurn {
    pub reason: Option<String>,
}

/// Query parameters for the turn list
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct TurnQuery {
    /// WAITING, AUTHORIZED, ATTENDED or REJECTED
    pub state: Option<String>,
    pub area_key: Option<String>,
    pub floor: Option<String>,
    /// Partial national id
    pub national_id: Option<String>,
    /// Partial visitor name (at least 3 characters)
    pub name: Option<String>,
    /// Maximum number of turns returned
    pub limit: Option<i64>,
}

/// Query parameters for the FIFO queue
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct QueueQuery {
    pub area_key: Option<String>,
}

/// Most recent visitor matching a national id, used to prefill reception forms
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VisitorHistory {
    pub name: String,
    pub national_id: String,
    pub previous_visits: i64,
}

/// Full visit record of one visitor
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VisitorRecord {
    pub national_id: String,
    pub name: String,
    pub total_visits: i64,
    pub areas_visited: Vec<String>,
    pub motives: Vec<String>,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub turns: Vec<TurnDetails>,
}

/// Trim an optional string, mapping blank values to None
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
