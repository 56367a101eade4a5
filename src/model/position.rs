use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::election::PositionId;

/// A contested seat. Positions exist independently of elections and are
/// attached to elections by id when an election is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    pub description: String,
    /// Cap on candidates per election this position runs in.
    pub max_candidates: u32,
    pub max_votes_per_voter: u32,
    pub is_active: bool,
    /// Candidates registered for this position, across all elections.
    pub candidate_count: u32,
    pub created_at: DateTime<Utc>,
}
