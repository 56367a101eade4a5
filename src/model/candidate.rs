use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::election::{CandidateId, ElectionId, PositionId};

/// An entrant registered against exactly one (election, position) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    /// Display name.
    pub name: String,
    /// External registration number.
    pub reg_number: String,
    pub election_id: ElectionId,
    pub position_id: PositionId,
    pub bio: String,
    pub vote_count: u64,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Can this candidate receive a vote cast in `election_id` for `position_id`?
    pub fn runs_in(&self, election_id: ElectionId, position_id: PositionId) -> bool {
        self.election_id == election_id && self.position_id == position_id
    }
}
