use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    election::{CandidateId, ElectionId, PositionId},
    Address,
};

/// Voter record. Created on authorization; the per-election choices are
/// only ever added to, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub address: Address,
    /// External registration number.
    pub reg_number: String,
    pub is_authorized: bool,
    pub authorized_at: Option<DateTime<Utc>>,
    /// Maps election IDs to the candidate chosen for each position voted on.
    pub choices: BTreeMap<ElectionId, BTreeMap<PositionId, CandidateId>>,
    pub total_votes_cast: u64,
}

impl Voter {
    /// A freshly authorized voter.
    pub fn new(address: Address, reg_number: String, now: DateTime<Utc>) -> Self {
        Self {
            address,
            reg_number,
            is_authorized: true,
            authorized_at: Some(now),
            choices: BTreeMap::new(),
            total_votes_cast: 0,
        }
    }

    pub fn has_voted(&self, election_id: ElectionId, position_id: PositionId) -> bool {
        self.choice(election_id, position_id).is_some()
    }

    pub fn choice(&self, election_id: ElectionId, position_id: PositionId) -> Option<CandidateId> {
        self.choices
            .get(&election_id)
            .and_then(|positions| positions.get(&position_id))
            .copied()
    }

    /// Record a choice. Callers must have checked [`Voter::has_voted`] first.
    pub(crate) fn record(
        &mut self,
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    ) {
        self.choices
            .entry(election_id)
            .or_default()
            .insert(position_id, candidate_id);
        self.total_votes_cast += 1;
    }
}

/// One entry of a batch voter authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRegistration {
    pub account: Address,
    pub reg_number: String,
}

/// Failed vote attempts by one account, and any lockout they caused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockout {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Lockout {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| now < until)
    }
}
