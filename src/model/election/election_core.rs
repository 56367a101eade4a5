use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::Error;
use crate::model::Address;

use super::{CandidateId, ElectionId, PositionId};

/// The scope an election runs over. Serialized as its numeric tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ElectionType {
    General = 1,
    Departmental = 2,
    Level = 3,
}

impl TryFrom<u8> for ElectionType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::General),
            2 => Ok(Self::Departmental),
            3 => Ok(Self::Level),
            _ => Err(Error::validation("Invalid election type")),
        }
    }
}

/// Where an election sits in its lifecycle at a given instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Created, start time not reached yet. Candidates may still be added.
    Upcoming,
    /// Inside `[start_time, end_time]` and active. Votes are accepted.
    Open,
    /// Past `end_time` without being ended explicitly.
    Closed,
    /// Ended early by an administrator. Terminal.
    Ended,
}

/// A time-boxed election over a fixed snapshot of positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub election_type: ElectionType,
    /// Cleared when an administrator ends the election; never set again.
    pub is_active: bool,
    /// Votes cast across all positions.
    pub total_votes: u64,
    /// Positions snapshotted at creation, in the order given.
    pub position_ids: Vec<PositionId>,
    /// Candidates registered for each position of this election.
    pub candidates: BTreeMap<PositionId, Vec<CandidateId>>,
    /// Votes cast for each position of this election.
    pub position_votes: BTreeMap<PositionId, u64>,
    pub creator: Address,
    pub created_at: DateTime<Utc>,
}

impl Election {
    pub fn has_position(&self, position_id: PositionId) -> bool {
        self.position_ids.contains(&position_id)
    }

    /// Candidate ids registered for `position_id` in this election.
    pub fn candidates_for(&self, position_id: PositionId) -> &[CandidateId] {
        self.candidates
            .get(&position_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn votes_for_position(&self, position_id: PositionId) -> u64 {
        self.position_votes.get(&position_id).copied().unwrap_or(0)
    }

    /// Is the voting window open at `now`? Both ends are inclusive.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time <= now && now <= self.end_time
    }

    pub fn status(&self, now: DateTime<Utc>) -> ElectionStatus {
        if !self.is_active {
            ElectionStatus::Ended
        } else if now < self.start_time {
            ElectionStatus::Upcoming
        } else if now <= self.end_time {
            ElectionStatus::Open
        } else {
            ElectionStatus::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn election(start: DateTime<Utc>, end: DateTime<Utc>) -> Election {
        Election {
            id: 1,
            title: "Student Union 2030".to_string(),
            description: String::new(),
            start_time: start,
            end_time: end,
            election_type: ElectionType::General,
            is_active: true,
            total_votes: 0,
            position_ids: vec![1, 2],
            candidates: BTreeMap::new(),
            position_votes: BTreeMap::new(),
            creator: Address::owner_example(),
            created_at: start - Duration::hours(1),
        }
    }

    #[test]
    fn election_type_tags() {
        assert_eq!(ElectionType::try_from(2).unwrap(), ElectionType::Departmental);
        assert_eq!(
            ElectionType::try_from(4),
            Err(Error::validation("Invalid election type"))
        );
        assert_eq!(serde_json::to_string(&ElectionType::Level).unwrap(), "3");
        let parsed: ElectionType = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, ElectionType::General);
        assert!(serde_json::from_str::<ElectionType>("0").is_err());
    }

    #[test]
    fn status_window_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let end = start + Duration::hours(8);
        let mut election = election(start, end);

        assert_eq!(election.status(start - Duration::seconds(1)), ElectionStatus::Upcoming);
        assert_eq!(election.status(start), ElectionStatus::Open);
        assert_eq!(election.status(end), ElectionStatus::Open);
        assert_eq!(election.status(end + Duration::seconds(1)), ElectionStatus::Closed);
        assert!(election.is_open(start));
        assert!(election.is_open(end));
        assert!(!election.is_open(end + Duration::seconds(1)));

        election.is_active = false;
        assert_eq!(election.status(start), ElectionStatus::Ended);
        assert!(!election.is_open(start));
    }

    #[test]
    fn position_lookups() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let mut election = election(start, start + Duration::hours(8));
        election.candidates.insert(1, vec![4, 7]);
        election.position_votes.insert(1, 3);

        assert!(election.has_position(2));
        assert!(!election.has_position(3));
        assert_eq!(election.candidates_for(1), &[4, 7]);
        assert!(election.candidates_for(2).is_empty());
        assert_eq!(election.votes_for_position(1), 3);
        assert_eq!(election.votes_for_position(2), 0);
    }
}
