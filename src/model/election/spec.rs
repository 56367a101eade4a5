use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ElectionId, PositionId};

/// A position specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSpec {
    /// Position title, e.g. "President".
    pub title: String,
    pub description: String,
    /// Candidates allowed per election this position runs in.
    pub max_candidates: u32,
    /// Distinct votes one voter may cast for this position.
    pub max_votes_per_voter: u32,
}

/// An election specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    pub description: String,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
    /// Raw election type tag; see [`super::ElectionType`].
    pub election_type: u8,
    /// Existing positions this election covers.
    pub position_ids: Vec<PositionId>,
}

/// A candidate registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub election_id: ElectionId,
    pub position_id: PositionId,
    /// Display name.
    pub name: String,
    /// External registration number.
    pub reg_number: String,
    pub bio: String,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl PositionSpec {
        pub fn example1() -> Self {
            Self {
                title: "President".to_string(),
                description: "Leads the student union executive.".to_string(),
                max_candidates: 5,
                max_votes_per_voter: 1,
            }
        }

        pub fn example2() -> Self {
            Self {
                title: "Treasurer".to_string(),
                description: "Keeps the books.".to_string(),
                max_candidates: 2,
                max_votes_per_voter: 1,
            }
        }
    }

    impl ElectionSpec {
        /// Starts an hour after `now` and runs for a day.
        pub fn example(now: DateTime<Utc>, position_ids: Vec<PositionId>) -> Self {
            Self {
                title: "Student Union 2030".to_string(),
                description: "Annual executive elections.".to_string(),
                start_time: now + Duration::seconds(3600),
                end_time: now + Duration::seconds(90000),
                election_type: 1,
                position_ids,
            }
        }
    }

    impl CandidateSpec {
        pub fn example(election_id: ElectionId, position_id: PositionId, name: &str) -> Self {
            Self {
                election_id,
                position_id,
                name: name.to_string(),
                reg_number: format!("REG-{}", name.to_uppercase()),
                bio: format!("{name} has served on the union council."),
            }
        }
    }
}
