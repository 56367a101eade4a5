mod election_core;
mod spec;

pub use election_core::{Election, ElectionStatus, ElectionType};
pub use spec::{CandidateSpec, ElectionSpec, PositionSpec};

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our position IDs are integers, independent of any election.
pub type PositionId = u32;
/// Our candidate IDs are integers, unique across all elections.
pub type CandidateId = u32;
