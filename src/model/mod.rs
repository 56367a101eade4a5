pub mod address;
pub mod candidate;
pub mod counter;
pub mod election;
pub mod event;
pub mod governance;
pub mod position;
pub mod voter;

pub use address::Address;
pub use candidate::Candidate;
pub use counter::Counter;
pub use election::{
    CandidateId, CandidateSpec, Election, ElectionId, ElectionSpec, ElectionStatus, ElectionType,
    PositionId, PositionSpec,
};
pub use event::{EventRecord, LedgerEvent};
pub use governance::{
    AdminAction, EmergencyAction, Parameter, PendingTransaction, Proposal, ProposalAction,
    ProposalId, TransactionId, VoteChoice,
};
pub use position::Position;
pub use voter::{Lockout, Voter, VoterRegistration};
