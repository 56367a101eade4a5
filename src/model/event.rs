use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    election::{CandidateId, ElectionId, PositionId},
    governance::{Parameter, ProposalId, TransactionId, VoteChoice},
    Address,
};

/// One notification per committed write, for off-ledger indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    PositionCreated {
        position_id: PositionId,
        title: String,
    },
    PositionDeactivated {
        position_id: PositionId,
    },
    ElectionCreated {
        election_id: ElectionId,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        creator: Address,
    },
    CandidateAdded {
        candidate_id: CandidateId,
        election_id: ElectionId,
        position_id: PositionId,
        name: String,
    },
    VoterAuthorized {
        voter: Address,
        reg_number: String,
    },
    VoteCast {
        voter: Address,
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    },
    ElectionEnded {
        election_id: ElectionId,
        ended_by: Address,
    },
    AdminAuthorized {
        admin: Address,
    },
    AdminRevoked {
        admin: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    TransactionSubmitted {
        transaction_id: TransactionId,
        submitter: Address,
    },
    TransactionConfirmed {
        transaction_id: TransactionId,
        admin: Address,
    },
    ConfirmationRevoked {
        transaction_id: TransactionId,
        admin: Address,
    },
    TransactionExecuted {
        transaction_id: TransactionId,
    },
    ProposalCreated {
        proposal_id: ProposalId,
        proposer: Address,
        voting_deadline: DateTime<Utc>,
    },
    ProposalVoted {
        proposal_id: ProposalId,
        voter: Address,
        choice: VoteChoice,
    },
    ProposalExecuted {
        proposal_id: ProposalId,
    },
    QuorumAdminAdded {
        admin: Address,
    },
    QuorumAdminRemoved {
        admin: Address,
    },
    ParameterChanged {
        parameter: Parameter,
        value: u32,
    },
}

/// An event with its position in the log and commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence number, starting at 1 and increasing by one per event.
    pub seq: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

impl Display for EventRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} @{} {:?}", self.seq, self.at.to_rfc3339(), self.event)
    }
}
