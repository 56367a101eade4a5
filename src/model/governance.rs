use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{election::ElectionId, Address};

/// Our transaction IDs are integers.
pub type TransactionId = u32;
/// Our proposal IDs are integers.
pub type ProposalId = u32;

/// A privileged ledger write awaiting quorum confirmation. Executed with the
/// owner's authority once enough quorum admins confirm it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminAction {
    AuthorizeAdmin { account: Address },
    RevokeAdmin { account: Address },
    AuthorizeVoter { account: Address, reg_number: String },
    EndElection { election_id: ElectionId },
    Pause,
    Unpause,
    TransferOwnership { new_owner: Address },
}

/// A pending multi-party transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: TransactionId,
    pub action: AdminAction,
    pub submitter: Address,
    /// Quorum admins currently confirming this transaction.
    pub confirmations: BTreeSet<Address>,
    pub executed: bool,
    pub created_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn is_confirmed_by(&self, admin: &Address) -> bool {
        self.confirmations.contains(admin)
    }
}

/// Governance parameters a proposal may change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Confirmations needed for transactions, and the minimum for-votes for proposals.
    RequiredConfirmations,
    /// Seconds a new proposal stays open.
    ProposalVotingPeriod,
    /// Failed vote attempts before a lockout.
    LockoutThreshold,
    /// Seconds a lockout lasts.
    LockoutDuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "emergency", rename_all = "snake_case")]
pub enum EmergencyAction {
    Pause,
    Unpause,
    EndElection { election_id: ElectionId },
}

/// What a proposal does when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalAction {
    ParameterChange { parameter: Parameter, value: u32 },
    AddAdmin { account: Address },
    RemoveAdmin { account: Address },
    Emergency { action: EmergencyAction },
}

/// A quorum admin's vote on a proposal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

/// A time-boxed governance vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposer: Address,
    pub created_at: DateTime<Utc>,
    /// Votes are accepted up to and including this instant; execution only after it.
    pub voting_deadline: DateTime<Utc>,
    pub for_votes: u32,
    pub against_votes: u32,
    pub abstain_votes: u32,
    /// Who has voted, and how.
    pub votes: BTreeMap<Address, VoteChoice>,
    pub action: ProposalAction,
    pub executed: bool,
}

impl Proposal {
    pub fn has_voted(&self, admin: &Address) -> bool {
        self.votes.contains_key(admin)
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.voting_deadline
    }

    /// Does the tally carry, given the current confirmation threshold?
    pub fn passes(&self, required: u32) -> bool {
        self.for_votes > self.against_votes && self.for_votes >= required
    }

    pub(crate) fn tally(&mut self, admin: Address, choice: VoteChoice) {
        match choice {
            VoteChoice::For => self.for_votes += 1,
            VoteChoice::Against => self.against_votes += 1,
            VoteChoice::Abstain => self.abstain_votes += 1,
        }
        self.votes.insert(admin, choice);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn proposal() -> Proposal {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Proposal {
            id: 1,
            title: "Add a fourth admin".to_string(),
            description: String::new(),
            proposer: Address::admin_example(1),
            created_at: now,
            voting_deadline: now + Duration::days(3),
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
            votes: BTreeMap::new(),
            action: ProposalAction::AddAdmin {
                account: Address::admin_example(4),
            },
            executed: false,
        }
    }

    #[test]
    fn passing_needs_majority_and_threshold() {
        let mut proposal = proposal();
        proposal.tally(Address::admin_example(1), VoteChoice::For);
        // Majority, but below the threshold.
        assert!(!proposal.passes(2));
        assert!(proposal.passes(1));

        proposal.tally(Address::admin_example(2), VoteChoice::Against);
        // Tie never passes.
        assert!(!proposal.passes(1));

        proposal.tally(Address::admin_example(3), VoteChoice::For);
        assert!(proposal.passes(2));
        assert!(!proposal.passes(3));
        assert!(proposal.has_voted(&Address::admin_example(2)));
        assert!(!proposal.has_voted(&Address::admin_example(4)));
    }

    #[test]
    fn abstentions_do_not_count() {
        let mut proposal = proposal();
        proposal.tally(Address::admin_example(1), VoteChoice::Abstain);
        proposal.tally(Address::admin_example(2), VoteChoice::Abstain);
        assert_eq!(proposal.abstain_votes, 2);
        assert!(!proposal.passes(1));
    }

    #[test]
    fn action_wire_format() {
        let action = AdminAction::EndElection { election_id: 3 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "action": "end_election", "election_id": 3 })
        );

        let action: ProposalAction = serde_json::from_value(serde_json::json!({
            "kind": "parameter_change",
            "parameter": "lockout_threshold",
            "value": 3,
        }))
        .unwrap();
        assert_eq!(
            action,
            ProposalAction::ParameterChange {
                parameter: Parameter::LockoutThreshold,
                value: 3,
            }
        );
    }
}
