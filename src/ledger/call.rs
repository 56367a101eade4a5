use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logging::CallLogger;
use crate::model::{
    AdminAction, Address, CandidateId, CandidateSpec, ElectionId, ElectionSpec, EventRecord,
    PositionId, PositionSpec, ProposalAction, ProposalId, TransactionId, VoteChoice,
    VoterRegistration,
};

use super::{CallContext, LedgerState};

/// Every write the ledger accepts, as an operation name plus typed
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerCall {
    // Registry.
    CreatePosition(PositionSpec),
    DeactivatePosition {
        position_id: PositionId,
    },
    CreateElection(ElectionSpec),
    AddCandidate(CandidateSpec),

    // Ballot box.
    AuthorizeVoter {
        account: Address,
        reg_number: String,
    },
    AuthorizeVoters {
        voters: Vec<VoterRegistration>,
    },
    Vote {
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    },
    EndElection {
        election_id: ElectionId,
    },

    // Identity.
    AuthorizeAdmin {
        account: Address,
    },
    RevokeAdmin {
        account: Address,
    },
    Pause,
    Unpause,
    TransferOwnership {
        new_owner: Address,
    },

    // Governance.
    SubmitTransaction {
        action: AdminAction,
    },
    ConfirmTransaction {
        transaction_id: TransactionId,
    },
    RevokeConfirmation {
        transaction_id: TransactionId,
    },
    ExecuteTransaction {
        transaction_id: TransactionId,
    },
    CreateProposal {
        title: String,
        #[serde(default)]
        description: String,
        action: ProposalAction,
    },
    VoteOnProposal {
        proposal_id: ProposalId,
        choice: VoteChoice,
    },
    ExecuteProposal {
        proposal_id: ProposalId,
    },
}

impl LedgerCall {
    /// Operation name, as used on the wire and in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreatePosition(_) => "create_position",
            Self::DeactivatePosition { .. } => "deactivate_position",
            Self::CreateElection(_) => "create_election",
            Self::AddCandidate(_) => "add_candidate",
            Self::AuthorizeVoter { .. } => "authorize_voter",
            Self::AuthorizeVoters { .. } => "authorize_voters",
            Self::Vote { .. } => "vote",
            Self::EndElection { .. } => "end_election",
            Self::AuthorizeAdmin { .. } => "authorize_admin",
            Self::RevokeAdmin { .. } => "revoke_admin",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::SubmitTransaction { .. } => "submit_transaction",
            Self::ConfirmTransaction { .. } => "confirm_transaction",
            Self::RevokeConfirmation { .. } => "revoke_confirmation",
            Self::ExecuteTransaction { .. } => "execute_transaction",
            Self::CreateProposal { .. } => "create_proposal",
            Self::VoteOnProposal { .. } => "vote_on_proposal",
            Self::ExecuteProposal { .. } => "execute_proposal",
        }
    }
}

/// The outcome of a committed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// ID of the entity the call created, if it created one. For a batch
    /// voter authorization, the number of voters authorized.
    pub created: Option<u32>,
    /// Events emitted by this call, in order.
    pub events: Vec<EventRecord>,
}

impl LedgerState {
    /// Run one call against the ledger. On success, returns what the call
    /// created and the events it emitted; on failure, nothing was committed
    /// beyond the failed-vote bookkeeping.
    pub fn dispatch(&mut self, ctx: &CallContext, call: LedgerCall) -> Result<Receipt> {
        let logger = CallLogger::enter(call.operation(), &ctx.caller);
        let first = self.events.len();

        let result = self.run_call(ctx, call).map(|created| Receipt {
            created,
            events: self.events[first..].to_vec(),
        });

        logger.leave(&result);
        result
    }

    fn run_call(&mut self, ctx: &CallContext, call: LedgerCall) -> Result<Option<u32>> {
        let created = match call {
            LedgerCall::CreatePosition(spec) => Some(self.create_position(ctx, spec)?),
            LedgerCall::DeactivatePosition { position_id } => {
                self.deactivate_position(ctx, position_id)?;
                None
            }
            LedgerCall::CreateElection(spec) => Some(self.create_election(ctx, spec)?),
            LedgerCall::AddCandidate(spec) => Some(self.add_candidate(ctx, spec)?),
            LedgerCall::AuthorizeVoter {
                account,
                reg_number,
            } => {
                self.authorize_voter(ctx, account, reg_number)?;
                None
            }
            LedgerCall::AuthorizeVoters { voters } => {
                let count = self.authorize_voters(ctx, voters)?;
                Some(u32::try_from(count).unwrap_or(u32::MAX))
            }
            LedgerCall::Vote {
                election_id,
                position_id,
                candidate_id,
            } => {
                self.vote(ctx, election_id, position_id, candidate_id)?;
                None
            }
            LedgerCall::EndElection { election_id } => {
                self.end_election(ctx, election_id)?;
                None
            }
            LedgerCall::AuthorizeAdmin { account } => {
                self.authorize_admin(ctx, account)?;
                None
            }
            LedgerCall::RevokeAdmin { account } => {
                self.revoke_admin(ctx, account)?;
                None
            }
            LedgerCall::Pause => {
                self.pause(ctx)?;
                None
            }
            LedgerCall::Unpause => {
                self.unpause(ctx)?;
                None
            }
            LedgerCall::TransferOwnership { new_owner } => {
                self.transfer_ownership(ctx, new_owner)?;
                None
            }
            LedgerCall::SubmitTransaction { action } => {
                Some(self.submit_transaction(ctx, action)?)
            }
            LedgerCall::ConfirmTransaction { transaction_id } => {
                self.confirm_transaction(ctx, transaction_id)?;
                None
            }
            LedgerCall::RevokeConfirmation { transaction_id } => {
                self.revoke_confirmation(ctx, transaction_id)?;
                None
            }
            LedgerCall::ExecuteTransaction { transaction_id } => {
                self.execute_transaction(ctx, transaction_id)?;
                None
            }
            LedgerCall::CreateProposal {
                title,
                description,
                action,
            } => Some(self.create_proposal(ctx, title, description, action)?),
            LedgerCall::VoteOnProposal { proposal_id, choice } => {
                self.vote_on_proposal(ctx, proposal_id, choice)?;
                None
            }
            LedgerCall::ExecuteProposal { proposal_id } => {
                self.execute_proposal(ctx, proposal_id)?;
                None
            }
        };
        Ok(created)
    }
}
