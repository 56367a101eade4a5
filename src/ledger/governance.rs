use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    Address, AdminAction, Counter, EmergencyAction, LedgerEvent, Parameter, PendingTransaction,
    Proposal, ProposalAction, ProposalId, TransactionId, VoteChoice,
};

use super::{CallContext, LedgerState};

/// The multi-party approval engine: a set of quorum admins, the number of
/// them that must agree, and the transactions and proposals they act on.
///
/// Invariant: `0 < required <= admins.len() <= max_admins` after every call.
#[derive(Debug, Clone)]
pub struct Quorum {
    admins: Vec<Address>,
    required: u32,
    transactions: BTreeMap<TransactionId, PendingTransaction>,
    proposals: BTreeMap<ProposalId, Proposal>,
    transaction_ids: Counter,
    proposal_ids: Counter,
}

impl Quorum {
    pub fn new(admins: Vec<Address>, required: u32, max_admins: usize) -> Result<Self> {
        if admins.is_empty() {
            return Err(Error::quorum("At least one admin required"));
        }
        if admins.len() > max_admins {
            return Err(Error::quorum("Too many admins"));
        }
        let mut seen = BTreeSet::new();
        for admin in &admins {
            if admin.is_zero() {
                return Err(Error::validation("Invalid admin address"));
            }
            if !seen.insert(admin) {
                return Err(Error::validation("Duplicate admin"));
            }
        }
        if required == 0 || required as usize > admins.len() {
            return Err(Error::quorum("Invalid required confirmations"));
        }

        Ok(Self {
            admins,
            required,
            transactions: BTreeMap::new(),
            proposals: BTreeMap::new(),
            transaction_ids: Counter::default(),
            proposal_ids: Counter::default(),
        })
    }

    /// Quorum admins, in the order they joined.
    pub fn admins(&self) -> &[Address] {
        &self.admins
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    pub fn is_admin(&self, account: &Address) -> bool {
        self.admins.contains(account)
    }

    fn has_threshold(&self, transaction: &PendingTransaction) -> bool {
        transaction.confirmation_count() >= self.required as usize
    }
}

impl LedgerState {
    pub fn quorum_admins(&self) -> &[Address] {
        self.quorum.admins()
    }

    pub fn required_confirmations(&self) -> u32 {
        self.quorum.required()
    }

    pub fn is_quorum_admin(&self, account: &Address) -> bool {
        self.quorum.is_admin(account)
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&PendingTransaction> {
        self.quorum.transactions.get(&id)
    }

    /// Transactions not yet executed, in id order.
    pub fn pending_transactions(&self) -> impl Iterator<Item = &PendingTransaction> {
        self.quorum.transactions.values().filter(|tx| !tx.executed)
    }

    /// Has the transaction gathered enough confirmations to execute?
    pub fn is_confirmed(&self, id: TransactionId) -> Result<bool> {
        Ok(self.quorum.has_threshold(self.existing_transaction(id)?))
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.quorum.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.quorum.proposals.values()
    }

    fn require_quorum_admin(&self, ctx: &CallContext) -> Result<()> {
        if self.quorum.is_admin(&ctx.caller) {
            Ok(())
        } else {
            Err(Error::unauthorized("Caller is not a quorum admin"))
        }
    }

    fn existing_transaction(&self, id: TransactionId) -> Result<&PendingTransaction> {
        self.quorum
            .transactions
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("Transaction {id}")))
    }

    fn unexecuted_transaction(&self, id: TransactionId) -> Result<&PendingTransaction> {
        let transaction = self.existing_transaction(id)?;
        if transaction.executed {
            return Err(Error::state("Transaction already executed"));
        }
        Ok(transaction)
    }

    fn existing_proposal(&self, id: ProposalId) -> Result<&Proposal> {
        self.quorum
            .proposals
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("Proposal {id}")))
    }

    /// Propose a privileged action. The submitter's confirmation counts
    /// immediately, so with a threshold of one the action runs at once.
    pub fn submit_transaction(
        &mut self,
        ctx: &CallContext,
        action: AdminAction,
    ) -> Result<TransactionId> {
        self.require_quorum_admin(ctx)?;
        self.check_admin_action(&action)?;

        let id = self.quorum.transaction_ids.next();
        let transaction = PendingTransaction {
            id,
            action,
            submitter: ctx.caller,
            confirmations: BTreeSet::from([ctx.caller]),
            executed: false,
            created_at: ctx.now,
        };
        info!("Transaction {id} submitted by {}: {:?}", ctx.caller, transaction.action);
        let ready = self.quorum.has_threshold(&transaction);
        self.quorum.transactions.insert(id, transaction);
        self.emit(
            ctx.now,
            LedgerEvent::TransactionSubmitted {
                transaction_id: id,
                submitter: ctx.caller,
            },
        );
        self.emit(
            ctx.now,
            LedgerEvent::TransactionConfirmed {
                transaction_id: id,
                admin: ctx.caller,
            },
        );

        if ready {
            self.run_transaction(ctx.now, id);
        }
        Ok(id)
    }

    /// Add the caller's confirmation. Executes the transaction the moment
    /// the threshold is reached; if the action can no longer run, the
    /// confirmation is rejected too.
    pub fn confirm_transaction(&mut self, ctx: &CallContext, id: TransactionId) -> Result<()> {
        self.require_quorum_admin(ctx)?;
        let transaction = self.unexecuted_transaction(id)?;
        if transaction.is_confirmed_by(&ctx.caller) {
            return Err(Error::quorum("Transaction already confirmed by this admin"));
        }
        let ready = transaction.confirmation_count() + 1 >= self.quorum.required as usize;
        if ready {
            self.check_admin_action(&transaction.action)?;
        }

        if let Some(transaction) = self.quorum.transactions.get_mut(&id) {
            transaction.confirmations.insert(ctx.caller);
        }
        debug!("Transaction {id} confirmed by {}", ctx.caller);
        self.emit(
            ctx.now,
            LedgerEvent::TransactionConfirmed {
                transaction_id: id,
                admin: ctx.caller,
            },
        );

        if ready {
            self.run_transaction(ctx.now, id);
        }
        Ok(())
    }

    pub fn revoke_confirmation(&mut self, ctx: &CallContext, id: TransactionId) -> Result<()> {
        self.require_quorum_admin(ctx)?;
        if !self.unexecuted_transaction(id)?.is_confirmed_by(&ctx.caller) {
            return Err(Error::quorum("Transaction not confirmed by this admin"));
        }

        if let Some(transaction) = self.quorum.transactions.get_mut(&id) {
            transaction.confirmations.remove(&ctx.caller);
        }
        debug!("Transaction {id} confirmation revoked by {}", ctx.caller);
        self.emit(
            ctx.now,
            LedgerEvent::ConfirmationRevoked {
                transaction_id: id,
                admin: ctx.caller,
            },
        );
        Ok(())
    }

    /// Run a transaction that already has enough confirmations, e.g. after
    /// the threshold was lowered.
    pub fn execute_transaction(&mut self, ctx: &CallContext, id: TransactionId) -> Result<()> {
        self.require_quorum_admin(ctx)?;
        let transaction = self.unexecuted_transaction(id)?;
        if !self.quorum.has_threshold(transaction) {
            return Err(Error::quorum("Not enough confirmations"));
        }
        self.check_admin_action(&transaction.action)?;

        self.run_transaction(ctx.now, id);
        Ok(())
    }

    /// Apply a checked transaction and mark it executed.
    fn run_transaction(&mut self, now: DateTime<Utc>, id: TransactionId) {
        let action = match self.quorum.transactions.get_mut(&id) {
            Some(transaction) if !transaction.executed => {
                transaction.executed = true;
                transaction.action.clone()
            }
            _ => return,
        };
        info!("Executing transaction {id}");
        self.apply_admin_action(now, action);
        self.emit(now, LedgerEvent::TransactionExecuted { transaction_id: id });
    }

    fn check_admin_action(&self, action: &AdminAction) -> Result<()> {
        match action {
            AdminAction::AuthorizeAdmin { account } => self.check_authorize_admin(account),
            AdminAction::RevokeAdmin { account } => self.check_revoke_admin(account),
            AdminAction::AuthorizeVoter {
                account,
                reg_number,
            } => self.check_authorize_voter(account, reg_number),
            AdminAction::EndElection { election_id } => self.check_end_election(*election_id),
            AdminAction::Pause => self.check_pause(),
            AdminAction::Unpause => self.check_unpause(),
            AdminAction::TransferOwnership { new_owner } => {
                self.check_transfer_ownership(new_owner)
            }
        }
    }

    /// Transactions act with the owner's authority.
    fn apply_admin_action(&mut self, now: DateTime<Utc>, action: AdminAction) {
        let owner = self.owner;
        match action {
            AdminAction::AuthorizeAdmin { account } => self.apply_authorize_admin(now, account),
            AdminAction::RevokeAdmin { account } => self.apply_revoke_admin(now, account),
            AdminAction::AuthorizeVoter {
                account,
                reg_number,
            } => self.apply_authorize_voter(now, account, reg_number),
            AdminAction::EndElection { election_id } => {
                self.apply_end_election(now, owner, election_id)
            }
            AdminAction::Pause => self.apply_pause(now, owner),
            AdminAction::Unpause => self.apply_unpause(now, owner),
            AdminAction::TransferOwnership { new_owner } => {
                self.apply_transfer_ownership(now, new_owner)
            }
        }
    }

    /// Open a proposal for the quorum admins to vote on until
    /// `now + proposal_voting_period`.
    pub fn create_proposal(
        &mut self,
        ctx: &CallContext,
        title: String,
        description: String,
        action: ProposalAction,
    ) -> Result<ProposalId> {
        self.require_quorum_admin(ctx)?;
        if title.trim().is_empty() {
            return Err(Error::validation("Title cannot be empty"));
        }
        self.check_proposal_action(&action)?;

        let id = self.quorum.proposal_ids.next();
        let voting_deadline = ctx.now + self.config.proposal_voting_period();
        info!("Proposal {id} \"{title}\" created by {}", ctx.caller);
        self.quorum.proposals.insert(
            id,
            Proposal {
                id,
                title,
                description,
                proposer: ctx.caller,
                created_at: ctx.now,
                voting_deadline,
                for_votes: 0,
                against_votes: 0,
                abstain_votes: 0,
                votes: BTreeMap::new(),
                action,
                executed: false,
            },
        );
        self.emit(
            ctx.now,
            LedgerEvent::ProposalCreated {
                proposal_id: id,
                proposer: ctx.caller,
                voting_deadline,
            },
        );
        Ok(id)
    }

    pub fn vote_on_proposal(
        &mut self,
        ctx: &CallContext,
        id: ProposalId,
        choice: VoteChoice,
    ) -> Result<()> {
        self.require_quorum_admin(ctx)?;
        let proposal = self.existing_proposal(id)?;
        if proposal.executed {
            return Err(Error::state("Proposal already executed"));
        }
        if !proposal.is_open(ctx.now) {
            return Err(Error::state("Voting period has ended"));
        }
        if proposal.has_voted(&ctx.caller) {
            return Err(Error::quorum("Already voted on this proposal"));
        }

        if let Some(proposal) = self.quorum.proposals.get_mut(&id) {
            proposal.tally(ctx.caller, choice);
        }
        debug!("Proposal {id}: {} voted {choice:?}", ctx.caller);
        self.emit(
            ctx.now,
            LedgerEvent::ProposalVoted {
                proposal_id: id,
                voter: ctx.caller,
                choice,
            },
        );
        Ok(())
    }

    /// Carry out a proposal once voting has closed, if it passed.
    pub fn execute_proposal(&mut self, ctx: &CallContext, id: ProposalId) -> Result<()> {
        self.require_quorum_admin(ctx)?;
        let proposal = self.existing_proposal(id)?;
        if proposal.executed {
            return Err(Error::state("Proposal already executed"));
        }
        if proposal.is_open(ctx.now) {
            return Err(Error::state("Voting period not ended"));
        }
        if !proposal.passes(self.quorum.required) {
            return Err(Error::quorum("Proposal did not pass"));
        }
        self.check_proposal_action(&proposal.action)?;

        let action = proposal.action.clone();
        if let Some(proposal) = self.quorum.proposals.get_mut(&id) {
            proposal.executed = true;
        }
        info!("Executing proposal {id}");
        self.apply_proposal_action(ctx.now, action);
        self.emit(ctx.now, LedgerEvent::ProposalExecuted { proposal_id: id });
        Ok(())
    }

    fn check_proposal_action(&self, action: &ProposalAction) -> Result<()> {
        match action {
            ProposalAction::ParameterChange { parameter, value } => {
                let valid = match parameter {
                    Parameter::RequiredConfirmations => {
                        *value > 0 && *value as usize <= self.quorum.admins.len()
                    }
                    Parameter::ProposalVotingPeriod
                    | Parameter::LockoutThreshold
                    | Parameter::LockoutDuration => *value > 0,
                };
                if !valid {
                    return Err(Error::validation(format!(
                        "Invalid value {value} for {parameter:?}"
                    )));
                }
                Ok(())
            }
            ProposalAction::AddAdmin { account } => {
                if account.is_zero() {
                    return Err(Error::validation("Invalid admin address"));
                }
                if self.quorum.is_admin(account) {
                    return Err(Error::state("Already a quorum admin"));
                }
                if self.quorum.admins.len() >= self.config.max_admins() {
                    return Err(Error::quorum("Maximum admins reached"));
                }
                Ok(())
            }
            ProposalAction::RemoveAdmin { account } => {
                if !self.quorum.is_admin(account) {
                    return Err(Error::state("Not a quorum admin"));
                }
                let remaining = self.quorum.admins.len() - 1;
                if remaining == 0 {
                    return Err(Error::quorum("Cannot remove the last admin"));
                }
                if remaining < self.quorum.required as usize {
                    return Err(Error::quorum(
                        "Removal would drop admins below required confirmations",
                    ));
                }
                Ok(())
            }
            ProposalAction::Emergency { action } => match action {
                EmergencyAction::Pause => self.check_pause(),
                EmergencyAction::Unpause => self.check_unpause(),
                EmergencyAction::EndElection { election_id } => {
                    self.check_end_election(*election_id)
                }
            },
        }
    }

    fn apply_proposal_action(&mut self, now: DateTime<Utc>, action: ProposalAction) {
        let owner = self.owner;
        match action {
            ProposalAction::ParameterChange { parameter, value } => {
                match parameter {
                    Parameter::RequiredConfirmations => self.quorum.required = value,
                    Parameter::ProposalVotingPeriod => {
                        self.config.set_proposal_voting_period(value)
                    }
                    Parameter::LockoutThreshold => self.config.set_lockout_threshold(value),
                    Parameter::LockoutDuration => self.config.set_lockout_duration(value),
                }
                info!("Parameter {parameter:?} set to {value}");
                self.emit(now, LedgerEvent::ParameterChanged { parameter, value });
            }
            ProposalAction::AddAdmin { account } => {
                self.quorum.admins.push(account);
                info!("Quorum admin {account} added");
                self.emit(now, LedgerEvent::QuorumAdminAdded { admin: account });
            }
            ProposalAction::RemoveAdmin { account } => {
                self.quorum.admins.retain(|admin| *admin != account);
                // Confirmations only count while the admin is in the quorum.
                for transaction in self.quorum.transactions.values_mut() {
                    if !transaction.executed {
                        transaction.confirmations.remove(&account);
                    }
                }
                info!("Quorum admin {account} removed");
                self.emit(now, LedgerEvent::QuorumAdminRemoved { admin: account });
            }
            ProposalAction::Emergency { action } => match action {
                EmergencyAction::Pause => self.apply_pause(now, owner),
                EmergencyAction::Unpause => self.apply_unpause(now, owner),
                EmergencyAction::EndElection { election_id } => {
                    self.apply_end_election(now, owner, election_id)
                }
            },
        }
    }
}
