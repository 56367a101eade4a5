use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    Address, CandidateId, ElectionId, LedgerEvent, Lockout, PositionId, Voter, VoterRegistration,
};

use super::{CallContext, LedgerState};

impl LedgerState {
    /// Authorize an account to vote. Admin only. Authorization is never
    /// granted twice.
    pub fn authorize_voter(
        &mut self,
        ctx: &CallContext,
        account: Address,
        reg_number: String,
    ) -> Result<()> {
        self.require_admin(ctx)?;
        self.check_authorize_voter(&account, &reg_number)?;
        self.apply_authorize_voter(ctx.now, account, reg_number);
        Ok(())
    }

    /// Authorize a batch of voters. Either every entry is valid and all are
    /// authorized, or none are. Admin only.
    pub fn authorize_voters(
        &mut self,
        ctx: &CallContext,
        batch: Vec<VoterRegistration>,
    ) -> Result<usize> {
        self.require_admin(ctx)?;
        if batch.is_empty() {
            return Err(Error::validation("Batch cannot be empty"));
        }

        // Validate every entry, including duplicates within the batch.
        let mut seen = BTreeSet::new();
        for entry in &batch {
            self.check_authorize_voter(&entry.account, &entry.reg_number)?;
            if !seen.insert(entry.account) {
                return Err(Error::validation(format!(
                    "Voter {} listed more than once",
                    entry.account
                )));
            }
        }

        let count = batch.len();
        for entry in batch {
            self.apply_authorize_voter(ctx.now, entry.account, entry.reg_number);
        }
        Ok(count)
    }

    pub(super) fn check_authorize_voter(&self, account: &Address, reg_number: &str) -> Result<()> {
        if account.is_zero() {
            return Err(Error::validation("Invalid voter address"));
        }
        if reg_number.trim().is_empty() {
            return Err(Error::validation("Registration number cannot be empty"));
        }
        if self.is_authorized_voter(account) {
            return Err(Error::state("Voter already authorized"));
        }
        Ok(())
    }

    pub(super) fn apply_authorize_voter(
        &mut self,
        now: DateTime<Utc>,
        account: Address,
        reg_number: String,
    ) {
        info!("Voter {account} authorized");
        let event = LedgerEvent::VoterAuthorized {
            voter: account,
            reg_number: reg_number.clone(),
        };
        self.voters.insert(account, Voter::new(account, reg_number, now));
        self.emit(now, event);
    }

    /// Cast the caller's vote for one position of an election.
    ///
    /// Once the caller is known to be an authorized voter, every rejection
    /// other than the global pause or an existing lockout counts as a failed
    /// attempt; enough of them in a row lock the account out for a while. A
    /// successful vote clears the count.
    pub fn vote(
        &mut self,
        ctx: &CallContext,
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    ) -> Result<()> {
        let voter = self.authorized_voter(&ctx.caller)?;
        if self.paused {
            return Err(Error::state("Voting is paused"));
        }
        if self.is_locked_out(&ctx.caller, ctx.now) {
            return Err(Error::state("Account temporarily locked"));
        }

        match self.check_vote(ctx, voter, election_id, position_id, candidate_id) {
            Ok(()) => {
                self.apply_vote(ctx, election_id, position_id, candidate_id);
                Ok(())
            }
            Err(err) => {
                self.record_failed_attempt(ctx);
                Err(err)
            }
        }
    }

    fn authorized_voter(&self, account: &Address) -> Result<&Voter> {
        match self.voters.get(account) {
            Some(voter) if voter.is_authorized => Ok(voter),
            _ => Err(Error::unauthorized("Not an authorized voter")),
        }
    }

    fn check_vote(
        &self,
        ctx: &CallContext,
        voter: &Voter,
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    ) -> Result<()> {
        // Check the election is accepting votes.
        let election = self.existing_election(election_id)?;
        if !election.is_active {
            return Err(Error::state("Election is not active"));
        }
        if ctx.now < election.start_time {
            return Err(Error::state("Election has not started"));
        }
        if ctx.now > election.end_time {
            return Err(Error::state("Election has ended"));
        }

        // Check the position.
        let position = self.existing_position(position_id)?;
        if !position.is_active {
            return Err(Error::state("Position is not active"));
        }
        if !election.has_position(position_id) {
            return Err(Error::validation("Position not part of this election"));
        }

        // Check the candidate.
        let candidate = self
            .candidates
            .get(&candidate_id)
            .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
        if !candidate.is_approved {
            return Err(Error::state("Candidate is not approved"));
        }
        if !candidate.runs_in(election_id, position_id) {
            return Err(Error::validation("Candidate not registered for this position"));
        }

        if voter.has_voted(election_id, position_id) {
            return Err(Error::state("Already voted for this position"));
        }
        Ok(())
    }

    fn apply_vote(
        &mut self,
        ctx: &CallContext,
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
    ) {
        // Presence of all of these was checked in `check_vote`.
        if let Some(voter) = self.voters.get_mut(&ctx.caller) {
            voter.record(election_id, position_id, candidate_id);
        }
        if let Some(candidate) = self.candidates.get_mut(&candidate_id) {
            candidate.vote_count += 1;
        }
        if let Some(election) = self.elections.get_mut(&election_id) {
            election.total_votes += 1;
            *election.position_votes.entry(position_id).or_default() += 1;
        }
        self.lockouts.remove(&ctx.caller);

        info!(
            "Vote cast by {} in election {election_id} position {position_id}",
            ctx.caller
        );
        self.emit(
            ctx.now,
            LedgerEvent::VoteCast {
                voter: ctx.caller,
                election_id,
                position_id,
                candidate_id,
            },
        );
    }

    fn record_failed_attempt(&mut self, ctx: &CallContext) {
        let threshold = self.config.lockout_threshold();
        let duration = self.config.lockout_duration();
        let lockout = self.lockouts.entry(ctx.caller).or_default();
        if lockout.locked_until.map_or(false, |until| ctx.now >= until) {
            // Lock served; start afresh.
            *lockout = Lockout::default();
        }
        lockout.failed_attempts += 1;
        if lockout.failed_attempts >= threshold {
            let until = ctx.now + duration;
            lockout.failed_attempts = 0;
            lockout.locked_until = Some(until);
            warn!(
                "Account {} locked out until {until} after {threshold} failed vote attempts",
                ctx.caller
            );
        }
    }

    /// End an active election early. Terminal. Admin only.
    pub fn end_election(&mut self, ctx: &CallContext, election_id: ElectionId) -> Result<()> {
        self.require_admin(ctx)?;
        self.check_end_election(election_id)?;
        self.apply_end_election(ctx.now, ctx.caller, election_id);
        Ok(())
    }

    pub(super) fn check_end_election(&self, election_id: ElectionId) -> Result<()> {
        if !self.existing_election(election_id)?.is_active {
            return Err(Error::state("Election is not active"));
        }
        Ok(())
    }

    pub(super) fn apply_end_election(
        &mut self,
        now: DateTime<Utc>,
        ended_by: Address,
        election_id: ElectionId,
    ) {
        if let Some(election) = self.elections.get_mut(&election_id) {
            election.is_active = false;
        }
        info!("Election {election_id} ended by {ended_by}");
        self.emit(now, LedgerEvent::ElectionEnded { election_id, ended_by });
    }

    pub fn voter(&self, account: &Address) -> Option<&Voter> {
        self.voters.get(account)
    }

    pub fn is_authorized_voter(&self, account: &Address) -> bool {
        self.voters
            .get(account)
            .map_or(false, |voter| voter.is_authorized)
    }

    pub fn has_voted(
        &self,
        account: &Address,
        election_id: ElectionId,
        position_id: PositionId,
    ) -> bool {
        self.voters
            .get(account)
            .map_or(false, |voter| voter.has_voted(election_id, position_id))
    }

    pub fn choice_of(
        &self,
        account: &Address,
        election_id: ElectionId,
        position_id: PositionId,
    ) -> Option<CandidateId> {
        self.voters
            .get(account)
            .and_then(|voter| voter.choice(election_id, position_id))
    }

    pub fn lockout_of(&self, account: &Address) -> Option<&Lockout> {
        self.lockouts.get(account)
    }

    pub fn is_locked_out(&self, account: &Address, now: DateTime<Utc>) -> bool {
        self.lockouts
            .get(account)
            .map_or(false, |lockout| lockout.is_locked(now))
    }

    /// Raw vote counters for one position of an election, in candidate id
    /// order. No ranking or tie-breaking is applied.
    pub fn results(
        &self,
        election_id: ElectionId,
        position_id: PositionId,
    ) -> Result<Vec<(CandidateId, u64)>> {
        Ok(self
            .candidates_for(election_id, position_id)?
            .into_iter()
            .map(|candidate| (candidate.id, candidate.vote_count))
            .collect())
    }
}
