use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    Candidate, CandidateId, CandidateSpec, Election, ElectionId, ElectionSpec, ElectionStatus,
    ElectionType, LedgerEvent, Position, PositionId, PositionSpec,
};

use super::{CallContext, LedgerState};

impl LedgerState {
    /// Create a position that elections can later include. Admin only.
    pub fn create_position(&mut self, ctx: &CallContext, spec: PositionSpec) -> Result<PositionId> {
        self.require_admin(ctx)?;

        // Validate the spec.
        if spec.title.trim().is_empty() {
            return Err(Error::validation("Title cannot be empty"));
        }
        if spec.max_candidates == 0
            || spec.max_candidates > self.config.max_candidates_per_position()
        {
            return Err(Error::validation("Invalid max candidates"));
        }
        if spec.max_votes_per_voter == 0 {
            return Err(Error::validation("Invalid max votes per voter"));
        }

        // Commit.
        let id = self.position_ids.next();
        let position = Position {
            id,
            title: spec.title,
            description: spec.description,
            max_candidates: spec.max_candidates,
            max_votes_per_voter: spec.max_votes_per_voter,
            is_active: true,
            candidate_count: 0,
            created_at: ctx.now,
        };
        info!("Position {id} \"{}\" created by {}", position.title, ctx.caller);
        let title = position.title.clone();
        self.positions.insert(id, position);
        self.emit(ctx.now, LedgerEvent::PositionCreated { position_id: id, title });
        Ok(id)
    }

    /// Retire a position so no new election can include it and no further
    /// votes are accepted for it. Admin only.
    pub fn deactivate_position(&mut self, ctx: &CallContext, position_id: PositionId) -> Result<()> {
        self.require_admin(ctx)?;
        let position = self
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
        if !position.is_active {
            return Err(Error::state("Position is not active"));
        }

        position.is_active = false;
        info!("Position {position_id} deactivated by {}", ctx.caller);
        self.emit(ctx.now, LedgerEvent::PositionDeactivated { position_id });
        Ok(())
    }

    /// Create an election over a snapshot of existing positions. Admin only.
    pub fn create_election(&mut self, ctx: &CallContext, spec: ElectionSpec) -> Result<ElectionId> {
        self.require_admin(ctx)?;

        // Validate the metadata.
        if spec.title.trim().is_empty() {
            return Err(Error::validation("Title cannot be empty"));
        }
        let election_type = ElectionType::try_from(spec.election_type)?;
        self.check_election_times(ctx.now, spec.start_time, spec.end_time)?;

        // Validate the positions.
        let count = spec.position_ids.len();
        if count == 0 || count > self.config.max_positions_per_election() {
            return Err(Error::validation("Invalid number of positions"));
        }
        let mut seen = BTreeSet::new();
        for position_id in &spec.position_ids {
            if !seen.insert(*position_id) {
                return Err(Error::validation(format!(
                    "Position {position_id} listed more than once"
                )));
            }
            let position = self
                .positions
                .get(position_id)
                .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
            if !position.is_active {
                return Err(Error::state(format!("Position {position_id} is not active")));
            }
        }

        // Commit.
        let id = self.election_ids.next();
        let election = Election {
            id,
            title: spec.title,
            description: spec.description,
            start_time: spec.start_time,
            end_time: spec.end_time,
            election_type,
            is_active: true,
            total_votes: 0,
            candidates: spec.position_ids.iter().map(|p| (*p, Vec::new())).collect(),
            position_votes: spec.position_ids.iter().map(|p| (*p, 0)).collect(),
            position_ids: spec.position_ids,
            creator: ctx.caller,
            created_at: ctx.now,
        };
        info!(
            "Election {id} \"{}\" created by {}, running {} to {}",
            election.title, ctx.caller, election.start_time, election.end_time
        );
        let event = LedgerEvent::ElectionCreated {
            election_id: id,
            title: election.title.clone(),
            start_time: election.start_time,
            end_time: election.end_time,
            creator: ctx.caller,
        };
        self.elections.insert(id, election);
        self.emit(ctx.now, event);
        Ok(id)
    }

    fn check_election_times(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        if end <= start {
            return Err(Error::validation("End time must be after start time"));
        }
        if start <= now {
            return Err(Error::validation("Start time must be in the future"));
        }
        let duration = end - start;
        if duration < self.config.min_election_duration()
            || duration > self.config.max_election_duration()
        {
            return Err(Error::validation("Election duration out of range"));
        }
        Ok(())
    }

    /// Register a candidate for one position of one election. Only allowed
    /// before the election starts. Candidates are approved on registration.
    /// Admin only.
    pub fn add_candidate(&mut self, ctx: &CallContext, spec: CandidateSpec) -> Result<CandidateId> {
        self.require_admin(ctx)?;

        if spec.name.trim().is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }
        if spec.reg_number.trim().is_empty() {
            return Err(Error::validation("Registration number cannot be empty"));
        }

        // Check the election accepts entries.
        let election = self.existing_election(spec.election_id)?;
        if !election.is_active {
            return Err(Error::state("Election is not active"));
        }
        if ctx.now >= election.start_time {
            return Err(Error::state("Election has already started"));
        }
        if !election.has_position(spec.position_id) {
            return Err(Error::validation("Position not part of this election"));
        }

        // Check there is room on the roster.
        let position = self.existing_position(spec.position_id)?;
        if position.candidate_count >= position.max_candidates {
            return Err(Error::state("Maximum candidates reached for this position"));
        }

        // Commit.
        let id = self.candidate_ids.next();
        let candidate = Candidate {
            id,
            name: spec.name,
            reg_number: spec.reg_number,
            election_id: spec.election_id,
            position_id: spec.position_id,
            bio: spec.bio,
            vote_count: 0,
            is_approved: true,
            approved_at: Some(ctx.now),
        };
        let event = LedgerEvent::CandidateAdded {
            candidate_id: id,
            election_id: spec.election_id,
            position_id: spec.position_id,
            name: candidate.name.clone(),
        };
        info!(
            "Candidate {id} \"{}\" added to election {} position {}",
            candidate.name, spec.election_id, spec.position_id
        );
        self.candidates.insert(id, candidate);
        if let Some(election) = self.elections.get_mut(&spec.election_id) {
            election
                .candidates
                .entry(spec.position_id)
                .or_default()
                .push(id);
        }
        if let Some(position) = self.positions.get_mut(&spec.position_id) {
            position.candidate_count += 1;
        }
        self.emit(ctx.now, event);
        Ok(id)
    }

    pub fn election(&self, id: ElectionId) -> Option<&Election> {
        self.elections.get(&id)
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(&id)
    }

    /// All elections, in id order.
    pub fn elections(&self) -> impl Iterator<Item = &Election> {
        self.elections.values()
    }

    /// All positions, in id order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// The positions an election was created with, in snapshot order.
    pub fn election_positions(&self, election_id: ElectionId) -> Result<Vec<&Position>> {
        let election = self.existing_election(election_id)?;
        Ok(election
            .position_ids
            .iter()
            .filter_map(|id| self.positions.get(id))
            .collect())
    }

    /// Candidates registered for a position of an election, in id order.
    pub fn candidates_for(
        &self,
        election_id: ElectionId,
        position_id: PositionId,
    ) -> Result<Vec<&Candidate>> {
        let election = self.existing_election(election_id)?;
        if !election.has_position(position_id) {
            return Err(Error::validation("Position not part of this election"));
        }
        Ok(election
            .candidates_for(position_id)
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .collect())
    }

    pub fn election_status(&self, election_id: ElectionId, now: DateTime<Utc>) -> Result<ElectionStatus> {
        Ok(self.existing_election(election_id)?.status(now))
    }

    pub(super) fn existing_election(&self, id: ElectionId) -> Result<&Election> {
        self.elections
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("Election {id}")))
    }

    pub(super) fn existing_position(&self, id: PositionId) -> Result<&Position> {
        self.positions
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("Position {id}")))
    }
}
