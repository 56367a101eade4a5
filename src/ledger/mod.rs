//! The election ledger: every legal state transition, and the bookkeeping
//! that must stay consistent after each one.
//!
//! Writes are methods on [`LedgerState`] taking a [`CallContext`]. Each write
//! checks all of its preconditions before touching any state, so a rejected
//! call leaves nothing behind. The one deliberate exception is the lockout
//! counter, which records rejected votes (see [`LedgerState::vote`]).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::model::{
    Address, Candidate, CandidateId, Counter, Election, ElectionId, EventRecord, LedgerEvent,
    Lockout, Position, PositionId, Voter,
};

mod ballot_box;
mod call;
mod governance;
mod identity;
mod registry;
mod shared;

pub use call::{LedgerCall, Receipt};
pub use governance::Quorum;
pub use identity::Role;
pub use shared::SharedLedger;

/// Who is calling, and when, as resolved by the execution substrate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    /// The substrate's authoritative clock for this call.
    pub now: DateTime<Utc>,
}

impl CallContext {
    pub fn new(caller: Address, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }
}

/// The complete ledger state. All entities are owned here and addressed by
/// stable integer ids.
#[derive(Debug, Clone)]
pub struct LedgerState {
    config: LedgerConfig,

    // Identity.
    owner: Address,
    admins: BTreeSet<Address>,
    paused: bool,

    // Registry.
    positions: BTreeMap<PositionId, Position>,
    elections: BTreeMap<ElectionId, Election>,
    candidates: BTreeMap<CandidateId, Candidate>,
    position_ids: Counter,
    election_ids: Counter,
    candidate_ids: Counter,

    // Ballot box.
    voters: BTreeMap<Address, Voter>,
    lockouts: BTreeMap<Address, Lockout>,

    quorum: Quorum,

    events: Vec<EventRecord>,
}

impl LedgerState {
    /// Create an empty ledger owned by `owner`, governed by a quorum of
    /// `quorum_admins` of which `required` must confirm privileged actions.
    pub fn new(
        owner: Address,
        quorum_admins: Vec<Address>,
        required: u32,
        config: LedgerConfig,
    ) -> Result<Self> {
        if owner.is_zero() {
            return Err(Error::validation("Invalid owner address"));
        }
        let quorum = Quorum::new(quorum_admins, required, config.max_admins())?;
        info!(
            "Ledger created for owner {owner} with a {required}-of-{} quorum",
            quorum.admins().len()
        );

        Ok(Self {
            config,
            owner,
            admins: BTreeSet::new(),
            paused: false,
            positions: BTreeMap::new(),
            elections: BTreeMap::new(),
            candidates: BTreeMap::new(),
            position_ids: Counter::default(),
            election_ids: Counter::default(),
            candidate_ids: Counter::default(),
            voters: BTreeMap::new(),
            lockouts: BTreeMap::new(),
            quorum,
            events: Vec::new(),
        })
    }

    /// The ledger's current configuration, including governance changes.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The full event log, oldest first.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Events with a sequence number greater than `seq`.
    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        // Sequence numbers are dense and start at 1, so they double as indices.
        let start = usize::try_from(seq).unwrap_or(usize::MAX).min(self.events.len());
        &self.events[start..]
    }

    /// Append an event to the log. Only called once a write is committed.
    fn emit(&mut self, now: DateTime<Utc>, event: LedgerEvent) {
        let seq = self.events.len() as u64 + 1;
        debug!("event #{seq}: {event:?}");
        self.events.push(EventRecord { seq, at: now, event });
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use chrono::TimeZone;

    use super::*;
    use crate::model::{CandidateSpec, ElectionSpec, PositionSpec};

    /// Fixed reference time that example ledgers are created at.
    pub fn genesis() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    pub fn ctx(caller: Address, now: DateTime<Utc>) -> CallContext {
        CallContext::new(caller, now)
    }

    impl LedgerState {
        /// Owned by [`Address::owner_example`], with a 2-of-3 quorum of
        /// `Address::admin_example(1..=3)`.
        pub fn example() -> Self {
            Self::new(
                Address::owner_example(),
                (1..=3).map(Address::admin_example).collect(),
                2,
                LedgerConfig::default(),
            )
            .unwrap()
        }

        /// Position 1 ("President"), election 1 starting an hour after
        /// [`genesis`], candidates 1 (Alice) and 2 (Bob), and
        /// `Address::voter_example(1)` authorized.
        pub fn seed_example_election(&mut self) {
            let owner = ctx(Address::owner_example(), genesis());
            let position_id = self
                .create_position(&owner, PositionSpec::example1())
                .unwrap();
            let election_id = self
                .create_election(&owner, ElectionSpec::example(genesis(), vec![position_id]))
                .unwrap();
            for name in ["Alice", "Bob"] {
                self.add_candidate(&owner, CandidateSpec::example(election_id, position_id, name))
                    .unwrap();
            }
            self.authorize_voter(&owner, Address::voter_example(1), "U0001".to_string())
                .unwrap();
        }

        /// The instant example election 1 opens.
        pub fn example_start(&self) -> DateTime<Utc> {
            self.election(1).unwrap().start_time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::examples::genesis;
    use super::*;

    #[test]
    fn rejects_null_owner() {
        let result = LedgerState::new(
            Address::ZERO,
            vec![Address::admin_example(1)],
            1,
            LedgerConfig::default(),
        );
        assert_eq!(result.unwrap_err(), Error::validation("Invalid owner address"));
    }

    #[ledger_test(election)]
    fn event_log_sequence(ledger: &mut LedgerState) {
        // Seeding emitted: position, election, two candidates, one voter.
        let events = ledger.events();
        assert_eq!(events.len(), 5);
        assert!(events.iter().zip(1..).all(|(record, seq)| record.seq == seq));
        assert!(events.iter().all(|record| record.at == genesis()));
        assert!(matches!(
            events[0].event,
            LedgerEvent::PositionCreated { position_id: 1, .. }
        ));

        assert_eq!(ledger.events_since(3).len(), 2);
        assert_eq!(ledger.events_since(3)[0].seq, 4);
        assert!(ledger.events_since(5).is_empty());
        assert!(ledger.events_since(500).is_empty());
    }
}
