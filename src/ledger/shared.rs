use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

use super::{CallContext, LedgerCall, LedgerState, Receipt};

/// A ledger shared between threads. Writes are serialised through a single
/// writer lock, so each call still runs to completion before the next one
/// starts; reads may proceed concurrently.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl SharedLedger {
    pub fn new(state: LedgerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn dispatch(&self, ctx: &CallContext, call: LedgerCall) -> Result<Receipt> {
        self.state.write().dispatch(ctx, call)
    }

    /// Run a read-only query against the current state.
    pub fn read<T>(&self, query: impl FnOnce(&LedgerState) -> T) -> T {
        query(&self.state.read())
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::super::examples::ctx;
    use super::*;
    use crate::model::{Address, VoterRegistration};

    #[test]
    fn concurrent_voters() {
        let mut state = LedgerState::example();
        state.seed_example_election();
        let start = state.example_start();
        let owner = ctx(Address::owner_example(), start - chrono::Duration::hours(1));

        let ledger = SharedLedger::new(state);
        ledger
            .dispatch(
                &owner,
                LedgerCall::AuthorizeVoters {
                    voters: (2..=33)
                        .map(|n| VoterRegistration {
                            account: Address::voter_example(n),
                            reg_number: format!("U{n:04}"),
                        })
                        .collect(),
                },
            )
            .unwrap();

        // Every voter votes twice, once for each candidate, from its own thread.
        let handles: Vec<_> = (1..=33)
            .map(|n| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let voter = ctx(Address::voter_example(n), start);
                    let first = ledger.dispatch(
                        &voter,
                        LedgerCall::Vote {
                            election_id: 1,
                            position_id: 1,
                            candidate_id: 1 + u32::from(n % 2),
                        },
                    );
                    let second = ledger.dispatch(
                        &voter,
                        LedgerCall::Vote {
                            election_id: 1,
                            position_id: 1,
                            candidate_id: 2 - u32::from(n % 2),
                        },
                    );
                    (first.is_ok(), second.is_ok())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), (true, false));
        }

        let (total, results) = ledger.read(|state| {
            (
                state.election(1).unwrap().total_votes,
                state.results(1, 1).unwrap(),
            )
        });
        assert_eq!(total, 33);
        assert_eq!(results, vec![(1, 16), (2, 17)]);
        assert_eq!(ledger.snapshot().events().len(), 5 + 32 + 33);
    }
}
