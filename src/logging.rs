use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::model::Address;

/// A unique identifier for a particular ledger call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct CallId(pub usize);

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CallId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> CallId {
        static CALL_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        CallId(CALL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Logs a call on the way in and its outcome on the way out.
#[derive(Debug, Copy, Clone)]
pub struct CallLogger {
    id: CallId,
    operation: &'static str,
}

impl CallLogger {
    /// Assign an ID and log the incoming call.
    pub fn enter(operation: &'static str, caller: &Address) -> Self {
        let id = CallId::next();
        debug!("->call{id} {operation} from {caller}");
        Self { id, operation }
    }

    /// Log the outgoing result.
    pub fn leave<T>(&self, result: &Result<T, Error>) {
        let id = self.id;
        let operation = self.operation;
        match result {
            Ok(_) => info!("<-ret{id} {operation} ok"),
            Err(err) => warn!("<-ret{id} {operation} rejected: {err}"),
        }
    }
}
