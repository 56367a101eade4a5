use serde::{Deserialize, Serialize};

/// A counter used to implement auto-increment ids. Ids start at 1 and are
/// never reused, so off-ledger references to an id stay valid forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    next: u32,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(start: u32) -> Self {
        Self { next: start }
    }

    /// Retrieve the next value and advance.
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increment() {
        let mut counter = Counter::default();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.next(), 3);

        let mut counter = Counter::new(10);
        assert_eq!(counter.next(), 10);
    }
}
