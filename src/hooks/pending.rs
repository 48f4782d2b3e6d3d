//! Per-transaction accumulator of inserted solve ids.

/// Solve ids captured during one transaction, awaiting commit.
///
/// Repeated flushes within the same transaction keep appending; the list is
/// either drained exactly once (commit) or discarded (rollback). The
/// accumulator is plain transaction-local state, so it needs no locking.
#[derive(Debug, Default)]
pub struct PendingSolves {
    ids: Vec<i64>,
}

impl PendingSolves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a newly inserted solve id.
    pub fn record(&mut self, solve_id: i64) {
        self.ids.push(solve_id);
    }

    /// Take every captured id, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.ids)
    }

    /// Drop every captured id without processing.
    pub fn discard(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_across_flushes() {
        let mut pending = PendingSolves::new();
        pending.record(1);
        pending.record(2);
        pending.record(3);
        assert_eq!(pending.len(), 3);
        assert_eq!(pending.drain(), vec![1, 2, 3]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_is_one_shot() {
        let mut pending = PendingSolves::new();
        pending.record(7);
        assert_eq!(pending.drain(), vec![7]);
        assert_eq!(pending.drain(), Vec::<i64>::new());
    }

    #[test]
    fn test_discard_drops_everything() {
        let mut pending = PendingSolves::new();
        pending.record(1);
        pending.record(2);
        pending.discard();
        assert!(pending.is_empty());
        assert!(pending.drain().is_empty());
    }
}
