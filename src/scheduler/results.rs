use std::collections::HashMap;

use crate::scheduler::job::{ResultKey, ResultState};

/// Outcome of a fetch against the result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Unknown,
    Pending,
    /// The entry was ready and has now been removed
    Delivered(String),
}

#[derive(Debug, Default)]
pub struct ResultTable {
    entries: HashMap<ResultKey, ResultState>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pending(&mut self, key: ResultKey) {
        self.entries.insert(key, ResultState::Pending);
    }

    /// Move a pending entry to ready. Returns false if the entry is missing
    /// or was already ready.
    pub fn complete(&mut self, key: &ResultKey, output: String) -> bool {
        match self.entries.get_mut(key) {
            Some(state) if *state == ResultState::Pending => {
                *state = ResultState::Ready(output);
                true
            }
            _ => false,
        }
    }

    /// Ready entries are removed as they are returned.
    pub fn take(&mut self, key: &ResultKey) -> FetchOutcome {
        match self.entries.get(key) {
            None => FetchOutcome::Unknown,
            Some(ResultState::Pending) => FetchOutcome::Pending,
            Some(ResultState::Ready(_)) => match self.entries.remove(key) {
                Some(ResultState::Ready(output)) => FetchOutcome::Delivered(output),
                _ => FetchOutcome::Unknown,
            },
        }
    }

    pub fn get(&self, key: &ResultKey) -> Option<&ResultState> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::HostId;

    fn key(id: u64) -> ResultKey {
        ResultKey::new(HostId::new("10.0.0.1"), id)
    }

    #[test]
    fn pending_then_delivered_once() {
        let mut table = ResultTable::new();
        table.insert_pending(key(1));

        assert_eq!(table.take(&key(1)), FetchOutcome::Pending);
        assert!(table.complete(&key(1), "out".into()));
        assert_eq!(table.take(&key(1)), FetchOutcome::Delivered("out".into()));
        assert_eq!(table.take(&key(1)), FetchOutcome::Unknown);
        assert!(table.is_empty());
    }

    #[test]
    fn complete_only_transitions_once() {
        let mut table = ResultTable::new();
        table.insert_pending(key(1));

        assert!(table.complete(&key(1), "first".into()));
        assert!(!table.complete(&key(1), "second".into()));
        assert_eq!(
            table.get(&key(1)),
            Some(&ResultState::Ready("first".into()))
        );
    }

    #[test]
    fn complete_unknown_key_is_rejected() {
        let mut table = ResultTable::new();
        assert!(!table.complete(&key(9), "out".into()));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn other_host_cannot_take() {
        let mut table = ResultTable::new();
        table.insert_pending(key(1));
        table.complete(&key(1), "out".into());

        let foreign = ResultKey::new(HostId::new("10.0.0.2"), 1);
        assert_eq!(table.take(&foreign), FetchOutcome::Unknown);
        assert_eq!(table.len(), 1);
    }
}
