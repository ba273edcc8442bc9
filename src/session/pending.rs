use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use crate::nodekey::NodeKey;

/// Identifies one acquisition request. Tickets are never reused, so a reply carrying an old
/// ticket is recognizable as stale even if the same node was requested again since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Display for Ticket {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Nodes whose acquisition is in flight, each with its live [Ticket].
#[derive(Debug, Default)]
pub struct PendingRegistry {
    generation: u64,
    live: BTreeMap<NodeKey, Ticket>,
}

impl PendingRegistry {
    /// Start tracking an acquisition of `key`. Returns None when one is already in flight.
    pub fn register(&mut self, key: &NodeKey) -> Option<Ticket> {
        if self.live.contains_key(key) {
            return None;
        }
        self.generation += 1;
        let ticket = Ticket(self.generation);
        self.live.insert(key.clone(), ticket);
        Some(ticket)
    }

    pub fn is_live(&self, key: &NodeKey, ticket: Ticket) -> bool {
        self.live.get(key) == Some(&ticket)
    }

    /// Stop tracking a finished acquisition. Returns false if the ticket was no longer live.
    pub fn release(&mut self, key: &NodeKey, ticket: Ticket) -> bool {
        if self.is_live(key, ticket) {
            self.live.remove(key);
            true
        } else {
            false
        }
    }

    /// Abandon whatever acquisition of `key` is in flight.
    pub fn cancel(&mut self, key: &NodeKey) -> bool {
        self.live.remove(key).is_some()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.live.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Abandon everything. Generations keep counting up.
    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_tickets_stay_dead() {
        let mut pending = PendingRegistry::default();
        let key = NodeKey::address("btc", "1A");

        let first = pending.register(&key).unwrap();
        assert!(pending.register(&key).is_none());
        assert!(pending.cancel(&key));

        let second = pending.register(&key).unwrap();
        assert_ne!(first, second);
        assert!(!pending.is_live(&key, first));
        assert!(!pending.release(&key, first));
        assert!(pending.release(&key, second));
        assert!(pending.is_empty());
    }
}
