use crate::graph::GraphView;

pub const DEFAULT_SNAPSHOT_DEPTH: usize = 128;

/// Linear undo/redo history over [GraphView] states.
///
/// The top of `previous` is always the current state, so undo needs at least two entries.
/// Creating a snapshot discards everything redoable. The history keeps at most `depth` states,
/// dropping the oldest first.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    previous: Vec<GraphView>,
    next: Vec<GraphView>,
    depth: usize,
}

impl Default for SnapshotManager {
    fn default() -> Self {
        SnapshotManager::new(DEFAULT_SNAPSHOT_DEPTH)
    }
}

impl SnapshotManager {
    pub fn new(depth: usize) -> Self {
        SnapshotManager {
            previous: Vec::new(),
            next: Vec::new(),
            depth: depth.max(1),
        }
    }

    pub fn create(&mut self, view: &GraphView) {
        self.previous.push(view.clone());
        self.next.clear();
        if self.previous.len() > self.depth {
            let excess = self.previous.len() - self.depth;
            self.previous.drain(0..excess);
        }
    }

    /// Step back. Returns the state to restore, or None when there is nothing to undo.
    pub fn undo(&mut self) -> Option<GraphView> {
        if self.previous.len() < 2 {
            return None;
        }
        let current = self.previous.pop()?;
        self.next.push(current);
        self.previous.last().cloned()
    }

    /// Step forward. Returns the state to restore, or None when there is nothing to redo.
    pub fn redo(&mut self) -> Option<GraphView> {
        let restored = self.next.pop()?;
        self.previous.push(restored.clone());
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        self.previous.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.next.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Forget all history and start over from `baseline`.
    pub fn reset(&mut self, baseline: &GraphView) {
        self.previous.clear();
        self.next.clear();
        self.previous.push(baseline.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nodekey::NodeKey, properties::Node, store::NodeStore};

    fn views(n: usize) -> Vec<GraphView> {
        let mut store = NodeStore::new();
        let mut view = GraphView::new();
        let mut out = vec![view.clone()];
        for i in 0..n {
            let key = NodeKey::entity("btc", i.to_string());
            store.add(Node::new(key.clone()));
            view.add(&store, &key, None).unwrap();
            out.push(view.clone());
        }
        out
    }

    #[test]
    fn undo_redo_are_linear() {
        let states = views(2);
        let mut history = SnapshotManager::default();
        history.reset(&states[0]);
        assert!(!history.can_undo());
        assert!(history.undo().is_none());

        history.create(&states[1]);
        history.create(&states[2]);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert_eq!(history.undo(), Some(states[1].clone()));
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(states[2].clone()));
        assert!(history.redo().is_none());

        assert_eq!(history.undo(), Some(states[1].clone()));
        history.create(&states[0]);
        assert!(!history.can_redo());
    }

    #[test]
    fn depth_bounds_history() {
        let states = views(4);
        let mut history = SnapshotManager::new(2);
        for state in states.iter() {
            history.create(state);
        }
        assert_eq!(history.undo(), Some(states[3].clone()));
        assert!(history.undo().is_none());
        assert_eq!(history.depth(), 2);
    }
}
