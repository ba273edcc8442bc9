//! Graph module: what the analyst sees, and its history.
//!
//! # Module Organization
//!
//! - [`view`]: [`GraphView`], placement of store nodes into the visual graph
//! - [`snapshot`]: [`SnapshotManager`], bounded undo/redo over [`GraphView`] states

mod snapshot;
mod view;

pub use snapshot::{SnapshotManager, DEFAULT_SNAPSHOT_DEPTH};
pub use view::{GraphView, Placement};
