//! Store module: the canonical cache of graph objects fetched from the data service.
//!
//! # Module Organization
//!
//! - [`relations`]: directed relation graph keyed by [`crate::nodekey::NodeKey`]
//! - [`base`]: [`NodeStore`], deduplicated node states plus their relations
//!
//! Nodes removed from the visual graph stay here. The store is a cache of everything the
//! session has learned, and [`crate::graph::GraphView`] decides what is shown.

mod base;
mod relations;


pub use base::NodeStore;
pub use relations::{RelationGraph, StoredRelation};
