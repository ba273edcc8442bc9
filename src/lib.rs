//! # txgraph-core
//!
//! Asynchronous node acquisition and graph-state orchestration for exploring cryptocurrency
//! transaction graphs.
//!
//! ## Overview
//!
//! An analyst explores addresses, entities, transactions, blocks and labels by pulling them one
//! at a time from a remote data service. txgraph-core turns those fetches into a consistent,
//! undoable workspace: a deduplicating node/relation cache, a visual graph of what the analyst
//! placed, and the multi-step fetch pipelines that connect the two.
//!
//! ### Key Features
//!
//! - **Staged acquisition**: cache-first lookup, address to entity resolution with mockup
//!   fallback, degree correction, tag loading, graph insertion
//! - **Degree excursions**: bounded neighbor prefetching so local relations match reported
//!   degrees
//! - **Guided search expansion**: multi-hop path trees merged into the workspace
//! - **Undo/redo**: bounded linear history of the visual graph
//! - **Cancellation**: removing a node silently absorbs every late reply for it
//!
//! ## Architecture
//!
//! - **[`commands`]**: the [`commands::Command`] enum, one variant per action or reply
//! - **[`session`]**: [`session::Session`], the dispatch loop and all pipelines
//! - **[`store`]**: [`store::NodeStore`], deduplicated nodes and relations
//! - **[`graph`]**: [`graph::GraphView`] and [`graph::SnapshotManager`]
//! - **[`transport`]**: the [`transport::Transport`] trait and an in-memory fixture
//! - **[`event`]**: notifications for the presentation layer
//! - **[`properties`]** / **[`nodekey`]**: the data model
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use txgraph_core::{
//!     commands::Command,
//!     config::SessionConfig,
//!     nodekey::NodeKey,
//!     session::Session,
//!     transport::fixture::{Dataset, FixtureTransport},
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Dataset::from_json(&std::fs::read_to_string("dataset.json")?)?;
//!     let mut session = Session::new(SessionConfig::default(), FixtureTransport::new(dataset))?;
//!
//!     session.submit(Command::AddNode {
//!         key: NodeKey::address("btc", "1Archive"),
//!         anchor: None,
//!     })?;
//!     session.run_until_idle().await?;
//!
//!     for placement in session.graph().placements() {
//!         println!("{} (layer {})", placement.key, placement.layer);
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod nodekey;
pub mod properties;
pub mod session;
pub mod store;
pub mod transport;

pub use error::*;
