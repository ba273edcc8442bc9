//! txgraph CLI tool
//!
//! Drives a txgraph-core session against a fixture dataset from the command line.
//!
//! ## Commands
//!
//! - `expand`: acquire a node (optionally its egonet, entity addresses or a guided search) and
//!   write the resulting workspace document
//! - `inspect <document>`: summarize a saved workspace document
//! - `config [path]`: print the effective session configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::{fs, path::PathBuf};
use tokio::sync::mpsc::unbounded_channel;
use txgraph_core::{
    commands::Command,
    config::{ConfigProvider, SessionConfig, TomlConfigProvider},
    event::Notification,
    nodekey::NodeKey,
    session::{Document, Session},
    store::NodeStore,
    transport::{
        fixture::{Dataset, FixtureTransport},
        SearchCriterion, SearchRequest,
    },
};

#[derive(Parser)]
#[command(name = "txgraph")]
#[command(author, version, about = "Explore transaction graphs from a fixture dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    In,
    Out,
}

impl Side {
    fn outgoing(self) -> bool {
        matches!(self, Side::Out)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a node and write the resulting workspace
    Expand {
        /// Fixture dataset (JSON)
        #[arg(long)]
        dataset: PathBuf,

        /// Node to acquire, as keyspace/type/id
        #[arg(long)]
        node: String,

        /// Session configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also load the node's neighbors on this side
        #[arg(long, value_enum)]
        egonet: Option<Side>,

        /// Also draw the addresses of the node's entity
        #[arg(long)]
        addresses: bool,

        /// Run a guided search for entities tagged with this category
        #[arg(long)]
        search_category: Option<String>,

        /// Direction of the guided search
        #[arg(long, value_enum, default_value = "out")]
        search_side: Side,

        /// Guided search depth
        #[arg(long)]
        depth: Option<u32>,

        /// Where to write the workspace document (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every notification
        #[arg(short, long)]
        verbose: bool,
    },

    /// Summarize a saved workspace document
    Inspect {
        document: PathBuf,
    },

    /// Print the effective session configuration
    Config {
        #[arg(default_value = "txgraph.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Expand {
            dataset,
            node,
            config,
            egonet,
            addresses,
            search_category,
            search_side,
            depth,
            output,
            verbose,
        } => {
            let config = match config {
                Some(path) => TomlConfigProvider::new(path).get_config()?,
                None => SessionConfig::default(),
            };
            let key: NodeKey = node.parse()?;
            let dataset = Dataset::from_json(&fs::read_to_string(&dataset)?)?;
            let (tx, mut rx) = unbounded_channel::<Notification>();
            let mut session = Session::new(config, FixtureTransport::new(dataset))?
                .with_notifications(tx);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                session.submit(Command::AddNode {
                    key: key.clone(),
                    anchor: None,
                })?;
                session.run_until_idle().await?;

                if let Some(side) = egonet {
                    session.submit(Command::LoadEgonet {
                        key: key.clone(),
                        outgoing: side.outgoing(),
                        limit: None,
                    })?;
                    session.run_until_idle().await?;
                }

                let entity = session.store().get(&key).and_then(|n| n.entity_key());
                if addresses {
                    match entity.clone() {
                        Some(entity) => {
                            session.submit(Command::LoadEntityAddresses {
                                entity,
                                limit: None,
                            })?;
                            session.run_until_idle().await?;
                        }
                        None => eprintln!("{key} has no entity, skipping --addresses"),
                    }
                }

                if let Some(category) = search_category {
                    let root = entity.unwrap_or_else(|| key.clone());
                    let mut request = SearchRequest::new(
                        root,
                        search_side.outgoing(),
                        SearchCriterion::Category(category),
                    );
                    if let Some(depth) = depth {
                        request.depth = depth;
                    }
                    session.submit(Command::SearchNeighbors(request))?;
                    session.run_until_idle().await?;
                }
                Ok::<(), txgraph_core::GraphError>(())
            })?;

            while let Ok(notification) = rx.try_recv() {
                match &notification {
                    Notification::Failure { message, .. } => eprintln!("failed: {message}"),
                    _ if verbose => eprintln!("{notification}"),
                    _ => {}
                }
            }

            let json = session.serialize().to_json()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!(
                        "Wrote {} placed / {} cached nodes to {}",
                        session.graph().len(),
                        session.store().len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
            Ok(())
        }

        Commands::Inspect { document } => {
            let document = Document::from_json(&fs::read_to_string(&document)?)?;
            document.validate()?;
            let store = NodeStore::from_parts(document.nodes.clone(), document.relations.clone());
            println!("Document {} (version {})", document.id, document.version);
            println!(
                "{} cached nodes, {} relations, {} placed, {} visible relations",
                store.len(),
                store.relations().edge_count(),
                document.view.len(),
                document.view.visible_edges(&store).len()
            );
            for placement in document.view.placements() {
                let node = store.get(&placement.key);
                let tags = node
                    .and_then(|n| n.tags.as_ref())
                    .map(|tags| {
                        tags.iter()
                            .map(|t| t.label.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                let mockup = if node.is_some_and(|n| n.mockup) {
                    " (mockup)"
                } else {
                    ""
                };
                println!(
                    "  [{:>3}] {}{mockup} {tags}",
                    placement.layer, placement.key
                );
            }
            Ok(())
        }

        Commands::Config { path } => {
            let config = TomlConfigProvider::new(path).get_config()?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
