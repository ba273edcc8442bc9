use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    mem::replace,
    sync::Arc,
};

use crate::{
    commands::Command,
    error::GraphError,
    event::StatusMessage,
    nodekey::NodeKey,
    properties::Direction,
    session::Session,
    transport::{NeighborsPage, Transport},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExcursionStage {
    Start,
    Incoming(Result<NeighborsPage, GraphError>),
    Outgoing(Result<NeighborsPage, GraphError>),
}

impl Display for ExcursionStage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ExcursionStage::Start => write!(f, "Start"),
            ExcursionStage::Incoming(_) => write!(f, "Incoming"),
            ExcursionStage::Outgoing(_) => write!(f, "Outgoing"),
        }
    }
}

/// Prefetch up to `degree_threshold` same-type neighbors of `key` in each direction so its
/// local relations reflect its reported degree, then run `back`.
///
/// A direction is skipped when the node's degree in it reaches the threshold. Outgoing
/// neighbors are also skipped when the store already holds as many outgoing relations as the
/// node reports. A failed fetch counts as skipped; `back` always runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excursion {
    pub key: NodeKey,
    pub back: Box<Command>,
    pub stage: ExcursionStage,
}

impl Excursion {
    fn at(self, stage: ExcursionStage) -> Excursion {
        Excursion { stage, ..self }
    }
}

impl<T: Transport> Session<T> {
    pub(crate) fn start_excursion(&mut self, key: NodeKey, back: Command) {
        self.enqueue(Command::DegreeExcursion(Excursion {
            key,
            back: Box::new(back),
            stage: ExcursionStage::Start,
        }));
    }

    pub(crate) fn excursion(&mut self, mut excursion: Excursion) -> Result<(), GraphError> {
        match replace(&mut excursion.stage, ExcursionStage::Start) {
            ExcursionStage::Start => {
                let in_degree = self.store.require(&excursion.key)?.in_degree;
                if in_degree >= self.config.degree_threshold {
                    tracing::debug!(
                        "[Session::excursion] {} has {in_degree} incoming relations, skipping",
                        excursion.key
                    );
                    return self.excursion_outgoing(excursion);
                }
                self.request_neighbors(excursion, Direction::Incoming);
                Ok(())
            }
            ExcursionStage::Incoming(result) => {
                self.link_neighbors(&excursion.key, Direction::Incoming, result)?;
                self.excursion_outgoing(excursion)
            }
            ExcursionStage::Outgoing(result) => {
                self.link_neighbors(&excursion.key, Direction::Outgoing, result)?;
                self.enqueue(*excursion.back);
                Ok(())
            }
        }
    }

    fn excursion_outgoing(&mut self, excursion: Excursion) -> Result<(), GraphError> {
        let out_degree = self.store.require(&excursion.key)?.out_degree;
        let known = self.store.outgoing_count(&excursion.key) as u64;
        if out_degree >= self.config.degree_threshold || out_degree == known {
            tracing::debug!(
                "[Session::excursion] {} outgoing: {out_degree} reported, {known} known, skipping",
                excursion.key
            );
            self.enqueue(*excursion.back);
            return Ok(());
        }
        self.request_neighbors(excursion, Direction::Outgoing);
        Ok(())
    }

    fn request_neighbors(&mut self, excursion: Excursion, direction: Direction) {
        self.notifier.status(StatusMessage::LoadingNeighbors {
            key: excursion.key.clone(),
            outgoing: direction.is_outgoing(),
        });
        let transport = Arc::clone(&self.transport);
        let key = excursion.key.clone();
        let limit = self.config.degree_threshold as usize;
        self.request(
            async move {
                transport
                    .fetch_neighbors(&key, direction, limit, None)
                    .await
            },
            move |result| {
                let stage = match direction {
                    Direction::Incoming => ExcursionStage::Incoming(result),
                    Direction::Outgoing => ExcursionStage::Outgoing(result),
                };
                Command::DegreeExcursion(excursion.at(stage))
            },
        );
    }

    fn link_neighbors(
        &mut self,
        key: &NodeKey,
        direction: Direction,
        result: Result<NeighborsPage, GraphError>,
    ) -> Result<(), GraphError> {
        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Could not load {direction} neighbors of {key}: {e}"),
                    None,
                );
                return Ok(());
            }
        };
        let mut count = 0;
        for neighbor in page.neighbors {
            let other = &neighbor.node.key;
            if other.node_type != key.node_type {
                continue;
            }
            match direction {
                Direction::Incoming => self.store.link_outgoing(other, key, neighbor.relation),
                Direction::Outgoing => self.store.link_outgoing(key, other, neighbor.relation),
            };
            count += 1;
        }
        self.notifier.status(StatusMessage::LoadedNeighbors {
            key: key.clone(),
            outgoing: direction.is_outgoing(),
            count,
        });
        Ok(())
    }
}
