use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    mem::replace,
    sync::Arc,
};

use crate::{
    commands::Command,
    error::GraphError,
    event::{loading_label, Notification, StatusMessage},
    nodekey::NodeKey,
    properties::{Anchor, Node, NodeType, RelationData},
    session::{Session, Ticket},
    transport::Transport,
};

/// Where an [Acquisition] resumes. Stages that wait on the transport carry its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AcquireStage {
    /// Use the cached node or fetch it.
    Lookup,
    /// Cache the node; addresses without an owner go on to resolve it.
    Register(Result<Node, GraphError>),
    /// Cache the address's owner, or a mockup when it has none.
    ResolveEntity(Result<Option<Node>, GraphError>),
    /// Correct the degree of the node (or of its owning entity).
    Excursion,
    /// Place the node in the visual graph.
    Insert,
}

impl Display for AcquireStage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AcquireStage::Lookup => write!(f, "Lookup"),
            AcquireStage::Register(_) => write!(f, "Register"),
            AcquireStage::ResolveEntity(_) => write!(f, "ResolveEntity"),
            AcquireStage::Excursion => write!(f, "Excursion"),
            AcquireStage::Insert => write!(f, "Insert"),
        }
    }
}

/// Turns a bare key into a cached, tagged, degree-corrected node placed in the visual graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub key: NodeKey,
    pub anchor: Option<Anchor>,
    pub ticket: Ticket,
    pub stage: AcquireStage,
}

impl Acquisition {
    fn at(self, stage: AcquireStage) -> Acquisition {
        Acquisition { stage, ..self }
    }

    fn label(&self) -> String {
        loading_label(self.key.node_type, &self.key.id)
    }

    fn retry(&self) -> Command {
        Command::AddNode {
            key: self.key.clone(),
            anchor: self.anchor.clone(),
        }
    }
}

impl<T: Transport> Session<T> {
    pub(crate) fn add_node(&mut self, key: NodeKey, anchor: Option<Anchor>) -> Result<(), GraphError> {
        if !key.node_type.is_graph_type() {
            return Err(GraphError::Command(format!(
                "{key} cannot be added to the graph"
            )));
        }
        let Some(ticket) = self.pending.register(&key) else {
            tracing::debug!("[Session::add_node] {key} is already being acquired");
            return Ok(());
        };
        self.start_loading(loading_label(key.node_type, &key.id));
        self.enqueue(Command::AcquireNode(Acquisition {
            key,
            anchor,
            ticket,
            stage: AcquireStage::Lookup,
        }));
        Ok(())
    }

    pub(crate) fn acquire(&mut self, mut acquisition: Acquisition) -> Result<(), GraphError> {
        match replace(&mut acquisition.stage, AcquireStage::Lookup) {
            AcquireStage::Lookup => self.acquire_lookup(acquisition),
            AcquireStage::Register(result) => self.acquire_register(acquisition, result),
            AcquireStage::ResolveEntity(result) => self.acquire_resolve_entity(acquisition, result),
            AcquireStage::Excursion => self.acquire_excursion(acquisition),
            AcquireStage::Insert => self.acquire_insert(acquisition),
        }
    }

    fn is_live(&self, acquisition: &Acquisition) -> bool {
        let live = self.pending.is_live(&acquisition.key, acquisition.ticket);
        if !live {
            tracing::debug!(
                "[Session::acquire] {} {} was cancelled, dropping",
                acquisition.key,
                acquisition.ticket
            );
        }
        live
    }

    fn acquire_lookup(&mut self, acquisition: Acquisition) -> Result<(), GraphError> {
        if let Some(node) = self.store.get(&acquisition.key) {
            let cached = Ok(node.clone());
            self.enqueue(Command::AcquireNode(
                acquisition.at(AcquireStage::Register(cached)),
            ));
            return Ok(());
        }
        self.notifier
            .status(StatusMessage::Loading(acquisition.key.clone()));
        let transport = Arc::clone(&self.transport);
        let key = acquisition.key.clone();
        self.request(
            async move { transport.fetch_node(&key).await },
            move |result| Command::AcquireNode(acquisition.at(AcquireStage::Register(result))),
        );
        Ok(())
    }

    fn acquire_register(
        &mut self,
        acquisition: Acquisition,
        result: Result<Node, GraphError>,
    ) -> Result<(), GraphError> {
        let mut node = match result {
            Ok(node) => node,
            Err(e) => return self.acquisition_failed(acquisition, e),
        };
        if node.key != acquisition.key {
            tracing::warn!(
                "[Session::acquire] requested {} but received {}, keeping the requested key",
                acquisition.key,
                node.key
            );
            node.key = acquisition.key.clone();
        }
        self.store.add(node);
        if let Some(anchor) = acquisition.anchor.as_ref().filter(|a| !a.outgoing) {
            self.store
                .link_outgoing(&acquisition.key, &anchor.node, RelationData::default());
        }
        if !self.is_live(&acquisition) {
            return Ok(());
        }

        if acquisition.key.is_address() && !self.store.has_entity(&acquisition.key) {
            self.notifier
                .status(StatusMessage::LoadingEntityFor(acquisition.key.clone()));
            let transport = Arc::clone(&self.transport);
            let address = acquisition.key.clone();
            self.request(
                async move {
                    transport
                        .fetch_entity_for_address(&address.keyspace, &address.id)
                        .await
                },
                move |result| {
                    Command::AcquireNode(acquisition.at(AcquireStage::ResolveEntity(result)))
                },
            );
        } else {
            self.enqueue(Command::AcquireNode(
                acquisition.at(AcquireStage::Excursion),
            ));
        }
        Ok(())
    }

    fn acquire_resolve_entity(
        &mut self,
        acquisition: Acquisition,
        result: Result<Option<Node>, GraphError>,
    ) -> Result<(), GraphError> {
        if !self.is_live(&acquisition) {
            return Ok(());
        }
        let mut entity = match result {
            Ok(Some(entity)) => {
                self.notifier
                    .status(StatusMessage::LoadedEntityFor(acquisition.key.clone()));
                entity
            }
            Ok(None) => {
                self.notifier
                    .status(StatusMessage::NoEntityFor(acquisition.key.clone()));
                Node::mockup_entity(&acquisition.key)
            }
            Err(e) => return self.acquisition_failed(acquisition, e),
        };
        entity.addresses.insert(acquisition.key.id.clone());
        let entity_key = entity.key.clone();
        let tags_loaded = self.store.add(entity).tags_loaded();
        if !tags_loaded {
            self.request_tags(&entity_key);
        }
        self.enqueue(Command::AcquireNode(
            acquisition.at(AcquireStage::Excursion),
        ));
        Ok(())
    }

    fn acquire_excursion(&mut self, acquisition: Acquisition) -> Result<(), GraphError> {
        if !self.is_live(&acquisition) {
            return Ok(());
        }
        let node = self.store.require(&acquisition.key)?;
        let subject = match node.key.node_type {
            NodeType::Entity => Some(node.key.clone()),
            NodeType::Address => self
                .store
                .entity_of(&acquisition.key)
                .filter(|entity| !entity.mockup)
                .map(|entity| entity.key.clone()),
            _ => None,
        };
        let back = Command::AcquireNode(acquisition.at(AcquireStage::Insert));
        match subject {
            Some(subject) => self.start_excursion(subject, back),
            None => self.enqueue(back),
        }
        Ok(())
    }

    fn acquire_insert(&mut self, acquisition: Acquisition) -> Result<(), GraphError> {
        if !self.is_live(&acquisition) {
            return Ok(());
        }
        let key = acquisition.key.clone();
        if !self.store.require(&key)?.tags_loaded() {
            self.request_tags(&key);
        }
        let newly_placed = !self.graph.contains(&key);
        self.graph
            .add(&self.store, &key, acquisition.anchor.as_ref())?;
        self.pending.release(&key, acquisition.ticket);
        self.stop_loading(&acquisition.label());
        if self.select_on_load.as_ref() == Some(&key) {
            self.select_on_load = None;
            self.graph.select(&key);
        }
        tracing::debug!("[Session::acquire] {key} is ready");
        self.notifier.send(Notification::NodeReady {
            key,
            anchor: acquisition.anchor,
        });
        if newly_placed {
            self.notifier.send(Notification::GraphChanged);
            self.enqueue(Command::CreateSnapshot);
        }
        Ok(())
    }

    fn acquisition_failed(
        &mut self,
        acquisition: Acquisition,
        err: GraphError,
    ) -> Result<(), GraphError> {
        if err.is_fatal() {
            return Err(err);
        }
        if !self.pending.release(&acquisition.key, acquisition.ticket) {
            tracing::debug!(
                "[Session::acquire] ignoring failure for cancelled {}: {err}",
                acquisition.key
            );
            return Ok(());
        }
        self.stop_loading(&acquisition.label());
        self.notifier.failure(
            format!("Could not load {}: {err}", acquisition.key),
            Some(acquisition.retry()),
        );
        Ok(())
    }
}
