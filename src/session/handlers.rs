use std::sync::Arc;

use crate::{
    commands::{Command, FocusLink, NodeContext},
    error::GraphError,
    event::{loading_label, Notification, StatusMessage},
    nodekey::NodeKey,
    properties::{Anchor, Direction, Neighbor, Node, Tag},
    session::Session,
    transport::{AddressesPage, NeighborsPage, Transport},
};

impl<T: Transport> Session<T> {
    pub(crate) fn click_search_result(&mut self, key: NodeKey) -> Result<(), GraphError> {
        if key.node_type.is_graph_type() {
            self.focus_on_load.insert(key.clone());
            self.select_on_load = Some(key.clone());
            self.fetch_for_result(key, NodeContext::default());
            return Ok(());
        }
        self.start_loading(loading_label(key.node_type, &key.id));
        let transport = Arc::clone(&self.transport);
        let sent = key.clone();
        self.request(
            async move { transport.fetch_detail(&sent).await },
            move |result| Command::ResultDetail { key, result },
        );
        Ok(())
    }

    pub(crate) fn click_address(&mut self, keyspace: String, address: String) -> Result<(), GraphError> {
        if !self.config.supports_keyspace(&keyspace) {
            tracing::debug!("[Session::click_address] keyspace {keyspace} is not served, ignoring");
            return Ok(());
        }
        self.click_search_result(NodeKey::address(keyspace, address))
    }

    pub(crate) fn select_neighbor(
        &mut self,
        neighbor: Neighbor,
        focus: NodeKey,
        outgoing: bool,
    ) -> Result<(), GraphError> {
        let anchor = self
            .graph
            .selected()
            .cloned()
            .map(|selected| Anchor::new(selected, outgoing));
        let Neighbor { node, relation } = neighbor;
        self.fetch_for_result(
            node.key,
            NodeContext {
                anchor,
                focus: Some(FocusLink {
                    key: focus,
                    outgoing,
                    relation,
                }),
            },
        );
        Ok(())
    }

    /// Deliver `key` to [Command::ResultNode], from the cache when possible.
    fn fetch_for_result(&mut self, key: NodeKey, context: NodeContext) {
        if let Some(node) = self.store.get(&key) {
            let result = Ok(node.clone());
            self.enqueue(Command::ResultNode {
                key,
                context,
                result,
            });
            return;
        }
        self.start_loading(loading_label(key.node_type, &key.id));
        self.notifier.status(StatusMessage::Loading(key.clone()));
        let transport = Arc::clone(&self.transport);
        let sent = key.clone();
        self.request(
            async move { transport.fetch_node(&sent).await },
            move |result| Command::ResultNode {
                key,
                context,
                result,
            },
        );
    }

    pub(crate) fn result_node(
        &mut self,
        key: NodeKey,
        context: NodeContext,
        result: Result<Node, GraphError>,
    ) -> Result<(), GraphError> {
        let label = loading_label(key.node_type, &key.id);
        let mut node = match result {
            Ok(node) => node,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.stop_loading(&label);
                self.focus_on_load.remove(&key);
                if self.select_on_load.as_ref() == Some(&key) {
                    self.select_on_load = None;
                }
                self.notifier.failure(
                    format!("Could not load {key}: {e}"),
                    Some(Command::AddNode {
                        key,
                        anchor: context.anchor,
                    }),
                );
                return Ok(());
            }
        };
        node.key = key.clone();
        let tags_loaded = self.store.add(node).tags_loaded();
        if let Some(focus) = context.focus {
            if focus.outgoing {
                self.store.link_outgoing(&focus.key, &key, focus.relation);
            } else {
                self.store.link_outgoing(&key, &focus.key, focus.relation);
            }
        }
        if self.focus_on_load.remove(&key) {
            self.notifier.send(Notification::Focused {
                fragment: key.to_fragment(),
                key: key.clone(),
            });
        }
        if !tags_loaded {
            self.request_tags(&key);
        }
        self.stop_loading(&label);
        self.notifier.status(StatusMessage::Loaded(key.clone()));
        self.add_node(key, context.anchor)
    }

    pub(crate) fn result_detail(
        &mut self,
        key: NodeKey,
        result: Result<serde_json::Value, GraphError>,
    ) -> Result<(), GraphError> {
        self.stop_loading(&loading_label(key.node_type, &key.id));
        match result {
            Ok(value) => {
                self.notifier.send(Notification::Focused {
                    fragment: key.to_fragment(),
                    key: key.clone(),
                });
                self.notifier.send(Notification::Detail { key, value });
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Could not load {key}: {e}"),
                    Some(Command::ClickSearchResult { key }),
                );
                Ok(())
            }
        }
    }

    /// Fetch tags for a cached node unless a fetch is already in flight.
    pub(crate) fn request_tags(&mut self, key: &NodeKey) {
        if !self.tags_in_flight.insert(key.clone()) {
            return;
        }
        self.notifier
            .status(StatusMessage::LoadingTagsFor(key.clone()));
        let transport = Arc::clone(&self.transport);
        let sent = key.clone();
        let key = key.clone();
        self.request(
            async move { transport.fetch_tags(&sent).await },
            move |result| Command::ResultTags { key, result },
        );
    }

    pub(crate) fn result_tags(
        &mut self,
        key: NodeKey,
        result: Result<Vec<Tag>, GraphError>,
    ) -> Result<(), GraphError> {
        self.tags_in_flight.remove(&key);
        match result {
            Ok(tags) => {
                self.store.set_tags(&key, tags)?;
                self.notifier
                    .status(StatusMessage::LoadedTagsFor(key.clone()));
                self.notifier.send(Notification::TagsUpdated(key));
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Could not load tags for {key}: {e}"),
                    Some(Command::LoadTags(key)),
                );
                Ok(())
            }
        }
    }

    pub(crate) fn load_egonet(
        &mut self,
        key: NodeKey,
        outgoing: bool,
        limit: Option<usize>,
    ) -> Result<(), GraphError> {
        self.store.require(&key)?;
        let limit = limit.unwrap_or(self.config.egonet_limit);
        self.start_loading(format!("egonet:{key}"));
        self.notifier.status(StatusMessage::LoadingNeighbors {
            key: key.clone(),
            outgoing,
        });
        let transport = Arc::clone(&self.transport);
        let sent = key.clone();
        self.request(
            async move {
                let direction = Direction::from_outgoing(outgoing);
                transport.fetch_neighbors(&sent, direction, limit, None).await
            },
            move |result| Command::ResultEgonet {
                key,
                outgoing,
                result,
            },
        );
        Ok(())
    }

    /// Link and acquire every same-type neighbor, anchored at the ego node.
    pub(crate) fn result_egonet(
        &mut self,
        key: NodeKey,
        outgoing: bool,
        result: Result<NeighborsPage, GraphError>,
    ) -> Result<(), GraphError> {
        self.stop_loading(&format!("egonet:{key}"));
        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Could not load neighbors of {key}: {e}"),
                    Some(Command::LoadEgonet {
                        key,
                        outgoing,
                        limit: None,
                    }),
                );
                return Ok(());
            }
        };
        self.store.require(&key)?;
        let mut count = 0;
        for neighbor in page.neighbors {
            let other = neighbor.node.key;
            if other == key || other.node_type != key.node_type {
                continue;
            }
            if outgoing {
                self.store.link_outgoing(&key, &other, neighbor.relation);
            } else {
                self.store.link_outgoing(&other, &key, neighbor.relation);
            }
            self.add_node(other, Some(Anchor::new(key.clone(), outgoing)))?;
            count += 1;
        }
        self.notifier.status(StatusMessage::LoadedNeighbors {
            key,
            outgoing,
            count,
        });
        Ok(())
    }

    pub(crate) fn load_entity_addresses(
        &mut self,
        entity: NodeKey,
        limit: Option<usize>,
    ) -> Result<(), GraphError> {
        self.store.require(&entity)?;
        let limit = limit.unwrap_or(self.config.entity_addresses_limit);
        self.start_loading(format!("addresses:{entity}"));
        self.notifier.status(StatusMessage::LoadingEntityAddresses {
            entity: entity.clone(),
            limit,
        });
        let transport = Arc::clone(&self.transport);
        let sent = entity.clone();
        self.request(
            async move { transport.fetch_entity_addresses(&sent, limit).await },
            move |result| Command::ResultEntityAddresses { entity, result },
        );
        Ok(())
    }

    pub(crate) fn result_entity_addresses(
        &mut self,
        entity: NodeKey,
        result: Result<AddressesPage, GraphError>,
    ) -> Result<(), GraphError> {
        self.stop_loading(&format!("addresses:{entity}"));
        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Could not load addresses of {entity}: {e}"),
                    Some(Command::LoadEntityAddresses {
                        entity,
                        limit: None,
                    }),
                );
                return Ok(());
            }
        };
        let mut addresses = Vec::with_capacity(page.addresses.len());
        for mut address in page.addresses {
            address.key.keyspace = entity.keyspace.clone();
            address.entity = Some(entity.id.clone());
            let key = address.key.clone();
            let tags_loaded = self.store.add(address).tags_loaded();
            if !tags_loaded {
                self.request_tags(&key);
            }
            addresses.push(key);
        }
        self.notifier.status(StatusMessage::LoadedEntityAddresses {
            entity: entity.clone(),
            count: addresses.len(),
        });
        if !self.graph.contains(&entity) {
            tracing::debug!(
                "[Session::result_entity_addresses] {entity} left the graph, not placing addresses"
            );
            return Ok(());
        }
        let added = self.graph.set_entity_addresses(&entity, &addresses)?;
        self.notifier
            .send(Notification::EntityAddresses { entity, addresses });
        if added > 0 {
            self.notifier.send(Notification::GraphChanged);
            self.enqueue(Command::CreateSnapshot);
        }
        Ok(())
    }

    pub(crate) fn remove_entity_addresses(&mut self, entity: NodeKey) -> Result<(), GraphError> {
        let removed = self.graph.remove_entity_addresses(&entity);
        for key in removed.iter() {
            self.pending.cancel(key);
        }
        if !removed.is_empty() {
            self.notifier.send(Notification::GraphChanged);
            self.enqueue(Command::CreateSnapshot);
        }
        Ok(())
    }

    /// Remove a node from the visual graph and abandon its acquisition. The store keeps it.
    pub(crate) fn remove_node(&mut self, key: NodeKey) -> Result<(), GraphError> {
        self.notifier
            .status(StatusMessage::RemovedNode(key.clone()));
        let mut removed = self.graph.remove(&key);
        let changed = !removed.is_empty();
        removed.push(key.clone());
        for key in removed.iter() {
            if self.pending.cancel(key) {
                self.stop_loading(&loading_label(key.node_type, &key.id));
            }
            self.focus_on_load.remove(key);
            if self.select_on_load.as_ref() == Some(key) {
                self.select_on_load = None;
            }
        }
        if changed {
            self.notifier.send(Notification::GraphChanged);
            self.enqueue(Command::CreateSnapshot);
        }
        Ok(())
    }

    pub(crate) fn input_notes(&mut self, key: NodeKey, note: String) -> Result<(), GraphError> {
        self.store.set_notes(&key, note)?;
        self.notifier.send(Notification::GraphChanged);
        Ok(())
    }

    pub(crate) fn set_labels(&mut self, key: NodeKey, labels: Vec<Tag>) -> Result<(), GraphError> {
        self.store.add_tags(&key, labels)?;
        self.notifier.send(Notification::TagsUpdated(key));
        Ok(())
    }

    pub(crate) fn select_node(&mut self, key: NodeKey) -> Result<(), GraphError> {
        self.store.require(&key)?;
        if !self.graph.select(&key) {
            tracing::debug!("[Session::select_node] {key} is cached but not placed");
        }
        self.notifier.send(Notification::Focused {
            fragment: key.to_fragment(),
            key,
        });
        Ok(())
    }

    pub(crate) fn deselect(&mut self) -> Result<(), GraphError> {
        self.graph.deselect();
        self.notifier.send(Notification::GraphChanged);
        Ok(())
    }

    pub(crate) fn drag_node(&mut self, key: NodeKey, dx: f64, dy: f64) -> Result<(), GraphError> {
        if self.graph.drag(&key, dx, dy) {
            self.notifier.send(Notification::GraphChanged);
        }
        Ok(())
    }

    pub(crate) fn drag_node_end(&mut self, key: NodeKey) -> Result<(), GraphError> {
        if self.graph.contains(&key) {
            self.enqueue(Command::CreateSnapshot);
        }
        Ok(())
    }

    pub(crate) fn create_snapshot(&mut self) -> Result<(), GraphError> {
        self.history.create(&self.graph);
        self.notifier.send(Notification::SnapshotCreated);
        self.history_changed();
        Ok(())
    }

    pub(crate) fn undo(&mut self) -> Result<(), GraphError> {
        if let Some(view) = self.history.undo() {
            self.graph = view;
            self.notifier.send(Notification::SnapshotRestored);
            self.notifier.send(Notification::GraphChanged);
        }
        self.history_changed();
        Ok(())
    }

    pub(crate) fn redo(&mut self) -> Result<(), GraphError> {
        if let Some(view) = self.history.redo() {
            self.graph = view;
            self.notifier.send(Notification::SnapshotRestored);
            self.notifier.send(Notification::GraphChanged);
        }
        self.history_changed();
        Ok(())
    }
}
