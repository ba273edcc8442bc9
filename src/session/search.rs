use std::sync::Arc;

use crate::{
    commands::Command,
    error::GraphError,
    event::{Notification, StatusMessage},
    nodekey::NodeKey,
    properties::Anchor,
    session::Session,
    transport::{PathNode, SearchRequest, SearchResult, Transport},
};

fn search_label(request: &SearchRequest) -> String {
    format!("search:{}", request.key)
}

impl<T: Transport> Session<T> {
    pub(crate) fn search_neighbors(&mut self, request: SearchRequest) -> Result<(), GraphError> {
        request.validate(&self.config)?;
        self.start_loading(search_label(&request));
        self.notifier.status(StatusMessage::Searching {
            key: request.key.clone(),
            criterion: request.criterion.to_string(),
        });
        let transport = Arc::clone(&self.transport);
        let sent = request.clone();
        self.request(
            async move { transport.fetch_guided_search(&sent).await },
            move |result| Command::ResultSearchNeighbors { request, result },
        );
        Ok(())
    }

    /// Expand a search result tree into the store and the visual graph, depth first, and
    /// report how many paths ended at a match.
    pub(crate) fn result_search_neighbors(
        &mut self,
        request: SearchRequest,
        result: Result<SearchResult, GraphError>,
    ) -> Result<(), GraphError> {
        self.stop_loading(&search_label(&request));
        let SearchResult { keyspace, paths } = match result {
            Ok(result) => result,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.notifier.failure(
                    format!("Search from {} failed: {e}", request.key),
                    Some(Command::SearchNeighbors(request)),
                );
                return Ok(());
            }
        };

        let mut count = 0;
        let mut work: Vec<(NodeKey, PathNode)> = paths
            .into_iter()
            .rev()
            .map(|path| (request.key.clone(), path))
            .collect();
        while let Some((anchor, path)) = work.pop() {
            let PathNode {
                mut node,
                relation,
                matching_addresses,
                paths,
            } = path;
            node.key.keyspace = keyspace.clone();
            let key = node.key.clone();
            self.store.add(node);
            let parent = match self.graph.add(
                &self.store,
                &key,
                Some(&Anchor::new(anchor.clone(), request.outgoing)),
            ) {
                Ok(parent) => parent,
                Err(e) => {
                    tracing::warn!(
                        "[Session::result_search_neighbors] skipping {key} and its paths: {e}"
                    );
                    continue;
                }
            };
            if request.outgoing {
                self.store.link_outgoing(&anchor, &key, relation);
            } else {
                self.store.link_outgoing(&key, &anchor, relation);
            }
            self.start_excursion(key.clone(), Command::RedrawGraph);

            let entity = self
                .store
                .get(&key)
                .and_then(|n| n.entity_key())
                .map(|k| k.id);
            for mut address in matching_addresses {
                address.key.keyspace = keyspace.clone();
                address.entity = entity.clone();
                let address_key = address.key.clone();
                self.store.add(address);
                if let Err(e) = self.graph.add(
                    &self.store,
                    &address_key,
                    Some(&Anchor::new(parent.clone(), request.outgoing)),
                ) {
                    tracing::warn!(
                        "[Session::result_search_neighbors] skipping address {address_key}: {e}"
                    );
                }
            }

            match paths {
                Some(children) if !children.is_empty() => {
                    work.extend(children.into_iter().rev().map(|c| (parent.clone(), c)));
                }
                _ => count += 1,
            }
        }

        self.last_search_count = Some(count);
        self.notifier.status(StatusMessage::SearchResult {
            count,
            criterion: request.criterion.to_string(),
        });
        self.notifier.send(Notification::SearchCompleted {
            root: request.key,
            count,
        });
        self.notifier.send(Notification::GraphChanged);
        self.enqueue(Command::CreateSnapshot);
        Ok(())
    }
}
