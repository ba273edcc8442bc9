//! Session module: the explicit context every command handler works against.
//!
//! # Module Organization
//!
//! - [`acquire`]: five-stage node acquisition ([`Acquisition`])
//! - [`excursion`]: degree-limited neighbor prefetching ([`Excursion`])
//! - [`search`]: guided search expansion
//! - [`handlers`]: the remaining commands of the dispatch table
//! - [`document`]: save/load documents
//! - [`pending`]: acquisition tickets used for cancellation
//!
//! # Execution model
//!
//! Commands go through a FIFO queue and run one at a time to completion. A handler that needs
//! the data service issues a request whose reply comes back later as another command; replies
//! are awaited with [`Session::poll_reply`] or [`Session::run_until_idle`]. Continuation state
//! travels inside the reply commands, so the queue doubles as a trampoline and no pipeline ever
//! recurses.

use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use std::{
    collections::{BTreeSet, VecDeque},
    future::Future,
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{
    commands::Command,
    config::SessionConfig,
    error::GraphError,
    event::{Notification, Notifier},
    graph::{GraphView, SnapshotManager},
    nodekey::NodeKey,
    store::NodeStore,
    transport::Transport,
};

mod acquire;
mod document;
mod excursion;
mod handlers;
mod pending;
mod search;

pub use acquire::{AcquireStage, Acquisition};
pub use document::{Document, NoteEntry, NotesDocument, DOCUMENT_VERSION};
pub use excursion::{Excursion, ExcursionStage};
pub use pending::{PendingRegistry, Ticket};

pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: Arc<T>,
    notifier: Notifier,
    store: NodeStore,
    graph: GraphView,
    history: SnapshotManager,
    pending: PendingRegistry,
    loading: BTreeSet<String>,
    /// Nodes whose arrival should move the browser focus.
    focus_on_load: BTreeSet<NodeKey>,
    /// Node to select once its acquisition completes.
    select_on_load: Option<NodeKey>,
    tags_in_flight: BTreeSet<NodeKey>,
    queue: VecDeque<Command>,
    in_flight: FuturesUnordered<BoxFuture<'static, Command>>,
    document_id: Uuid,
    last_search_count: Option<usize>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig, transport: T) -> Result<Self, GraphError> {
        config.validate()?;
        let graph = GraphView::new();
        let mut history = SnapshotManager::new(config.snapshot_depth);
        history.reset(&graph);
        Ok(Session {
            config,
            transport: Arc::new(transport),
            notifier: Notifier::silent(),
            store: NodeStore::new(),
            graph,
            history,
            pending: PendingRegistry::default(),
            loading: BTreeSet::new(),
            focus_on_load: BTreeSet::new(),
            select_on_load: None,
            tags_in_flight: BTreeSet::new(),
            queue: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            document_id: Uuid::new_v4(),
            last_search_count: None,
        })
    }

    pub fn with_notifications(mut self, tx: UnboundedSender<Notification>) -> Self {
        self.notifier = Notifier::new(tx);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn graph(&self) -> &GraphView {
        &self.graph
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_pending(&self, key: &NodeKey) -> bool {
        self.pending.contains(key)
    }

    pub fn loading(&self) -> impl Iterator<Item = &String> + '_ {
        self.loading.iter()
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    /// Result counter of the most recent guided search expansion.
    pub fn last_search_count(&self) -> Option<usize> {
        self.last_search_count
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    /// Run `cmd` and everything it enqueues synchronously. Requests it issues stay in flight.
    pub fn submit(&mut self, cmd: Command) -> Result<(), GraphError> {
        self.queue.push_back(cmd);
        self.drain()
    }

    /// Wait for one transport reply and process it. Returns false when nothing is in flight.
    pub async fn poll_reply(&mut self) -> Result<bool, GraphError> {
        match self.in_flight.next().await {
            Some(reply) => {
                self.queue.push_back(reply);
                self.drain()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Process replies until no request is in flight.
    pub async fn run_until_idle(&mut self) -> Result<(), GraphError> {
        while self.poll_reply().await? {}
        Ok(())
    }

    fn drain(&mut self) -> Result<(), GraphError> {
        while let Some(cmd) = self.queue.pop_front() {
            let name = cmd.to_string();
            if let Err(e) = self.dispatch(cmd) {
                if e.is_fatal() {
                    tracing::error!("[Session::drain] {name} failed: {e}");
                    return Err(e);
                }
                self.notifier.failure(format!("{name}: {e}"), None);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, cmd: Command) -> Result<(), GraphError> {
        tracing::debug!("[Session::dispatch] {cmd}");
        match cmd {
            Command::ClickSearchResult { key } => self.click_search_result(key),
            Command::ClickAddress { keyspace, address } => self.click_address(keyspace, address),
            Command::SelectNeighbor {
                neighbor,
                focus,
                outgoing,
            } => self.select_neighbor(neighbor, focus, outgoing),
            Command::AddNode { key, anchor } => self.add_node(key, anchor),
            Command::LoadTags(key) => {
                self.store.require(&key)?;
                self.request_tags(&key);
                Ok(())
            }
            Command::LoadEgonet {
                key,
                outgoing,
                limit,
            } => self.load_egonet(key, outgoing, limit),
            Command::LoadEntityAddresses { entity, limit } => {
                self.load_entity_addresses(entity, limit)
            }
            Command::RemoveEntityAddresses(entity) => self.remove_entity_addresses(entity),
            Command::RemoveNode(key) => self.remove_node(key),
            Command::InputNotes { key, note } => self.input_notes(key, note),
            Command::SetLabels { key, labels } => self.set_labels(key, labels),
            Command::SelectNode(key) => self.select_node(key),
            Command::Deselect => self.deselect(),
            Command::DragNode { key, dx, dy } => self.drag_node(key, dx, dy),
            Command::DragNodeEnd(key) => self.drag_node_end(key),
            Command::SearchNeighbors(request) => self.search_neighbors(request),
            Command::RedrawGraph => {
                self.notifier.send(Notification::GraphChanged);
                Ok(())
            }
            Command::CreateSnapshot => self.create_snapshot(),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::DisableUndoRedo => {
                self.notifier.send(Notification::HistoryChanged {
                    can_undo: false,
                    can_redo: false,
                });
                Ok(())
            }
            Command::Blank => {
                self.document_id = Uuid::new_v4();
                self.reset_workspace(NodeStore::new(), GraphView::new());
                Ok(())
            }
            Command::Load(document) => self.deserialize(*document),
            Command::ResultNode {
                key,
                context,
                result,
            } => self.result_node(key, context, result),
            Command::ResultDetail { key, result } => self.result_detail(key, result),
            Command::ResultTags { key, result } => self.result_tags(key, result),
            Command::ResultEgonet {
                key,
                outgoing,
                result,
            } => self.result_egonet(key, outgoing, result),
            Command::ResultEntityAddresses { entity, result } => {
                self.result_entity_addresses(entity, result)
            }
            Command::ResultSearchNeighbors { request, result } => {
                self.result_search_neighbors(request, result)
            }
            Command::AcquireNode(acquisition) => self.acquire(acquisition),
            Command::DegreeExcursion(excursion) => self.excursion(excursion),
        }
    }

    fn enqueue(&mut self, cmd: Command) {
        self.queue.push_back(cmd);
    }

    /// Issue a transport request. Its result comes back through the queue as `into(result)`.
    fn request<R, F, C>(&mut self, fut: F, into: C)
    where
        R: Send + 'static,
        F: Future<Output = Result<R, GraphError>> + Send + 'static,
        C: FnOnce(Result<R, GraphError>) -> Command + Send + 'static,
    {
        self.in_flight.push(Box::pin(async move { into(fut.await) }));
    }

    fn start_loading(&mut self, label: String) {
        if self.loading.insert(label.clone()) {
            self.notifier.send(Notification::LoadingStarted(label));
        }
    }

    fn stop_loading(&mut self, label: &str) {
        if self.loading.remove(label) {
            self.notifier
                .send(Notification::LoadingStopped(label.to_string()));
        }
    }

    fn history_changed(&self) {
        self.notifier.send(Notification::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    /// Replace the whole workspace. Outstanding requests and queued continuations are dropped
    /// and history restarts from the new graph.
    fn reset_workspace(&mut self, store: NodeStore, graph: GraphView) {
        tracing::debug!(
            "[Session::reset_workspace] dropping {} queued and {} in-flight commands",
            self.queue.len(),
            self.in_flight.len()
        );
        self.queue.clear();
        self.in_flight = FuturesUnordered::new();
        self.pending.clear();
        self.tags_in_flight.clear();
        self.focus_on_load.clear();
        self.select_on_load = None;
        for label in std::mem::take(&mut self.loading) {
            self.notifier.send(Notification::LoadingStopped(label));
        }
        self.store = store;
        self.graph = graph;
        self.history.reset(&self.graph);
        self.notifier.send(Notification::GraphChanged);
        self.history_changed();
    }
}
