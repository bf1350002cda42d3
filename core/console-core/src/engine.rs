//! ConsoleEngine - drives polling for the overview tree.
//!
//! The engine is single-threaded and never blocks. Requests go out through a
//! [`NodeTransport`]; the caller feeds responses back with [`ConsoleEngine::deliver`]
//! and fired timers with [`ConsoleEngine::on_timer`]. Every published tree is a
//! fresh snapshot.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let mut engine = ConsoleEngine::new(config, transport, timers, sink);
//! engine.set_nodes(node_ids);
//! engine.start();
//! // later, from the event loop:
//! engine.deliver(ticket, response);
//! engine.on_timer(token);
//! engine.activate_key("Addresses");
//! ```

use crate::builder::{self, CategoryView, LeafDetail, Publication, RouterDetailHandler, Step};
use crate::config::ConsoleConfig;
use crate::fanout::{FanOutCollector, JobScope, NodeTransport, RequestTicket};
use crate::registry::NodeRegistry;
use crate::scheduler::{RefreshScheduler, TimerDriver, TimerToken};
use crate::view::{Category, DetailView, Refresh, ViewKind, ViewNode, ViewRecord, ViewSink, ViewTree};
use chrono::Utc;
use console_protocol::{NodeId, QueryResponse};
use std::collections::HashMap;
use std::sync::Arc;

/// Fields hidden from the address detail grid.
const ADDRESS_DETAIL_HIDDEN: [&str; 2] = ["title", "uid"];

pub struct ConsoleEngine<T: NodeTransport, D: TimerDriver, S: ViewSink> {
    config: ConsoleConfig,
    registry: NodeRegistry,
    collector: FanOutCollector<Step>,
    scheduler: RefreshScheduler<D>,
    transport: T,
    sink: S,
    tree: Arc<ViewTree>,
    /// Generation of the last view poll that published each category.
    published: HashMap<Category, u64>,
    router_rows: Vec<ViewRecord>,
}

impl<T: NodeTransport, D: TimerDriver, S: ViewSink> ConsoleEngine<T, D, S> {
    pub fn new(config: ConsoleConfig, transport: T, timers: D, sink: S) -> Self {
        let scheduler = RefreshScheduler::new(timers, config.refresh_interval());
        let tree = Arc::new(ViewTree::new(&categories(&config)));
        Self {
            config,
            registry: NodeRegistry::default(),
            collector: FanOutCollector::new(),
            scheduler,
            transport,
            sink,
            tree,
            published: HashMap::new(),
            router_rows: Vec::new(),
        }
    }

    /// Replaces the node registry and rebuilds the router leaves.
    ///
    /// Jobs already in flight keep the snapshot they started with.
    pub fn set_nodes(&mut self, nodes: Vec<NodeId>) {
        self.registry.replace(nodes);
        let leaves = builder::router_leaves(&self.registry.snapshot());
        self.replace_children(Category::Routers, leaves);
    }

    /// Publishes the initial tree, populates every category once, then
    /// starts refreshing the Routers view.
    pub fn start(&mut self) {
        self.sink.publish_tree(Arc::clone(&self.tree));
        for category in categories(&self.config) {
            if category == Category::Routers {
                continue;
            }
            let step = builder::poll(category, self.registry.snapshot());
            self.drive(JobScope::Bootstrap, step);
        }
        self.activate_category(Category::Routers);
    }

    /// Handles a tree selection from the UI.
    pub fn activate_key(&mut self, key: &str) {
        if let Some(category) = Category::from_key(key) {
            if self.tree.has_category(category) {
                self.activate_category(category);
            } else {
                tracing::warn!(key, "Activated category is not part of the tree");
            }
            return;
        }

        let Some(node) = self.tree.find(key).cloned() else {
            tracing::warn!(key, "Activated key not found in tree");
            return;
        };
        self.activate_leaf(node);
    }

    /// Feeds one node response back to its job.
    pub fn deliver(&mut self, ticket: RequestTicket, response: QueryResponse) {
        if let Some((scope, step)) = self.collector.deliver(ticket, response) {
            self.drive(scope, step);
        }
    }

    pub fn on_timer(&mut self, token: TimerToken) {
        if let Some((category, generation)) = self.scheduler.timer_fired(token) {
            self.collector.retire_stale(generation);
            let step = builder::poll(category, self.registry.snapshot());
            self.drive(JobScope::View { generation }, step);
        }
    }

    /// Stops refreshing and drops every job still waiting for responses.
    pub fn shutdown(&mut self) {
        self.scheduler.deactivate();
        let retired = self.collector.retire_all();
        tracing::info!(retired, "Console engine shut down");
    }

    pub fn tree(&self) -> Arc<ViewTree> {
        Arc::clone(&self.tree)
    }

    pub fn scheduler(&self) -> &RefreshScheduler<D> {
        &self.scheduler
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn pending_jobs(&self) -> usize {
        self.collector.pending_jobs()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn activate_category(&mut self, category: Category) {
        let generation = self.scheduler.activate(category);
        let retired = self.collector.retire_stale(generation);
        if retired > 0 {
            tracing::debug!(retired, generation, "Stale poll jobs retired");
        }
        let step = builder::poll(category, self.registry.snapshot());
        self.drive(JobScope::View { generation }, step);
    }

    fn activate_leaf(&mut self, node: ViewNode) {
        if let Refresh::Recurring(category) = node.refresh {
            self.activate_category(category);
            return;
        }

        let generation = self.scheduler.deactivate();
        self.collector.retire_stale(generation);
        let scope = JobScope::View { generation };

        match node.refresh.clone() {
            Refresh::RouterDetail(node_id) => {
                let summary = self
                    .router_rows
                    .iter()
                    .find(|row| row.get_str("routerId") == Some(node.title.as_str()))
                    .cloned();
                let step = Step::query(
                    RouterDetailHandler::plan(&node_id),
                    RouterDetailHandler::new(&node_id, summary),
                );
                self.drive(scope, step);
            }
            Refresh::AddressDetail => {
                self.publish_fields(generation, node, &ADDRESS_DETAIL_HIDDEN);
            }
            Refresh::ConnectionDetail => {
                self.publish_fields(generation, node, &[]);
            }
            Refresh::LogDetail => {
                let rows = vec![ViewRecord::new()
                    .with("attribute", "name")
                    .with("value", node.title.as_str())];
                self.apply_leaf(
                    generation,
                    LeafDetail {
                        key: node.key,
                        kind: ViewKind::Log,
                        rows,
                    },
                );
            }
            Refresh::Recurring(_) => {}
        }
    }

    fn publish_fields(&mut self, generation: u64, node: ViewNode, excluded: &[&str]) {
        let rows = node
            .fields
            .as_ref()
            .map(|fields| fields.attribute_rows(excluded))
            .unwrap_or_default();
        self.apply_leaf(
            generation,
            LeafDetail {
                key: node.key,
                kind: node.kind,
                rows,
            },
        );
    }

    /// Runs a step chain until it waits on responses or publishes.
    fn drive(&mut self, scope: JobScope, mut step: Step) {
        loop {
            if !self.is_live(scope) {
                tracing::debug!(scope = ?scope, "Stale poll result discarded");
                return;
            }
            match step {
                Step::Query { plan, handler } => {
                    match self.collector.collect(&mut self.transport, plan, scope, handler) {
                        Some(next) => step = next,
                        None => return,
                    }
                }
                Step::Publish(Publication::Category(view)) => {
                    self.apply_category(scope, view);
                    return;
                }
                Step::Publish(Publication::Leaf(detail)) => {
                    if let JobScope::View { generation } = scope {
                        self.apply_leaf(generation, detail);
                    }
                    return;
                }
            }
        }
    }

    fn is_live(&self, scope: JobScope) -> bool {
        match scope {
            JobScope::View { generation } => self.scheduler.is_current(generation),
            JobScope::Bootstrap => true,
        }
    }

    fn apply_category(&mut self, scope: JobScope, view: CategoryView) {
        let CategoryView {
            category,
            children,
            rows,
        } = view;

        match scope {
            JobScope::Bootstrap => {
                if self.published.contains_key(&category) {
                    tracing::debug!(category = category.key(), "Bootstrap result superseded");
                    return;
                }
                if let Some(children) = children {
                    self.replace_children(category, children);
                }
            }
            JobScope::View { generation } => {
                self.published.insert(category, generation);
                if let Some(children) = children {
                    self.replace_children(category, children);
                }
                if category == Category::Routers {
                    self.router_rows = rows.clone();
                }
                self.sink.publish_detail(DetailView {
                    key: category.key().to_string(),
                    kind: category.kind(),
                    generation,
                    published_at: Utc::now(),
                    rows,
                });
                self.scheduler.poll_completed(generation);
            }
        }
    }

    fn apply_leaf(&mut self, generation: u64, detail: LeafDetail) {
        if !self.scheduler.is_current(generation) {
            return;
        }
        self.sink.publish_detail(DetailView {
            key: detail.key,
            kind: detail.kind,
            generation,
            published_at: Utc::now(),
            rows: detail.rows,
        });
    }

    fn replace_children(&mut self, category: Category, children: Vec<ViewNode>) {
        if !self.tree.has_category(category) {
            return;
        }
        let next = self.tree.with_category_children(category, children);
        self.tree = Arc::new(next);
        self.sink.publish_tree(Arc::clone(&self.tree));
    }
}

fn categories(config: &ConsoleConfig) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|category| *category != Category::Logs || config.tree.show_logs)
        .collect()
}
