//! Per-category view-model builders.
//!
//! Each poll is a chain of [`Step`]s: a fan-out query whose handler returns
//! the next step, ending in a [`Publication`]. Handlers never touch published
//! state; the engine applies the publication after checking it is still
//! current.

mod addresses;
mod connections;
mod logs;
mod routers;

pub use addresses::{AddressRow, AddressesHandler, ADDRESS_ENTITY};
pub use connections::{
    classify_authentication, classify_security, mechanism_label, ConnectionsHandler,
    CONNECTION_ENTITY,
};
pub use logs::{LogsHandler, LOG_ENTITY};
pub use routers::{
    router_leaves, RouterAggregateHandler, RouterDetailHandler, RouterSummaryHandler,
    ROUTER_ENTITY,
};

use crate::fanout::{FanOutHandler, QueryPlan};
use crate::view::{Category, ViewKind, ViewNode, ViewRecord};
use console_protocol::NodeId;
use std::sync::Arc;

/// What a completed handler asks the engine to do next.
pub enum Step {
    Query {
        plan: QueryPlan,
        handler: Box<dyn FanOutHandler<Output = Step>>,
    },
    Publish(Publication),
}

impl Step {
    pub fn query(plan: QueryPlan, handler: impl FanOutHandler<Output = Step> + 'static) -> Self {
        Step::Query {
            plan,
            handler: Box::new(handler),
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Query { plan, .. } => f.debug_struct("Query").field("plan", plan).finish(),
            Step::Publish(publication) => f.debug_tuple("Publish").field(publication).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    Category(CategoryView),
    Leaf(LeafDetail),
}

/// A category's refreshed children and grid rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub category: Category,
    /// `None` keeps the current children (Routers are fixed per registry snapshot).
    pub children: Option<Vec<ViewNode>>,
    pub rows: Vec<ViewRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafDetail {
    pub key: String,
    pub kind: ViewKind,
    pub rows: Vec<ViewRecord>,
}

/// First step of one poll of `category` over `nodes`.
pub fn poll(category: Category, nodes: Arc<[NodeId]>) -> Step {
    match category {
        Category::Routers => Step::query(
            QueryPlan::per_node(Arc::clone(&nodes), CONNECTION_ENTITY, &["role"]),
            RouterSummaryHandler::new(nodes),
        ),
        Category::Addresses => Step::query(
            QueryPlan::aggregate(nodes, ADDRESS_ENTITY),
            AddressesHandler,
        ),
        Category::Connections => Step::query(
            QueryPlan::per_node(nodes, CONNECTION_ENTITY, &[]),
            ConnectionsHandler::default(),
        ),
        Category::Logs => Step::query(
            QueryPlan::per_node(nodes, LOG_ENTITY, &["name"]),
            LogsHandler::default(),
        ),
    }
}
