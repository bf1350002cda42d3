use super::{CategoryView, LeafDetail, Publication, Step};
use crate::fanout::{Accumulator, FanOutHandler, QueryPlan};
use crate::merge::merge_into_records;
use crate::view::{value_text, Category, Refresh, ViewKind, ViewNode, ViewRecord};
use console_protocol::{NodeId, QueryResponse};
use std::sync::Arc;

pub const ROUTER_ENTITY: &str = "router";

const INTER_ROUTER_ROLE: &str = "inter-router";
const ROUTER_ID: &str = "routerId";

/// Router leaves are fixed for the lifetime of a registry snapshot.
pub fn router_leaves(nodes: &[NodeId]) -> Vec<ViewNode> {
    nodes
        .iter()
        .map(|node| {
            ViewNode::leaf(
                ViewKind::Router,
                node.router_name(),
                node.as_str(),
                Refresh::RouterDetail(node.clone()),
            )
        })
        .collect()
}

/// Counts external connections per node, then chains the `router` aggregate.
pub struct RouterSummaryHandler {
    nodes: Arc<[NodeId]>,
    rows: Vec<ViewRecord>,
}

impl RouterSummaryHandler {
    pub fn new(nodes: Arc<[NodeId]>) -> Self {
        Self {
            nodes,
            rows: Vec::new(),
        }
    }
}

impl FanOutHandler for RouterSummaryHandler {
    type Output = Step;

    fn on_each_node(&mut self, node: &NodeId, response: &QueryResponse) {
        let external = response
            .results
            .iter()
            .filter(|row| {
                response
                    .value_for(row, "role")
                    .and_then(|role| role.as_str())
                    != Some(INTER_ROUTER_ROLE)
            })
            .count();
        self.rows.push(
            ViewRecord::new()
                .with(ROUTER_ID, node.router_name())
                .with("connections", external)
                .with("nodeId", node.as_str()),
        );
    }

    fn on_complete(self: Box<Self>, _accumulator: Accumulator) -> Step {
        let Self { nodes, mut rows } = *self;
        rows.sort_by(|left, right| left.get_str(ROUTER_ID).cmp(&right.get_str(ROUTER_ID)));
        Step::query(
            QueryPlan::aggregate(nodes, ROUTER_ENTITY),
            RouterAggregateHandler { rows },
        )
    }
}

/// Attaches router-wide counters to the summary rows.
pub struct RouterAggregateHandler {
    rows: Vec<ViewRecord>,
}

impl FanOutHandler for RouterAggregateHandler {
    type Output = Step;

    fn on_complete(self: Box<Self>, accumulator: Accumulator) -> Step {
        let mut rows = self.rows;
        if let Some(response) = accumulator.values().next() {
            let outcome = merge_into_records(&mut rows, response, ROUTER_ID);
            tracing::debug!(
                matched = outcome.matched,
                dropped = outcome.dropped,
                "Router aggregate merged"
            );
        }
        for row in &mut rows {
            row.title = row.get(ROUTER_ID).map(value_text).unwrap_or_default();
        }
        Step::Publish(Publication::Category(CategoryView {
            category: Category::Routers,
            children: None,
            rows,
        }))
    }
}

/// Single-node fetch behind a router leaf.
pub struct RouterDetailHandler {
    key: String,
    summary: Option<ViewRecord>,
}

impl RouterDetailHandler {
    pub fn new(node: &NodeId, summary: Option<ViewRecord>) -> Self {
        Self {
            key: node.as_str().to_string(),
            summary,
        }
    }

    pub fn plan(node: &NodeId) -> QueryPlan {
        QueryPlan::per_node(Arc::from(vec![node.clone()]), ROUTER_ENTITY, &[])
    }
}

impl FanOutHandler for RouterDetailHandler {
    type Output = Step;

    fn on_complete(self: Box<Self>, accumulator: Accumulator) -> Step {
        let Self { key, summary } = *self;
        let mut merged = summary.unwrap_or_default();
        if let Some(response) = accumulator.values().next() {
            if let Some(row) = response.results.first() {
                for (name, value) in response.attribute_names.iter().zip(row) {
                    merged.set(name, value.clone());
                }
            }
        }
        Step::Publish(Publication::Leaf(LeafDetail {
            key,
            kind: ViewKind::Router,
            rows: merged.attribute_rows(&[]),
        }))
    }
}
