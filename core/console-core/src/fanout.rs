//! Fan-out/fan-in collection of per-node query responses.
//!
//! A job sends one request per node of a registry snapshot and completes
//! exactly once, when every node has answered. Responses arrive in any order.
//! A job over zero nodes completes synchronously inside [`FanOutCollector::collect`].
//!
//! There is no timeout: a node that never answers leaves its job pending until
//! the owner retires it (see [`FanOutCollector::retire_stale`]).

use console_protocol::{NodeId, QueryRequest, QueryResponse};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Per-node responses of a completed job.
pub type Accumulator = BTreeMap<NodeId, QueryResponse>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Routing key a transport hands back with each response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub job: JobId,
    pub node: NodeId,
}

/// Delivers query requests to nodes. Responses come back through
/// [`FanOutCollector::deliver`] with the same ticket.
pub trait NodeTransport {
    fn send(&mut self, ticket: RequestTicket, request: QueryRequest);
}

/// Who a job's result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobScope {
    /// One-shot population of the tree at startup.
    Bootstrap,
    /// A poll started under a scheduler generation.
    View { generation: u64 },
}

/// Receives the responses of one job.
pub trait FanOutHandler {
    type Output;

    fn on_each_node(&mut self, _node: &NodeId, _response: &QueryResponse) {}

    /// Consumes the handler, so completion can only happen once.
    fn on_complete(self: Box<Self>, accumulator: Accumulator) -> Self::Output;
}

/// The requests a job sends.
#[derive(Debug, Clone)]
pub enum QueryPlan {
    /// One request per node.
    PerNode {
        nodes: Arc<[NodeId]>,
        entity: String,
        attribute_names: Vec<String>,
    },
    /// One aggregate request over every node, routed through the first.
    Aggregate { nodes: Arc<[NodeId]>, entity: String },
}

impl QueryPlan {
    pub fn per_node(nodes: Arc<[NodeId]>, entity: &str, attribute_names: &[&str]) -> Self {
        QueryPlan::PerNode {
            nodes,
            entity: entity.to_string(),
            attribute_names: attribute_names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn aggregate(nodes: Arc<[NodeId]>, entity: &str) -> Self {
        QueryPlan::Aggregate {
            nodes,
            entity: entity.to_string(),
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            QueryPlan::PerNode { entity, .. } | QueryPlan::Aggregate { entity, .. } => entity,
        }
    }

    fn requests(&self) -> Vec<(NodeId, QueryRequest)> {
        match self {
            QueryPlan::PerNode {
                nodes,
                entity,
                attribute_names,
            } => nodes
                .iter()
                .map(|node| {
                    let request = QueryRequest {
                        target: console_protocol::QueryTarget::Node(node.clone()),
                        entity: entity.clone(),
                        attribute_names: attribute_names.clone(),
                    };
                    (node.clone(), request)
                })
                .collect(),
            QueryPlan::Aggregate { nodes, entity } => match nodes.first() {
                Some(via) => vec![(
                    via.clone(),
                    QueryRequest::aggregate(nodes.to_vec(), via.clone(), entity),
                )],
                None => Vec::new(),
            },
        }
    }
}

pub struct FanOutJob<O> {
    scope: JobScope,
    entity: String,
    expected: usize,
    received: usize,
    awaiting: HashSet<NodeId>,
    accumulator: Accumulator,
    handler: Option<Box<dyn FanOutHandler<Output = O>>>,
}

impl<O> FanOutJob<O> {
    pub fn scope(&self) -> JobScope {
        self.scope
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    fn receive(&mut self, node: NodeId, response: QueryResponse) -> Option<O> {
        if !self.awaiting.remove(&node) {
            return None;
        }
        self.received += 1;
        if let Some(handler) = self.handler.as_mut() {
            handler.on_each_node(&node, &response);
        }
        self.accumulator.insert(node, response);

        if self.received < self.expected {
            return None;
        }
        let handler = self.handler.take()?;
        Some(handler.on_complete(std::mem::take(&mut self.accumulator)))
    }
}

impl<O> fmt::Debug for FanOutJob<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutJob")
            .field("scope", &self.scope)
            .field("entity", &self.entity)
            .field("expected", &self.expected)
            .field("received", &self.received)
            .finish()
    }
}

/// Owns every job that is still waiting for responses.
pub struct FanOutCollector<O> {
    jobs: HashMap<JobId, FanOutJob<O>>,
    next_id: u64,
}

impl<O> Default for FanOutCollector<O> {
    fn default() -> Self {
        Self {
            jobs: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<O> FanOutCollector<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a job. Returns the handler's output right away when the plan
    /// has no nodes to ask.
    pub fn collect(
        &mut self,
        transport: &mut dyn NodeTransport,
        plan: QueryPlan,
        scope: JobScope,
        handler: Box<dyn FanOutHandler<Output = O>>,
    ) -> Option<O> {
        self.next_id += 1;
        let id = JobId(self.next_id);
        let requests = plan.requests();

        if requests.is_empty() {
            tracing::debug!(job = %id, entity = plan.entity(), "Fan-out over no nodes; completing");
            return Some(handler.on_complete(Accumulator::new()));
        }

        let job = FanOutJob {
            scope,
            entity: plan.entity().to_string(),
            expected: requests.len(),
            received: 0,
            awaiting: requests.iter().map(|(node, _)| node.clone()).collect(),
            accumulator: Accumulator::new(),
            handler: Some(handler),
        };
        tracing::debug!(
            job = %id,
            entity = plan.entity(),
            expected = job.expected,
            scope = ?scope,
            "Fan-out job started"
        );
        self.jobs.insert(id, job);

        for (node, request) in requests {
            transport.send(RequestTicket { job: id, node }, request);
        }
        None
    }

    /// Records one response. Returns the job's scope and output when this
    /// response completes it.
    pub fn deliver(
        &mut self,
        ticket: RequestTicket,
        response: QueryResponse,
    ) -> Option<(JobScope, O)> {
        let RequestTicket { job: id, node } = ticket;
        let Some(job) = self.jobs.get_mut(&id) else {
            tracing::debug!(job = %id, node = %node, "Response for retired job dropped");
            return None;
        };

        if !job.awaiting.contains(&node) {
            tracing::warn!(
                job = %id,
                node = %node,
                entity = %job.entity,
                "Unexpected or duplicate response ignored"
            );
            return None;
        }

        let output = job.receive(node, response);
        match output {
            Some(output) => {
                let scope = job.scope;
                tracing::debug!(job = %id, entity = %job.entity, received = job.received, "Fan-out job complete");
                self.jobs.remove(&id);
                Some((scope, output))
            }
            None => None,
        }
    }

    /// Drops view jobs started before `generation`. Their late responses
    /// become inert.
    pub fn retire_stale(&mut self, generation: u64) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.scope {
            JobScope::View { generation: job_generation } => job_generation >= generation,
            JobScope::Bootstrap => true,
        });
        before - self.jobs.len()
    }

    pub fn retire_all(&mut self) -> usize {
        let count = self.jobs.len();
        self.jobs.clear();
        count
    }

    pub fn job(&self, id: JobId) -> Option<&FanOutJob<O>> {
        self.jobs.get(&id)
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }
}
