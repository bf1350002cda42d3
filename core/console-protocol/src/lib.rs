//! Query protocol types for the router console.
//!
//! Shared by the console core and whatever transport delivers node responses,
//! so both sides agree on the request/response shape. The transport itself is
//! not part of this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One positionally-aligned row of a per-node query response.
pub type Row = Vec<Value>;

/// One row of a cross-node aggregate response.
pub type AggregateRow = Vec<AggregateValue>;

/// Opaque identifier of one router node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Router name embedded in a management address.
    ///
    /// `amqp:/_topo/0/Router.A/$management` yields `Router.A`. Ids with fewer
    /// segments are returned whole.
    pub fn router_name(&self) -> &str {
        self.0.split('/').nth(3).unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTarget {
    /// Rows from a single node.
    Node(NodeId),
    /// Summed rows across `nodes`, computed by the node `via`.
    Aggregate { nodes: Vec<NodeId>, via: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub target: QueryTarget,
    pub entity: String,
    /// Empty means every attribute.
    #[serde(default)]
    pub attribute_names: Vec<String>,
}

impl QueryRequest {
    pub fn node(node: NodeId, entity: &str, attribute_names: &[&str]) -> Self {
        Self {
            target: QueryTarget::Node(node),
            entity: entity.to_string(),
            attribute_names: attribute_names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn aggregate(nodes: Vec<NodeId>, via: NodeId, entity: &str) -> Self {
        Self {
            target: QueryTarget::Aggregate { nodes, via },
            entity: entity.to_string(),
            attribute_names: Vec::new(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.target, QueryTarget::Aggregate { .. })
    }
}

/// A summed attribute value produced by an aggregate query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateValue {
    pub sum: Value,
}

impl AggregateValue {
    pub fn new(sum: impl Into<Value>) -> Self {
        Self { sum: sum.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub attribute_names: Vec<String>,
    #[serde(default)]
    pub results: Vec<Row>,
    #[serde(default)]
    pub aggregates: Vec<AggregateRow>,
}

impl QueryResponse {
    pub fn with_results(attribute_names: &[&str], results: Vec<Row>) -> Self {
        Self {
            attribute_names: attribute_names.iter().map(|name| name.to_string()).collect(),
            results,
            aggregates: Vec::new(),
        }
    }

    pub fn with_aggregates(attribute_names: &[&str], aggregates: Vec<AggregateRow>) -> Self {
        Self {
            attribute_names: attribute_names.iter().map(|name| name.to_string()).collect(),
            results: Vec::new(),
            aggregates,
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.attribute_names.iter().position(|attr| attr == name)
    }

    pub fn value_for<'a>(&self, row: &'a Row, name: &str) -> Option<&'a Value> {
        value_for(&self.attribute_names, row, name)
    }

    /// The `sum` of `name` in an aggregate row.
    pub fn sum_for<'a>(&self, row: &'a AggregateRow, name: &str) -> Option<&'a Value> {
        value_for(&self.attribute_names, row, name).map(|value| &value.sum)
    }
}

/// Looks up the value aligned with `name` in `row`.
pub fn value_for<'a, T>(attribute_names: &[String], row: &'a [T], name: &str) -> Option<&'a T> {
    let index = attribute_names.iter().position(|attr| attr == name)?;
    row.get(index)
}
