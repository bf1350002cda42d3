//! Known router nodes.
//!
//! The registry is replaced wholesale between poll cycles. Jobs hold an `Arc`
//! snapshot, so a replacement never changes the node set of a job in flight.

use console_protocol::NodeId;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Arc<[NodeId]>,
    revision: u64,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self {
            nodes: Arc::from(Vec::new()),
            revision: 0,
        }
    }
}

impl NodeRegistry {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        let mut registry = Self::default();
        registry.replace(nodes);
        registry
    }

    /// Replaces the node list. Duplicate ids keep their first position.
    pub fn replace(&mut self, nodes: Vec<NodeId>) {
        let mut seen = HashSet::new();
        let unique: Vec<NodeId> = nodes
            .into_iter()
            .filter(|node| seen.insert(node.clone()))
            .collect();
        self.nodes = Arc::from(unique);
        self.revision += 1;
        tracing::info!(
            nodes = self.nodes.len(),
            revision = self.revision,
            "Node registry refreshed"
        );
    }

    pub fn snapshot(&self) -> Arc<[NodeId]> {
        Arc::clone(&self.nodes)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_dedups_and_bumps_revision() {
        let mut registry = NodeRegistry::default();
        assert!(registry.is_empty());
        registry.replace(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.revision(), 1);
        assert_eq!(registry.snapshot()[0], NodeId::from("a"));
    }

    #[test]
    fn snapshot_survives_replacement() {
        let mut registry = NodeRegistry::new(vec!["a".into(), "b".into()]);
        let snapshot = registry.snapshot();
        registry.replace(vec!["c".into()]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.snapshot().len(), 1);
    }
}
