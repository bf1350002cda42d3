use super::{CategoryView, Publication, Step};
use crate::fanout::{Accumulator, FanOutHandler};
use crate::view::{value_text, Category, Refresh, ViewKind, ViewNode, ViewRecord};
use console_protocol::{NodeId, QueryResponse};
use std::collections::BTreeSet;

pub const LOG_ENTITY: &str = "log";

/// Log module names across every node, duplicates collapsed.
#[derive(Default)]
pub struct LogsHandler {
    names: BTreeSet<String>,
}

impl FanOutHandler for LogsHandler {
    type Output = Step;

    fn on_each_node(&mut self, _node: &NodeId, response: &QueryResponse) {
        for row in &response.results {
            if let Some(name) = response.value_for(row, "name") {
                self.names.insert(value_text(name));
            }
        }
    }

    fn on_complete(self: Box<Self>, _accumulator: Accumulator) -> Step {
        let rows = self
            .names
            .iter()
            .map(|name| {
                let mut record = ViewRecord::new().with("name", name.as_str());
                record.title = name.clone();
                record
            })
            .collect();
        let children = self
            .names
            .into_iter()
            .map(|name| ViewNode::leaf(ViewKind::Log, name.clone(), name, Refresh::LogDetail))
            .collect();
        Step::Publish(Publication::Category(CategoryView {
            category: Category::Logs,
            children: Some(children),
            rows,
        }))
    }
}
