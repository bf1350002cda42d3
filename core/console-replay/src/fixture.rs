//! Recorded node responses, loaded from a JSON file.
//!
//! ```json
//! {
//!   "nodes": ["amqp:/_topo/0/R1/$management"],
//!   "responses": {
//!     "amqp:/_topo/0/R1/$management": {
//!       "log": { "attributeNames": ["name"], "results": [["ROUTER"]] }
//!     }
//!   },
//!   "aggregates": {
//!     "router": { "attributeNames": ["routerId"], "aggregates": [[{ "sum": "R1" }]] }
//!   }
//! }
//! ```

use console_core::{ConsoleError, RequestTicket, Result};
use console_protocol::{NodeId, QueryRequest, QueryResponse};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    pub nodes: Vec<NodeId>,
    /// Per-node responses, keyed by node id then entity.
    #[serde(default)]
    pub responses: BTreeMap<String, BTreeMap<String, QueryResponse>>,
    /// Aggregate responses, keyed by entity.
    #[serde(default)]
    pub aggregates: BTreeMap<String, QueryResponse>,
}

impl Fixture {
    /// The recorded answer for `request`, or an empty response when nothing
    /// was recorded for it.
    pub fn respond(&self, ticket: &RequestTicket, request: &QueryRequest) -> QueryResponse {
        let recorded = if request.is_aggregate() {
            self.aggregates.get(&request.entity)
        } else {
            self.responses
                .get(ticket.node.as_str())
                .and_then(|entities| entities.get(&request.entity))
        };
        match recorded {
            Some(response) => response.clone(),
            None => {
                tracing::debug!(
                    node = %ticket.node,
                    entity = %request.entity,
                    "No recorded response; answering empty"
                );
                QueryResponse::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let known: BTreeSet<&str> = self.nodes.iter().map(NodeId::as_str).collect();
        if let Some(unknown) = self
            .responses
            .keys()
            .find(|node| !known.contains(node.as_str()))
        {
            return Err(ConsoleError::FixtureInvalid(format!(
                "responses recorded for unlisted node {unknown}"
            )));
        }
        Ok(())
    }
}

pub fn load_fixture(path: &Path) -> Result<Fixture> {
    let contents = fs_err::read_to_string(path).map_err(|source| ConsoleError::Io {
        context: format!("reading fixture {}", path.display()),
        source,
    })?;
    let fixture: Fixture = serde_json::from_str(&contents).map_err(|source| ConsoleError::Json {
        context: format!("parsing fixture {}", path.display()),
        source,
    })?;
    fixture.validate()?;
    Ok(fixture)
}
