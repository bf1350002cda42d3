use super::{CategoryView, Publication, Step};
use crate::fanout::{Accumulator, FanOutHandler};
use crate::view::{truthy, value_text, Category, Refresh, ViewKind, ViewNode, ViewRecord};
use console_protocol::{value_for, NodeId, QueryResponse};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CONNECTION_ENTITY: &str = "connection";

const INTER_ROUTER_ROLE: &str = "inter-router";

/// Display name of a SASL mechanism.
pub fn mechanism_label(mechanism: &str) -> &str {
    match mechanism {
        "GSSAPI" => "Kerberos",
        "EXTERNAL" => "x.509",
        other => other,
    }
}

pub fn classify_authentication(
    authenticated: bool,
    mechanism: Option<&str>,
    user: Option<&str>,
) -> String {
    if !authenticated {
        return "no_auth".to_string();
    }
    match mechanism {
        Some("ANONYMOUS") => "anonymous-user".to_string(),
        other => format!(
            "{}({})",
            user.unwrap_or("-"),
            mechanism_label(other.unwrap_or("-"))
        ),
    }
}

pub fn classify_security(
    encrypted: bool,
    mechanism: Option<&str>,
    protocol: Option<&str>,
    cipher: Option<&str>,
) -> String {
    if !encrypted {
        return "no-security".to_string();
    }
    if mechanism == Some("GSSAPI") {
        return "Kerberos".to_string();
    }
    format!("{}({})", protocol.unwrap_or("-"), cipher.unwrap_or("-"))
}

fn text_for<'a>(names: &[String], row: &'a [Value], name: &str) -> Option<&'a str> {
    value_for(names, row, name).and_then(Value::as_str)
}

/// Collapses connections from every node by host; the last row seen for a
/// host wins.
#[derive(Default)]
pub struct ConnectionsHandler {
    by_host: BTreeMap<String, ViewRecord>,
}

impl ConnectionsHandler {
    fn record(response: &QueryResponse, row: &[Value]) -> ViewRecord {
        let names = &response.attribute_names;
        let mechanism = text_for(names, row, "sasl");
        let authentication = classify_authentication(
            truthy(value_for(names, row, "isAuthenticated")),
            mechanism,
            text_for(names, row, "user"),
        );
        let security = classify_security(
            truthy(value_for(names, row, "isEncrypted")),
            mechanism,
            text_for(names, row, "sslProto"),
            text_for(names, row, "sslCipher"),
        );

        let mut record = ViewRecord::new();
        for (name, value) in response.attribute_names.iter().zip(row) {
            record.set(name, value.clone());
        }
        record.set("security", security);
        record.set("authentication", authentication);
        record
    }
}

impl FanOutHandler for ConnectionsHandler {
    type Output = Step;

    fn on_each_node(&mut self, _node: &NodeId, response: &QueryResponse) {
        for row in &response.results {
            let host = response
                .value_for(row, "host")
                .map(value_text)
                .unwrap_or_default();
            let mut record = Self::record(response, row);
            record.title = host.clone();
            self.by_host.insert(host, record);
        }
    }

    fn on_complete(self: Box<Self>, _accumulator: Accumulator) -> Step {
        let mut children = Vec::with_capacity(self.by_host.len());
        let mut rows = Vec::with_capacity(self.by_host.len());
        for (host, record) in self.by_host {
            let tooltip = if record.get_str("role") == Some(INTER_ROUTER_ROLE) {
                "inter-router connection"
            } else {
                "external connection"
            };
            rows.push(record.clone());
            children.push(
                ViewNode::leaf(ViewKind::Connection, host.clone(), host, Refresh::ConnectionDetail)
                    .with_fields(record)
                    .with_tooltip(tooltip),
            );
        }
        Step::Publish(Publication::Category(CategoryView {
            category: Category::Connections,
            children: Some(children),
            rows,
        }))
    }
}
