//! View model published to the tree/grid boundary.
//!
//! The tree is an immutable snapshot: every refresh builds a new [`ViewTree`]
//! and hands it to the [`ViewSink`] behind an `Arc`. Nothing edits a published
//! tree in place.

use chrono::{DateTime, Utc};
use console_protocol::NodeId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

pub const ROOT_TITLE: &str = "Overview";

/// Top-level categories of the overview tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Routers,
    Addresses,
    Connections,
    Logs,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Routers,
        Category::Addresses,
        Category::Connections,
        Category::Logs,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Routers => "Routers",
            Category::Addresses => "Addresses",
            Category::Connections => "Connections",
            Category::Logs => "Logs",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|category| category.key() == key)
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            Category::Routers => ViewKind::Routers,
            Category::Addresses => ViewKind::Addresses,
            Category::Connections => ViewKind::Connections,
            Category::Logs => ViewKind::Logs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViewKind {
    Routers,
    Router,
    Addresses,
    Address,
    Connections,
    Connection,
    Logs,
    Log,
}

/// The routine a node runs when the UI activates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    /// Polls the category every refresh interval.
    Recurring(Category),
    /// One single-node fetch, no recurring refresh.
    RouterDetail(NodeId),
    AddressDetail,
    ConnectionDetail,
    LogDetail,
}

impl Refresh {
    pub fn is_recurring(&self) -> bool {
        matches!(self, Refresh::Recurring(_))
    }
}

/// One row of category results, with the title used for tree labels.
///
/// Fields keep insertion order; setting an existing field overwrites it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRecord {
    pub title: String,
    fields: Vec<(String, Value)>,
}

impl ViewRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One `{attribute, value}` record per field, skipping `excluded` names.
    pub fn attribute_rows(&self, excluded: &[&str]) -> Vec<ViewRecord> {
        self.fields()
            .filter(|(name, _)| !excluded.contains(name))
            .map(|(name, value)| {
                ViewRecord::new()
                    .with("attribute", name)
                    .with("value", value.clone())
            })
            .collect()
    }
}

impl Serialize for ViewRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("title", &self.title)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub title: String,
    pub kind: ViewKind,
    pub key: String,
    pub children: Vec<ViewNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ViewRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub refresh: Refresh,
}

impl ViewNode {
    pub fn category(category: Category, children: Vec<ViewNode>) -> Self {
        Self {
            title: category.key().to_string(),
            kind: category.kind(),
            key: category.key().to_string(),
            children,
            fields: None,
            tooltip: None,
            refresh: Refresh::Recurring(category),
        }
    }

    pub fn leaf(kind: ViewKind, title: impl Into<String>, key: impl Into<String>, refresh: Refresh) -> Self {
        Self {
            title: title.into(),
            kind,
            key: key.into(),
            children: Vec::new(),
            fields: None,
            tooltip: None,
            refresh,
        }
    }

    pub fn with_fields(mut self, fields: ViewRecord) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    fn find(&self, key: &str) -> Option<&ViewNode> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(key))
    }
}

/// Root of the published tree. Owns the top-level categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewTree {
    pub title: String,
    pub revision: u64,
    pub published_at: DateTime<Utc>,
    pub children: Vec<ViewNode>,
}

impl ViewTree {
    pub fn new(categories: &[Category]) -> Self {
        Self {
            title: ROOT_TITLE.to_string(),
            revision: 0,
            published_at: Utc::now(),
            children: categories
                .iter()
                .map(|category| ViewNode::category(*category, Vec::new()))
                .collect(),
        }
    }

    pub fn find(&self, key: &str) -> Option<&ViewNode> {
        self.children.iter().find_map(|child| child.find(key))
    }

    pub fn category(&self, category: Category) -> Option<&ViewNode> {
        self.children
            .iter()
            .find(|node| node.refresh == Refresh::Recurring(category))
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.category(category).is_some()
    }

    /// A new tree with `category`'s children replaced.
    pub fn with_category_children(&self, category: Category, children: Vec<ViewNode>) -> ViewTree {
        let mut next = ViewTree {
            title: self.title.clone(),
            revision: self.revision + 1,
            published_at: Utc::now(),
            children: self.children.clone(),
        };
        if let Some(node) = next
            .children
            .iter_mut()
            .find(|node| node.refresh == Refresh::Recurring(category))
        {
            node.children = children;
        }
        next
    }
}

/// Grid contents for the activated category or leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub key: String,
    pub kind: ViewKind,
    pub generation: u64,
    pub published_at: DateTime<Utc>,
    pub rows: Vec<ViewRecord>,
}

/// The external tree/grid collaborator.
pub trait ViewSink {
    fn publish_tree(&mut self, tree: Arc<ViewTree>);
    fn publish_detail(&mut self, detail: DetailView);
}

/// Display text of a protocol value; strings are unquoted.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness of a protocol value.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Counter formatting with thousands separators.
pub fn pretty(value: &Value) -> String {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                group_thousands(n.unsigned_abs(), n < 0)
            } else if let Some(n) = number.as_u64() {
                group_thousands(n, false)
            } else {
                number.to_string()
            }
        }
        other => value_text(other),
    }
}

fn group_thousands(magnitude: u64, negative: bool) -> String {
    let digits = magnitude.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
