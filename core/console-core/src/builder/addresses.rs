use super::{CategoryView, Publication, Step};
use crate::disambiguate::{disambiguate, sort_by_display_text, Labeled};
use crate::fanout::{Accumulator, FanOutHandler};
use crate::identity::{decode_qualified, IdentityRecord};
use crate::view::{pretty, value_text, Category, Refresh, ViewKind, ViewNode, ViewRecord};
use console_protocol::{AggregateRow, QueryResponse};

pub const ADDRESS_ENTITY: &str = "router.address";

const MISSING: &str = "-";

/// Grid column and the aggregate attribute it is read from.
const COUNTER_COLUMNS: [(&str, &str); 8] = [
    ("inproc", "inProcess"),
    ("local", "subscriberCount"),
    ("remote", "remoteCount"),
    ("in", "deliveriesIngress"),
    ("out", "deliveriesEgress"),
    ("thru", "deliveriesTransit"),
    ("toproc", "deliveriesToContainer"),
    ("fromproc", "deliveriesFromContainer"),
];

/// One address with its decoded identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRow {
    pub identity: IdentityRecord,
    pub uid: String,
    pub record: ViewRecord,
}

impl AddressRow {
    fn from_aggregate(response: &QueryResponse, row: &AggregateRow) -> Self {
        let uid = response
            .sum_for(row, "identity")
            .map(value_text)
            .unwrap_or_default();
        let identity = decode_qualified(Some(uid.as_str()));

        let mut record = ViewRecord::new()
            .with("address", identity.display_text.as_str())
            .with("class", identity.class.label().into_owned())
            .with("phase", identity.phase_text());
        for (column, attribute) in COUNTER_COLUMNS {
            let value = response
                .sum_for(row, attribute)
                .map(pretty)
                .unwrap_or_else(|| MISSING.to_string());
            record.set(column, value);
        }
        record.set("uid", uid.as_str());

        Self {
            identity,
            uid,
            record,
        }
    }

    fn into_leaf(self) -> ViewNode {
        ViewNode::leaf(
            ViewKind::Address,
            self.record.title.clone(),
            self.uid,
            Refresh::AddressDetail,
        )
        .with_fields(self.record)
    }
}

impl Labeled for AddressRow {
    fn display_text(&self) -> &str {
        &self.identity.display_text
    }

    fn class_label(&self) -> String {
        self.identity.class.label().into_owned()
    }

    fn set_title(&mut self, title: String) {
        self.record.title = title;
    }
}

/// Decodes, sorts and titles the `router.address` aggregate.
pub struct AddressesHandler;

impl FanOutHandler for AddressesHandler {
    type Output = Step;

    fn on_complete(self: Box<Self>, accumulator: Accumulator) -> Step {
        let mut addresses: Vec<AddressRow> = accumulator
            .values()
            .flat_map(|response| {
                response
                    .aggregates
                    .iter()
                    .map(move |row| AddressRow::from_aggregate(response, row))
            })
            .collect();
        sort_by_display_text(&mut addresses);
        disambiguate(&mut addresses);

        let rows = addresses.iter().map(|address| address.record.clone()).collect();
        let children = addresses.into_iter().map(AddressRow::into_leaf).collect();
        Step::Publish(Publication::Category(CategoryView {
            category: Category::Addresses,
            children: Some(children),
            rows,
        }))
    }
}
