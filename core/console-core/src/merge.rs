//! Merges a cross-node aggregate response into per-router records.
//!
//! Base records decide what is displayed: an aggregate row whose key matches
//! no base record is dropped. Matching is a linear scan per aggregate row,
//! which is fine for networks of tens of routers.

use crate::view::{value_text, ViewRecord};
use console_protocol::QueryResponse;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub matched: usize,
    pub dropped: usize,
}

/// Copies every summed attribute of each aggregate row onto the base record
/// whose key equals the row's `key_attribute` sum.
pub fn merge_aggregates<R, K, A>(
    base: &mut [R],
    response: &QueryResponse,
    key_attribute: &str,
    key_of: K,
    mut assign: A,
) -> MergeOutcome
where
    K: Fn(&R) -> Option<String>,
    A: FnMut(&mut R, &str, &Value),
{
    let mut outcome = MergeOutcome::default();
    for row in &response.aggregates {
        let Some(key) = response.sum_for(row, key_attribute).map(value_text) else {
            outcome.dropped += 1;
            continue;
        };
        let Some(record) = base
            .iter_mut()
            .find(|record| key_of(&**record).as_deref() == Some(key.as_str()))
        else {
            tracing::debug!(key = %key, attribute = key_attribute, "Aggregate row matched no record");
            outcome.dropped += 1;
            continue;
        };
        for (name, value) in response.attribute_names.iter().zip(row) {
            assign(record, name, &value.sum);
        }
        outcome.matched += 1;
    }
    outcome
}

/// [`merge_aggregates`] over view records keyed by the same field name.
pub fn merge_into_records(
    records: &mut [ViewRecord],
    response: &QueryResponse,
    key_attribute: &str,
) -> MergeOutcome {
    merge_aggregates(
        records,
        response,
        key_attribute,
        |record| record.get(key_attribute).map(value_text),
        |record, name, value| record.set(name, value.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_protocol::AggregateValue;
    use serde_json::json;

    fn router(id: &str) -> ViewRecord {
        ViewRecord::new().with("routerId", id).with("connections", 1)
    }

    #[test]
    fn unmatched_aggregate_is_dropped() {
        let mut records = vec![router("A"), router("B"), router("C")];
        let response = QueryResponse::with_aggregates(
            &["routerId", "addrCount", "linkCount"],
            vec![
                vec![
                    AggregateValue::new("A"),
                    AggregateValue::new(4),
                    AggregateValue::new(2),
                ],
                vec![
                    AggregateValue::new("C"),
                    AggregateValue::new(9),
                    AggregateValue::new(3),
                ],
                vec![
                    AggregateValue::new("Z"),
                    AggregateValue::new(1),
                    AggregateValue::new(1),
                ],
            ],
        );

        let outcome = merge_into_records(&mut records, &response, "routerId");
        assert_eq!(outcome, MergeOutcome { matched: 2, dropped: 1 });
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("addrCount"), Some(&json!(4)));
        assert_eq!(records[1].get("addrCount"), None);
        assert_eq!(records[2].get("linkCount"), Some(&json!(3)));
    }

    #[test]
    fn aggregate_overwrites_existing_attribute() {
        let mut records = vec![router("A")];
        let response = QueryResponse::with_aggregates(
            &["routerId", "connections"],
            vec![vec![AggregateValue::new("A"), AggregateValue::new(12)]],
        );
        merge_into_records(&mut records, &response, "routerId");
        assert_eq!(records[0].get("connections"), Some(&json!(12)));
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn custom_key_extractor_and_assigner() {
        #[derive(Debug)]
        struct Counter {
            name: String,
            total: i64,
        }
        let mut base = vec![
            Counter {
                name: "x".to_string(),
                total: 0,
            },
        ];
        let response = QueryResponse::with_aggregates(
            &["name", "total"],
            vec![vec![AggregateValue::new("x"), AggregateValue::new(5)]],
        );
        let outcome = merge_aggregates(
            &mut base,
            &response,
            "name",
            |counter| Some(counter.name.clone()),
            |counter, name, value| {
                if name == "total" {
                    counter.total = value.as_i64().unwrap_or_default();
                }
            },
        );
        assert_eq!(outcome.matched, 1);
        assert_eq!(base[0].total, 5);
    }
}
