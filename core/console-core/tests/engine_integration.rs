use console_core::{
    Category, ConsoleConfig, ConsoleEngine, DetailView, NodeTransport, RequestTicket,
    SchedulerState, TimerDriver, TimerToken, ViewKind, ViewSink, ViewTree,
};
use console_protocol::{AggregateValue, NodeId, QueryRequest, QueryResponse};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const R1: &str = "amqp:/_topo/0/R1/$management";
const R2: &str = "amqp:/_topo/0/R2/$management";

#[derive(Default)]
struct RecordingTransport {
    sent: Vec<(RequestTicket, QueryRequest)>,
}

impl NodeTransport for RecordingTransport {
    fn send(&mut self, ticket: RequestTicket, request: QueryRequest) {
        self.sent.push((ticket, request));
    }
}

#[derive(Default)]
struct ManualTimers {
    live: BTreeSet<TimerToken>,
}

impl TimerDriver for ManualTimers {
    fn arm(&mut self, token: TimerToken, _after: Duration) {
        self.live.insert(token);
    }

    fn cancel(&mut self, token: TimerToken) {
        self.live.remove(&token);
    }
}

#[derive(Default)]
struct RecordingSink {
    trees: Vec<Arc<ViewTree>>,
    details: Vec<DetailView>,
}

impl ViewSink for RecordingSink {
    fn publish_tree(&mut self, tree: Arc<ViewTree>) {
        self.trees.push(tree);
    }

    fn publish_detail(&mut self, detail: DetailView) {
        self.details.push(detail);
    }
}

type Engine = ConsoleEngine<RecordingTransport, ManualTimers, RecordingSink>;

fn engine_with(config: ConsoleConfig, nodes: &[&str]) -> Engine {
    let mut engine = ConsoleEngine::new(
        config,
        RecordingTransport::default(),
        ManualTimers::default(),
        RecordingSink::default(),
    );
    engine.set_nodes(nodes.iter().map(|id| NodeId::from(*id)).collect());
    engine
}

fn engine(nodes: &[&str]) -> Engine {
    engine_with(ConsoleConfig::default(), nodes)
}

fn connection_rows(node: &NodeId) -> QueryResponse {
    let host = format!("{}:5672", node.router_name());
    QueryResponse::with_results(
        &["host", "role", "isAuthenticated", "sasl", "user", "isEncrypted"],
        vec![
            vec![json!(host), json!("normal"), json!(true), json!("PLAIN"), json!("guest"), json!(false)],
            vec![json!("peer:55672"), json!("inter-router"), json!(false), json!(null), json!(null), json!(false)],
        ],
    )
}

/// Answers a request the way a healthy two-router network would.
fn respond(ticket: &RequestTicket, request: &QueryRequest) -> QueryResponse {
    match (request.entity.as_str(), request.is_aggregate()) {
        ("connection", _) => connection_rows(&ticket.node),
        ("router", true) => QueryResponse::with_aggregates(
            &["routerId", "addrCount"],
            vec![
                vec![AggregateValue::new("R1"), AggregateValue::new(12)],
                vec![AggregateValue::new("R2"), AggregateValue::new(30)],
            ],
        ),
        ("router", false) => QueryResponse::with_results(
            &["name", "version"],
            vec![vec![json!(ticket.node.router_name()), json!("1.19.0")]],
        ),
        ("router.address", _) => QueryResponse::with_aggregates(
            &["identity", "subscriberCount"],
            vec![
                vec![AggregateValue::new("M0queue"), AggregateValue::new(2)],
                vec![AggregateValue::new("Lagent"), AggregateValue::new(1)],
            ],
        ),
        ("log", _) => QueryResponse::with_results(
            &["name"],
            vec![vec![json!("ROUTER")], vec![json!("AGENT")]],
        ),
        (other, _) => panic!("unexpected entity {other}"),
    }
}

/// Answers every outstanding request, including chained follow-ups.
fn answer_all(engine: &mut Engine) {
    loop {
        let sent = std::mem::take(&mut engine.transport_mut().sent);
        if sent.is_empty() {
            return;
        }
        for (ticket, request) in sent {
            let response = respond(&ticket, &request);
            engine.deliver(ticket, response);
        }
    }
}

fn children_titles(engine: &Engine, category: Category) -> Vec<String> {
    engine
        .tree()
        .category(category)
        .map(|node| node.children.iter().map(|child| child.title.clone()).collect())
        .unwrap_or_default()
}

fn last_detail(engine: &Engine) -> &DetailView {
    engine.sink().details.last().expect("a detail was published")
}

#[test]
fn start_populates_every_category_and_arms_one_timer() {
    let mut engine = engine(&[R1, R2]);
    engine.start();
    answer_all(&mut engine);

    assert_eq!(children_titles(&engine, Category::Routers), ["R1", "R2"]);
    assert_eq!(children_titles(&engine, Category::Addresses), ["agent", "queue"]);
    assert_eq!(children_titles(&engine, Category::Connections), ["R1:5672", "R2:5672", "peer:55672"]);
    assert_eq!(children_titles(&engine, Category::Logs), ["AGENT", "ROUTER"]);

    assert_eq!(engine.scheduler().state(), SchedulerState::Scheduled);
    assert_eq!(engine.scheduler().driver().live.len(), 1);
    assert_eq!(engine.pending_jobs(), 0);
    let published = engine.sink().trees.last().expect("tree published");
    assert!(Arc::ptr_eq(published, &engine.tree()));

    let routers = last_detail(&engine);
    assert_eq!(routers.key, "Routers");
    assert_eq!(routers.rows.len(), 2);
    assert_eq!(routers.rows[0].title, "R1");
    assert_eq!(routers.rows[0].get("connections"), Some(&json!(1)));
    assert_eq!(routers.rows[1].get("addrCount"), Some(&json!(30)));
}

#[test]
fn empty_registry_publishes_without_waiting() {
    let mut engine = engine(&[]);
    engine.start();

    assert!(engine.transport().sent.is_empty());
    assert_eq!(engine.pending_jobs(), 0);
    let routers = last_detail(&engine);
    assert_eq!(routers.key, "Routers");
    assert!(routers.rows.is_empty());
    assert_eq!(engine.scheduler().driver().live.len(), 1);
}

#[test]
fn switching_views_keeps_a_single_timer() {
    let mut engine = engine(&[R1, R2]);
    engine.start();
    answer_all(&mut engine);

    for key in ["Addresses", "Connections", "Logs", "Routers"] {
        engine.activate_key(key);
        answer_all(&mut engine);
        assert_eq!(engine.scheduler().driver().live.len(), 1, "after activating {key}");
        assert_eq!(last_detail(&engine).key, key);
    }
}

#[test]
fn late_response_after_view_switch_is_discarded() {
    let mut engine = engine(&[R1, R2]);
    engine.activate_key("Connections");
    let stale = std::mem::take(&mut engine.transport_mut().sent);
    assert_eq!(stale.len(), 2);

    engine.activate_key("Logs");
    let tree_before = engine.tree();
    let details_before = engine.sink().details.len();
    for (ticket, request) in stale {
        let response = respond(&ticket, &request);
        engine.deliver(ticket, response);
    }

    assert_eq!(engine.tree().revision, tree_before.revision);
    assert!(children_titles(&engine, Category::Connections).is_empty());
    assert_eq!(engine.sink().details.len(), details_before);
    assert!(engine.scheduler().driver().live.is_empty());

    answer_all(&mut engine);
    assert_eq!(last_detail(&engine).key, "Logs");
    assert_eq!(engine.scheduler().driver().live.len(), 1);
}

#[test]
fn bootstrap_result_does_not_overwrite_newer_view_poll() {
    let mut engine = engine(&[R1]);
    engine.start();
    let bootstrap: Vec<_> = std::mem::take(&mut engine.transport_mut().sent)
        .into_iter()
        .filter(|(_, request)| request.entity == "router.address")
        .collect();
    assert_eq!(bootstrap.len(), 1);

    engine.activate_key("Addresses");
    let view: Vec<_> = std::mem::take(&mut engine.transport_mut().sent);
    for (ticket, _) in view {
        engine.deliver(
            ticket,
            QueryResponse::with_aggregates(&["identity"], vec![vec![AggregateValue::new("Lnew")]]),
        );
    }
    for (ticket, _) in bootstrap {
        engine.deliver(
            ticket,
            QueryResponse::with_aggregates(&["identity"], vec![vec![AggregateValue::new("Lold")]]),
        );
    }

    assert_eq!(children_titles(&engine, Category::Addresses), ["new"]);
}

#[test]
fn timer_fire_repolls_under_new_generation() {
    let mut engine = engine(&[R1, R2]);
    engine.start();
    answer_all(&mut engine);
    let generation = last_detail(&engine).generation;
    let token = engine.scheduler().pending_timer().expect("timer armed");

    engine.on_timer(token);
    assert_eq!(engine.scheduler().state(), SchedulerState::Polling);
    assert_eq!(engine.transport().sent.len(), 2);
    answer_all(&mut engine);

    let refreshed = last_detail(&engine);
    assert_eq!(refreshed.key, "Routers");
    assert!(refreshed.generation > generation);
    assert_eq!(engine.scheduler().state(), SchedulerState::Scheduled);
    assert_ne!(engine.scheduler().pending_timer(), Some(token));

    engine.on_timer(token);
    assert!(engine.transport().sent.is_empty());
}

#[test]
fn router_leaf_overlays_detail_on_summary_and_stops_refresh() {
    let mut engine = engine(&[R1, R2]);
    engine.start();
    answer_all(&mut engine);

    engine.activate_key(R2);
    assert!(engine.scheduler().driver().live.is_empty());
    assert_eq!(engine.scheduler().state(), SchedulerState::Idle);
    let sent = &engine.transport().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.node, NodeId::from(R2));
    answer_all(&mut engine);

    let detail = last_detail(&engine);
    assert_eq!(detail.key, R2);
    assert_eq!(detail.kind, ViewKind::Router);
    let value_of = |attribute: &str| {
        detail
            .rows
            .iter()
            .find(|row| row.get_str("attribute") == Some(attribute))
            .and_then(|row| row.get("value").cloned())
    };
    assert_eq!(value_of("routerId"), Some(json!("R2")));
    assert_eq!(value_of("addrCount"), Some(json!(30)));
    assert_eq!(value_of("version"), Some(json!("1.19.0")));
    assert!(engine.scheduler().driver().live.is_empty());
}

#[test]
fn address_leaf_hides_identity_fields() {
    let mut engine = engine(&[R1]);
    engine.start();
    answer_all(&mut engine);

    engine.activate_key("M0queue");
    assert!(engine.transport().sent.is_empty());
    let detail = last_detail(&engine);
    assert_eq!(detail.kind, ViewKind::Address);
    let attributes: Vec<_> = detail
        .rows
        .iter()
        .filter_map(|row| row.get_str("attribute"))
        .collect();
    assert!(attributes.contains(&"address"));
    assert!(attributes.contains(&"phase"));
    assert!(!attributes.contains(&"uid"));
    assert!(!attributes.contains(&"title"));
}

#[test]
fn hidden_logs_category_is_not_polled() {
    let mut config = ConsoleConfig::default();
    config.tree.show_logs = false;
    let mut engine = engine_with(config, &[R1]);
    engine.start();
    answer_all(&mut engine);

    assert!(!engine.tree().has_category(Category::Logs));
    engine.activate_key("Logs");
    assert!(engine.transport().sent.is_empty());
    assert_eq!(engine.scheduler().active(), Some(Category::Routers));
}

#[test]
fn shutdown_cancels_timer_and_drops_pending_jobs() {
    let mut engine = engine(&[R1, R2]);
    engine.start();
    engine.shutdown();

    assert_eq!(engine.pending_jobs(), 0);
    assert!(engine.scheduler().driver().live.is_empty());

    let details_before = engine.sink().details.len();
    answer_all(&mut engine);
    assert_eq!(engine.sink().details.len(), details_before);
}
