//! Runs a [`ConsoleEngine`] against a [`Fixture`] on the channel event loop.

use crate::fixture::Fixture;
use console_core::{
    run_event_loop, Category, ChannelTimers, ConsoleConfig, ConsoleEngine, ConsoleEvent,
    DetailView, NodeTransport, RequestTicket, ViewKind, ViewSink, ViewTree,
};
use console_protocol::QueryRequest;
use serde::Serialize;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Tree key to activate after start. Defaults to the Routers view.
    pub activate: Option<String>,
    /// Publications of the watched view to wait for.
    pub cycles: usize,
    pub deadline: Duration,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub tree: ViewTree,
    pub details: Vec<DetailView>,
}

/// Answers every request from the fixture by posting the response back onto
/// the event channel.
struct FixtureTransport {
    fixture: Arc<Fixture>,
    events: Sender<ConsoleEvent>,
}

impl NodeTransport for FixtureTransport {
    fn send(&mut self, ticket: RequestTicket, request: QueryRequest) {
        let response = self.fixture.respond(&ticket, &request);
        if self
            .events
            .send(ConsoleEvent::Response { ticket, response })
            .is_err()
        {
            tracing::debug!(entity = %request.entity, "Event loop gone; response dropped");
        }
    }
}

/// Keeps every detail publication and asks for shutdown once the watched
/// view has published enough times.
struct ReplaySink {
    events: Sender<ConsoleEvent>,
    watch: String,
    cycles: usize,
    seen: usize,
    details: Vec<DetailView>,
}

impl ViewSink for ReplaySink {
    fn publish_tree(&mut self, tree: Arc<ViewTree>) {
        tracing::debug!(revision = tree.revision, "Tree published");
    }

    fn publish_detail(&mut self, detail: DetailView) {
        let watched = detail.key == self.watch;
        let one_shot = matches!(
            detail.kind,
            ViewKind::Router | ViewKind::Address | ViewKind::Connection | ViewKind::Log
        );
        self.details.push(detail);
        if !watched {
            return;
        }
        self.seen += 1;
        if one_shot || self.seen >= self.cycles {
            let _ = self.events.send(ConsoleEvent::Shutdown);
        }
    }
}

pub fn replay(fixture: Fixture, config: ConsoleConfig, options: ReplayOptions) -> ReplayReport {
    let (tx, rx) = mpsc::channel();
    let nodes = fixture.nodes.clone();
    let watch = options
        .activate
        .clone()
        .unwrap_or_else(|| Category::Routers.key().to_string());

    let transport = FixtureTransport {
        fixture: Arc::new(fixture),
        events: tx.clone(),
    };
    let sink = ReplaySink {
        events: tx.clone(),
        watch,
        cycles: options.cycles.max(1),
        seen: 0,
        details: Vec::new(),
    };
    let mut engine = ConsoleEngine::new(config, transport, ChannelTimers::new(tx.clone()), sink);
    engine.set_nodes(nodes);
    engine.start();
    if let Some(key) = options.activate {
        let _ = tx.send(ConsoleEvent::Activate(key));
    }
    spawn_deadline(tx, options.deadline);

    let handled = run_event_loop(&mut engine, &rx);
    tracing::info!(handled, "Replay finished");

    ReplayReport {
        tree: engine.tree().as_ref().clone(),
        details: std::mem::take(&mut engine.sink_mut().details),
    }
}

fn spawn_deadline(events: Sender<ConsoleEvent>, deadline: Duration) {
    thread::spawn(move || {
        thread::sleep(deadline);
        if events.send(ConsoleEvent::Shutdown).is_ok() {
            tracing::warn!(
                deadline_ms = deadline.as_millis() as u64,
                "Replay deadline reached"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::load_fixture;
    use std::path::Path;

    fn two_routers() -> Fixture {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/two-routers.json");
        load_fixture(&path).expect("bundled fixture")
    }

    fn options(activate: Option<&str>, cycles: usize) -> ReplayOptions {
        ReplayOptions {
            activate: activate.map(str::to_string),
            cycles,
            deadline: Duration::from_secs(10),
        }
    }

    fn fast_config() -> ConsoleConfig {
        let mut config = ConsoleConfig::default();
        config.polling.refresh_interval_ms = 100;
        config
    }

    #[test]
    fn routers_view_refreshes_requested_number_of_times() {
        let report = replay(two_routers(), fast_config(), options(None, 2));

        let routers: Vec<_> = report
            .details
            .iter()
            .filter(|detail| detail.key == "Routers")
            .collect();
        assert_eq!(routers.len(), 2);
        assert!(routers[1].generation > routers[0].generation);
        assert_eq!(routers[1].rows.len(), 2);

        let addresses = report
            .tree
            .category(Category::Addresses)
            .expect("addresses category");
        assert!(!addresses.children.is_empty());
    }

    #[test]
    fn activated_leaf_publishes_its_detail_once() {
        let report = replay(
            two_routers(),
            fast_config(),
            options(Some("amqp:/_topo/0/R1/$management"), 3),
        );

        let detail = report.details.last().expect("router detail");
        assert_eq!(detail.kind, ViewKind::Router);
        assert!(detail
            .rows
            .iter()
            .any(|row| row.get_str("attribute") == Some("version")));
    }
}
