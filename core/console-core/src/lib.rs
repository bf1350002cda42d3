//! # console-core
//!
//! Telemetry aggregation core for the router network console. Queries every
//! router node, merges per-node and aggregate responses, and publishes an
//! immutable overview tree plus detail grids for the active view.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. I/O sits behind the
//!   [`NodeTransport`] and [`TimerDriver`] traits; responses and fired timers
//!   are fed back into [`ConsoleEngine`].
//! - **Single owner**: The engine is driven from one thread. [`runtime`]
//!   provides a channel-based event loop for callers that need one.
//! - **Graceful degradation**: Missing attributes render as placeholders,
//!   unmatched aggregate rows are dropped, malformed identities decode to
//!   the placeholder class.
//! - **Snapshots**: Each publication is a new [`ViewTree`]; readers never see
//!   a partially updated tree.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use console_core::{load_config, ConsoleEngine};
//!
//! let config = load_config(None)?;
//! let mut engine = ConsoleEngine::new(config, transport, timers, sink);
//! engine.set_nodes(node_ids);
//! engine.start();
//! ```

pub mod builder;
pub mod config;
pub mod disambiguate;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod identity;
pub mod merge;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod view;

pub use config::{default_config_path, load_config, ConsoleConfig, PollingConfig, TreeConfig};
pub use disambiguate::{disambiguate, sort_by_display_text, Labeled};
pub use engine::ConsoleEngine;
pub use error::{ConsoleError, Result};
pub use fanout::{
    Accumulator, FanOutCollector, FanOutHandler, JobId, JobScope, NodeTransport, QueryPlan,
    RequestTicket,
};
pub use identity::{decode, decode_qualified, strip_owner_prefix, AddressClass, IdentityRecord};
pub use merge::{merge_aggregates, merge_into_records, MergeOutcome};
pub use registry::NodeRegistry;
pub use runtime::{run_event_loop, ChannelTimers, ConsoleEvent};
pub use scheduler::{RefreshScheduler, SchedulerState, TimerDriver, TimerToken};
pub use view::{
    Category, DetailView, Refresh, ViewKind, ViewNode, ViewRecord, ViewSink, ViewTree,
};
