//! Channel-driven event loop for a [`ConsoleEngine`].
//!
//! Transports, timers and the UI post [`ConsoleEvent`]s into one
//! `std::sync::mpsc` channel; [`run_event_loop`] applies them to the engine on
//! the calling thread until it sees [`ConsoleEvent::Shutdown`] or every sender
//! is gone.

use crate::engine::ConsoleEngine;
use crate::fanout::{NodeTransport, RequestTicket};
use crate::scheduler::{TimerDriver, TimerToken};
use crate::view::ViewSink;
use console_protocol::QueryResponse;
use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub enum ConsoleEvent {
    Response {
        ticket: RequestTicket,
        response: QueryResponse,
    },
    TimerFired(TimerToken),
    /// A tree selection, by category or leaf key.
    Activate(String),
    Shutdown,
}

/// Timer driver backed by one sleeping thread per armed timer.
#[derive(Debug, Clone)]
pub struct ChannelTimers {
    events: Sender<ConsoleEvent>,
    cancelled: Arc<Mutex<HashSet<TimerToken>>>,
}

impl ChannelTimers {
    pub fn new(events: Sender<ConsoleEvent>) -> Self {
        Self {
            events,
            cancelled: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl TimerDriver for ChannelTimers {
    fn arm(&mut self, token: TimerToken, after: Duration) {
        let events = self.events.clone();
        let cancelled = Arc::clone(&self.cancelled);
        thread::spawn(move || {
            thread::sleep(after);
            let was_cancelled = cancelled
                .lock()
                .map(|mut tokens| tokens.remove(&token))
                .unwrap_or(false);
            if was_cancelled {
                return;
            }
            if events.send(ConsoleEvent::TimerFired(token)).is_err() {
                tracing::debug!(timer = %token, "Event loop gone; timer dropped");
            }
        });
    }

    fn cancel(&mut self, token: TimerToken) {
        match self.cancelled.lock() {
            Ok(mut tokens) => {
                tokens.insert(token);
            }
            Err(err) => {
                tracing::warn!(timer = %token, error = %err, "Timer registry poisoned; relying on token check");
            }
        }
    }
}

/// Applies events to `engine` until shutdown. Returns the number of events
/// handled.
pub fn run_event_loop<T, D, S>(
    engine: &mut ConsoleEngine<T, D, S>,
    events: &Receiver<ConsoleEvent>,
) -> usize
where
    T: NodeTransport,
    D: TimerDriver,
    S: ViewSink,
{
    let mut handled = 0;
    for event in events.iter() {
        handled += 1;
        match event {
            ConsoleEvent::Response { ticket, response } => engine.deliver(ticket, response),
            ConsoleEvent::TimerFired(token) => engine.on_timer(token),
            ConsoleEvent::Activate(key) => engine.activate_key(&key),
            ConsoleEvent::Shutdown => {
                engine.shutdown();
                return handled;
            }
        }
    }

    tracing::info!(handled, "Event channel closed");
    engine.shutdown();
    handled
}
