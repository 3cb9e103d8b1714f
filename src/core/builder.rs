//! # Pipeline builder.
//!
//! Wires the shared runtime a [`Pipeline`] hands to every stage:
//!
//! ```text
//! build()
//!   ├─ Bus::new(bus_capacity)
//!   ├─ SubscriberSet::new(subscribers)       one bounded queue + worker each
//!   ├─ AliveTracker
//!   └─ listener: Bus ─► AliveTracker::update ─► SubscriberSet::emit
//!                 │
//!                 └─ on stop: drain buffered events, then SubscriberSet::shutdown
//! ```
//!
//! The listener subscribes before `build` returns, so no event published through the
//! returned handle is missed. It runs until [`Pipeline::shutdown`] fires its stop token;
//! the shutdown then awaits it, so subscribers have seen every event by the time it returns.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{alive::AliveTracker, config::Config, pipeline::Pipeline};
use crate::events::{Bus, Event};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Pipeline`] with optional features.
pub struct PipelineBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    token: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            token: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive stage and steward lifecycle events through dedicated
    /// workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Derives the pipeline's root token from `parent`.
    ///
    /// Cancelling `parent` then stops the whole pipeline; [`Pipeline::shutdown`] does
    /// not cancel `parent`.
    pub fn with_token(mut self, parent: CancellationToken) -> Self {
        self.token = Some(parent);
        self
    }

    /// Builds the pipeline. Must be called from within a tokio runtime.
    pub fn build(self) -> Pipeline {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let alive = Arc::new(AliveTracker::new());
        let root = match self.token {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let stop = CancellationToken::new();
        let listener = spawn_listener(&bus, Arc::clone(&alive), subs, stop.clone());

        Pipeline::from_parts(self.cfg, bus, alive, root, Listener { stop, handle: listener })
    }
}

/// Stop token and join handle of the bus listener.
pub(crate) struct Listener {
    pub(crate) stop: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

fn spawn_listener(
    bus: &Bus,
    alive: Arc<AliveTracker>,
    subs: SubscriberSet,
    stop: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let res = tokio::select! {
                biased;
                res = rx.recv() => res,
                _ = stop.cancelled() => break,
            };
            match res {
                Ok(ev) => forward(&alive, &subs, ev).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "pipeline listener lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        drain(&mut rx, &alive, &subs).await;
        subs.shutdown().await;
    })
}

/// Forwards whatever is still buffered when the listener is told to stop.
async fn drain(rx: &mut broadcast::Receiver<Event>, alive: &AliveTracker, subs: &SubscriberSet) {
    loop {
        match rx.try_recv() {
            Ok(ev) => forward(alive, subs, ev).await,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

async fn forward(alive: &AliveTracker, subs: &SubscriberSet, ev: Event) {
    alive.update(&ev).await;
    if !subs.is_empty() {
        subs.emit(ev);
    }
}
