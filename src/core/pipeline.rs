//! # Pipeline: the handle every stage is built from.
//!
//! A [`Pipeline`] is a cheap-to-clone handle that carries:
//! - the [`CancellationToken`] the next stage will observe,
//! - the shared runtime: [`Config`], event [`Bus`], [`AliveTracker`], and a
//!   [`TaskTracker`] of every spawned worker.
//!
//! Stage constructors (`source`, `stage`, `map`, `fan_out`, `with_heartbeat`,
//! `supervise`, ...) are methods on it, so composing a pipeline reads as passing one
//! stage's output sequence into the next constructor.
//!
//! ## Architecture
//! ```text
//! PipelineBuilder::build()
//!   ├─► Bus (side channel)  ──► listener ──► AliveTracker
//!   │                                    └─► SubscriberSet ──► user subscribers
//!   ├─► root CancellationToken
//!   └─► TaskTracker
//!
//! pipeline.source(..) ─► Sequence ─► pipeline.map(..) ─► Sequence ─► pipeline.fan_out(..)
//!        │                                │                                │
//!        └──────────── spawn_stage() ─────┴──── publishes StageStarting/Stopped/Failed
//!
//! Shutdown path:
//!   shutdown() ─► publish ShutdownRequested
//!              ─► root.cancel()  → every stage sees it at its next suspension point
//!              ─► wait for tracked workers up to cfg.grace:
//!                    ├─ all joined       → publish AllStoppedWithin
//!                    └─ grace exceeded   → publish GraceExceeded, Err(GraceExceeded{stuck})
//!              ─► stop the listener and wait until subscribers drained their queues
//! ```
//!
//! ## Scoped tokens
//! [`Pipeline::with_token`] returns a handle sharing the same runtime but bound to
//! another token; [`Pipeline::child`] binds a child of the current token. Stewards use
//! this to give every ward instance its own token.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::builder::{Listener, PipelineBuilder};
use crate::core::{alive::AliveTracker, config::Config, shutdown};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

struct Shared {
    cfg: Config,
    bus: Bus,
    alive: Arc<AliveTracker>,
    tracker: TaskTracker,
    root: CancellationToken,
    next_id: AtomicU64,
    /// Serializes tracker close/reopen between `join` and `shutdown`.
    lifecycle: Mutex<()>,
    listener_stop: CancellationToken,
    listener: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Handle to a running pipeline runtime, bound to one cancellation token.
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
    token: CancellationToken,
}

impl Pipeline {
    /// Starts building a pipeline with the given configuration.
    pub fn builder(cfg: Config) -> PipelineBuilder {
        PipelineBuilder::new(cfg)
    }

    /// Creates a pipeline with `cfg` and no subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        PipelineBuilder::new(cfg).build()
    }

    pub(crate) fn from_parts(
        cfg: Config,
        bus: Bus,
        alive: Arc<AliveTracker>,
        root: CancellationToken,
        listener: Listener,
    ) -> Self {
        let token = root.clone();
        Self {
            shared: Arc::new(Shared {
                cfg,
                bus,
                alive,
                tracker: TaskTracker::new(),
                root,
                next_id: AtomicU64::new(1),
                lifecycle: Mutex::new(()),
                listener_stop: listener.stop,
                listener: Mutex::new(Some(listener.handle)),
            }),
            token,
        }
    }

    /// The token stages built from this handle observe.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels this handle's token (and everything derived from it).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if this handle's token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a handle sharing this runtime but bound to `token`.
    pub fn with_token(&self, token: CancellationToken) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            token,
        }
    }

    /// Returns a handle bound to a child of the current token.
    ///
    /// Cancelling the child stops only the stages built from it.
    pub fn child(&self) -> Self {
        self.with_token(self.token.child_token())
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Subscribes to the event bus (the error side channel).
    ///
    /// Only events published after this call are observed.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Sorted names of stages whose workers are still running.
    ///
    /// Eventually consistent: it reflects events the listener has already processed.
    pub async fn live_stages(&self) -> Vec<String> {
        self.shared.alive.snapshot().await
    }

    /// Waits until every worker spawned so far (and any spawned meanwhile) has finished,
    /// without cancelling anything.
    ///
    /// Once [`shutdown`](Self::shutdown) has started, the tracker stays closed.
    pub async fn join(&self) {
        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        let _guard = self.shared.lifecycle.lock().await;
        if !self.shared.root.is_cancelled() {
            self.shared.tracker.reopen();
        }
    }

    /// Cancels the root token and waits up to [`Config::grace`] for every worker.
    ///
    /// Subscribers have received every event, including the final
    /// `AllStoppedWithin` / `GraceExceeded`, by the time this returns.
    ///
    /// ### Errors
    /// [`RuntimeError::GraceExceeded`] with the names of the stages still running.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.publish(Event::new(EventKind::ShutdownRequested));
        self.shared.root.cancel();
        {
            let _guard = self.shared.lifecycle.lock().await;
            self.shared.tracker.close();
        }

        let grace = self.shared.cfg.grace;
        let res = match tokio::time::timeout(grace, self.shared.tracker.wait()).await {
            Ok(()) => {
                self.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.shared.alive.snapshot().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };
        self.stop_listener().await;
        res
    }

    /// Stops the bus listener after it forwarded everything already published.
    async fn stop_listener(&self) {
        self.shared.listener_stop.cancel();
        let handle = self.shared.listener.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "pipeline listener ended abnormally");
            }
        }
    }

    /// Runs until a termination signal arrives or the root token fires, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => match res {
                Ok(signal) => tracing::info!(signal, "termination signal received"),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to install signal handlers; shutting down");
                }
            },
            _ = self.shared.root.cancelled() => {}
        }
        self.shutdown().await
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.shared.bus.publish(ev);
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.shared.tracker
    }

    pub(crate) fn next_stage_id(&self) -> u64 {
        self.shared.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cancelled", &self.token.is_cancelled())
            .field("tracked", &self.shared.tracker.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn child_cancel_does_not_reach_root() {
        let pipeline = Pipeline::new(Config::default());
        let child = pipeline.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!pipeline.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_stuck_stages() {
        let pipeline = Pipeline::new(Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        });

        // A worker that ignores its token.
        pipeline.spawn_stage("stubborn", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        tokio::task::yield_now().await;

        match pipeline.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_within_grace() {
        let pipeline = Pipeline::new(Config::default());
        let mut events = pipeline.events();
        let token = pipeline.token().clone();
        pipeline.spawn_stage("polite", async move {
            token.cancelled().await;
            Ok(())
        });

        pipeline.shutdown().await.unwrap();
        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }

    struct Recording(Arc<std::sync::Mutex<Vec<EventKind>>>);

    #[async_trait::async_trait]
    impl crate::subscribers::Subscribe for Recording {
        async fn on_event(&self, ev: &Event) {
            tokio::task::yield_now().await;
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_subscribers_to_drain() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(Config::default())
            .with_subscribers(vec![Arc::new(Recording(Arc::clone(&seen)))])
            .build();
        pipeline.spawn_stage("quick", async { Ok(()) });

        pipeline.shutdown().await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&EventKind::StageStopped));
        assert_eq!(seen.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[tokio::test]
    async fn second_shutdown_returns_promptly() {
        let pipeline = Pipeline::new(Config::default());
        pipeline.shutdown().await.unwrap();
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn join_racing_shutdown_does_not_reopen_the_tracker() {
        let pipeline = Pipeline::new(Config {
            grace: Duration::from_secs(3600),
            ..Config::default()
        });
        let token = pipeline.token().clone();
        pipeline.spawn_stage("polite", async move {
            token.cancelled().await;
            Ok(())
        });

        let started = tokio::time::Instant::now();
        let ((), res) = tokio::join!(pipeline.join(), pipeline.shutdown());
        assert!(res.is_ok());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
