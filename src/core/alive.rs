//! # Live stage tracker.
//!
//! Keeps the set of stage workers that have started but not yet stopped, so a
//! shutdown that runs out of grace can name the stuck ones.
//!
//! ```text
//! Bus ──► pipeline listener ──► AliveTracker::update()
//!                                      │
//!                                      ▼
//!                         HashMap<stage_id, stage name>
//! ```
//!
//! ## Rules
//! - Keyed by `stage_id`, so restarts of a same-named stage never clobber each other
//! - Only `StageStarting` / `StageStopped` / `StageFailed` change state
//! - A stage's `StageStarting` is published before its worker runs, and the bus is a
//!   single queue, so per-stage events are never seen out of order
//! - Stopped stages are forgotten; the map only holds live workers

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

/// Thread-safe tracker of live stage workers.
#[derive(Default)]
pub struct AliveTracker {
    live: RwLock<HashMap<u64, Arc<str>>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a lifecycle event. Returns `true` if the live set changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let (Some(id), Some(name)) = (ev.stage_id, ev.stage.as_ref()) else {
            return false;
        };
        match ev.kind {
            EventKind::StageStarting => self
                .live
                .write()
                .await
                .insert(id, Arc::clone(name))
                .is_none(),
            EventKind::StageStopped | EventKind::StageFailed => {
                self.live.write().await.remove(&id).is_some()
            }
            _ => false,
        }
    }

    /// Returns the sorted names of stages that are currently alive.
    pub async fn snapshot(&self) -> Vec<String> {
        let live = self.live.read().await;
        let mut names: Vec<String> = live.values().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }
}
