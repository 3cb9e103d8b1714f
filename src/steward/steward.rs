//! # Steward: heartbeat-driven restarts.
//!
//! A [`Steward`] keeps one incarnation of a [`Ward`] running and replaces it when it
//! stops pulsing. It is itself a [`Ward`], so stewards can watch stewards.
//!
//! ## State machine
//! ```text
//!            ┌──────────────────────────────────────────────────────────┐
//!            ▼                                                          │
//! starting: ward_token = fresh; ward.start(or(steward, ward), timeout/2)│
//!            │                                                          │
//!            ▼                                                          │
//! monitoring: select {                                                  │
//!   steward token      → cancel ward, stop                              │
//!   own ticker         → pulse own heartbeat                            │
//!   ward pulse         → reset deadline and restart streak              │
//!   ward closed        → WardExited ─────────┐                          │
//!   deadline elapsed   → WardUnhealthy ──────┤                          │
//! }                                          ▼                          │
//! restarting: cancel ward; streak += 1                                  │
//!   ├─ policy exhausted → WardExhausted, stop (own heartbeat closes)    │
//!   └─ RestartScheduled, sleep(backoff) while still pulsing ─────────────┘
//! ```
//!
//! ## Rules
//! - At most one ward incarnation is active; the previous token is cancelled first
//! - The deadline is reset only by ward pulses, never by the steward's own ticks
//! - The restart streak resets whenever the ward pulses, so `max_restarts` bounds
//!   consecutive failures, not the lifetime total
//! - The steward keeps pulsing through backoff sleeps, so an outer steward does not
//!   mistake a deliberate delay for a hang
//! - Stopping always publishes `StewardStopped`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::ward::{Ward, WardRef};
use crate::cancel;
use crate::core::Pipeline;
use crate::error::StageError;
use crate::events::{Event, EventKind};
use crate::policies::StewardPolicy;
use crate::sequence::{self, Heartbeat, Pulser};

/// Watches a [`Ward`] and restarts it when its heartbeat goes quiet.
#[derive(Clone)]
pub struct Steward {
    name: Arc<str>,
    timeout: Duration,
    ward: WardRef,
    policy: Option<StewardPolicy>,
}

impl Steward {
    /// Creates a steward that restarts `ward` after `timeout` without a pulse.
    ///
    /// The ward is asked to pulse every `timeout / 2`.
    pub fn new(name: &str, timeout: Duration, ward: impl Ward) -> Self {
        Self {
            name: Arc::from(name),
            timeout,
            ward: Arc::new(ward),
            policy: None,
        }
    }

    /// Overrides the pipeline's default [`StewardPolicy`].
    pub fn with_policy(mut self, policy: StewardPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Steward name used in events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pulse interval requested from the ward.
    pub fn ward_interval(&self) -> Duration {
        self.timeout / 2
    }
}

impl Ward for Steward {
    fn start(&self, pipeline: Pipeline, pulse_interval: Duration) -> Heartbeat {
        let (pulser, heartbeat) = sequence::pulse_channel();
        let policy = self.policy.unwrap_or(pipeline.config().steward);
        let run = StewardRun {
            steward: self.clone(),
            pipeline: pipeline.clone(),
            policy,
            pulser,
            pulse_interval: pulse_interval.max(Duration::from_millis(1)),
        };
        pipeline.spawn_stage(&self.name, run.run());
        heartbeat
    }
}

impl Pipeline {
    /// Starts a [`Steward`] over `ward` and returns the steward's own heartbeat.
    ///
    /// The steward pulses every `timeout` and closes its heartbeat if it gives up.
    pub fn supervise(&self, name: &str, timeout: Duration, ward: impl Ward) -> Heartbeat {
        Steward::new(name, timeout, ward).start(self.clone(), timeout)
    }
}

/// Why the current incarnation is being replaced.
enum Verdict {
    Unhealthy,
    Exited,
}

struct StewardRun {
    steward: Steward,
    pipeline: Pipeline,
    policy: StewardPolicy,
    pulser: Pulser,
    pulse_interval: Duration,
}

impl StewardRun {
    async fn run(self) -> Result<(), StageError> {
        let token = self.pipeline.token().clone();
        let timeout = self.steward.timeout;
        let mut ticker = time::interval_at(Instant::now() + self.pulse_interval, self.pulse_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut starts: u32 = 0;
        let mut streak: u32 = 0;

        'incarnation: loop {
            starts = starts.saturating_add(1);
            let (ward_token, mut ward_hb) = self.start_ward(&token, starts);
            let deadline = time::sleep(timeout);
            tokio::pin!(deadline);

            let verdict = loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        ward_token.cancel();
                        break 'incarnation;
                    }
                    _ = ticker.tick() => {
                        self.pulser.pulse();
                    }
                    pulse = ward_hb.recv() => match pulse {
                        Some(_) => {
                            streak = 0;
                            deadline.as_mut().reset(Instant::now() + timeout);
                        }
                        None => break Verdict::Exited,
                    },
                    _ = &mut deadline => break Verdict::Unhealthy,
                }
            };
            ward_token.cancel();
            self.report(verdict, starts);

            streak = streak.saturating_add(1);
            if !self.policy.allows(streak) {
                self.publish(
                    Event::new(EventKind::WardExhausted)
                        .with_attempt(streak)
                        .with_reason(format!("gave up after {} consecutive restarts", streak - 1)),
                );
                break;
            }

            let delay = self.policy.backoff.next(streak - 1);
            self.publish(
                Event::new(EventKind::RestartScheduled)
                    .with_attempt(streak)
                    .with_delay(delay),
            );
            let backoff = time::sleep(delay);
            tokio::pin!(backoff);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break 'incarnation,
                    _ = &mut backoff => break,
                    _ = ticker.tick() => { self.pulser.pulse(); }
                }
            }
        }

        self.publish(Event::new(EventKind::StewardStopped).with_attempt(starts));
        Ok(())
    }

    /// Starts a new incarnation bound to `or(steward, fresh)`.
    fn start_ward(&self, steward_token: &CancellationToken, start: u32) -> (CancellationToken, Heartbeat) {
        let ward_token = CancellationToken::new();
        let incarnation = cancel::or(&[steward_token.clone(), ward_token.clone()]);
        self.publish(
            Event::new(EventKind::WardStarting)
                .with_attempt(start)
                .with_timeout(self.steward.timeout),
        );

        let hb = self.steward.ward.start(
            self.pipeline.with_token(incarnation),
            self.steward.ward_interval(),
        );
        (ward_token, hb)
    }

    fn report(&self, verdict: Verdict, start: u32) {
        match verdict {
            Verdict::Unhealthy => {
                tracing::warn!(steward = %self.steward.name, "ward unhealthy; restarting");
                self.publish(
                    Event::new(EventKind::WardUnhealthy)
                        .with_attempt(start)
                        .with_timeout(self.steward.timeout),
                );
            }
            Verdict::Exited => {
                tracing::debug!(steward = %self.steward.name, "ward exited; restarting");
                self.publish(Event::new(EventKind::WardExited).with_attempt(start));
            }
        }
    }

    fn publish(&self, ev: Event) {
        self.pipeline
            .publish(ev.with_stage(Arc::clone(&self.steward.name)));
    }
}
