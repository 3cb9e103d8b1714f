//! # Fan-out / fan-in.
//!
//! ```text
//!                    ┌─► worker 0 ─┐
//! input ─► Mutex ────┼─► worker 1 ─┼─► merge sequence
//!  (first-ready-wins)└─► worker k ─┘
//!                         ▲
//!            supervisor: JoinSet::join_next() for each worker
//!                        → WorkerFailed on error or panic
//!                        → merge closes once every worker dropped its emitter clone
//! ```
//!
//! ## Rules
//! - No ordering guarantee across workers
//! - A worker error stops that worker only; the others keep draining the input
//! - Cancellation makes every worker abandon its pull, its call to `f`, or its send;
//!   the join still completes

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::{sync::Mutex, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::Pipeline;
use crate::error::{StageError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::sequence::{Emitter, Sequence};

impl Pipeline {
    /// Processes `input` with `workers` concurrent copies of `f` (`0` = [`Config::workers`]).
    ///
    /// Results are merged into one sequence in completion order. A worker whose `f`
    /// returns a non-graceful error stops and is reported as `WorkerFailed`.
    ///
    /// [`Config::workers`]: crate::Config::workers
    pub fn fan_out<T, U, F, Fut>(
        &self,
        name: &str,
        input: Sequence<T>,
        workers: usize,
        f: F,
    ) -> Sequence<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, StageError>> + Send + 'static,
    {
        let k = match workers {
            0 => self.config().workers(),
            n => n,
        };
        let bus = self.bus().clone();
        let stage: Arc<str> = Arc::from(name);

        self.stage(name, input, move |input, out| async move {
            let input = Arc::new(Mutex::new(input));
            let f = Arc::new(f);
            let mut set = JoinSet::new();

            for worker in 0..k as u32 {
                let work = fan_worker(Arc::clone(&input), out.clone(), Arc::clone(&f));
                set.spawn(async move {
                    let res = match AssertUnwindSafe(work).catch_unwind().await {
                        Ok(res) => res,
                        Err(payload) => Err(StageError::Panicked {
                            info: panic_message(payload.as_ref()),
                        }),
                    };
                    (worker, res)
                });
            }
            // Only worker clones keep the merge sequence open from here on.
            drop(out);

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => {}
                    Ok((_, Err(e))) if e.is_graceful() => {}
                    Ok((worker, Err(e))) => worker_failed(&bus, &stage, Some(worker), &e.as_message()),
                    Err(join_err) => worker_failed(&bus, &stage, None, &join_err.to_string()),
                }
            }
            Ok(())
        })
    }

    /// Merges independent sequences into one, in arrival order.
    ///
    /// The merged sequence closes once every input has closed.
    pub fn fan_in<T>(&self, name: &str, inputs: Vec<Sequence<T>>) -> Sequence<T>
    where
        T: Send + 'static,
    {
        self.source(name, move |out| async move {
            let token = out.token().clone();
            let mut merged = futures::stream::select_all(inputs);
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(StageError::Canceled),
                    next = merged.next() => next,
                };
                match next {
                    Some(item) => out.emit(item).await?,
                    None => return Ok(()),
                }
            }
        })
    }
}

async fn fan_worker<T, U, F, Fut>(
    input: Arc<Mutex<Sequence<T>>>,
    out: Emitter<U>,
    f: Arc<F>,
) -> Result<(), StageError>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<U, StageError>>,
{
    let token: CancellationToken = out.token().clone();
    loop {
        let next = {
            let mut input = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(StageError::Canceled),
                guard = input.lock() => guard,
            };
            input.recv_or_cancel(&token).await
        };
        let Some(item) = next else {
            return Ok(());
        };
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(StageError::Canceled),
            res = f(item) => res?,
        };
        out.emit(result).await?;
    }
}

fn worker_failed(bus: &Bus, stage: &Arc<str>, worker: Option<u32>, reason: &str) {
    tracing::debug!(stage = %stage, ?worker, reason, "fan-out worker failed");
    let mut ev = Event::new(EventKind::WorkerFailed)
        .with_stage(Arc::clone(stage))
        .with_reason(reason);
    if let Some(w) = worker {
        ev = ev.with_worker(w);
    }
    bus.publish(ev);
}

#[cfg(test)]
mod tests {
    use crate::{Config, EventKind, Pipeline, StageError};
    use std::collections::BTreeSet;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_out_processes_every_item_exactly_once() {
        let p = Pipeline::new(Config::default());
        let src = p.generator("src", 0..1000u32);
        let out = p.fan_out("square", src, 8, |n| async move { Ok(n as u64 * n as u64) });

        let mut got = out.collect_all().await;
        got.sort_unstable();
        let want: Vec<u64> = (0..1000u64).map(|n| n * n).collect();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn zero_workers_uses_config_default() {
        let p = Pipeline::new(Config {
            workers: 3,
            ..Config::default()
        });
        let src = p.generator("src", 0..10u8);
        let out = p.fan_out("id", src, 0, |n| async move { Ok(n) });
        let got: BTreeSet<u8> = out.collect_all().await.into_iter().collect();
        assert_eq!(got, (0..10).collect());
    }

    #[tokio::test]
    async fn failing_worker_stops_alone() {
        let p = Pipeline::new(Config::default());
        let mut events = p.events();
        let src = p.generator("src", 0..20u32);
        let out = p.fan_out("picky", src, 2, |n| async move {
            if n == 5 {
                return Err(StageError::fail("five is right out"));
            }
            Ok(n)
        });

        let got: BTreeSet<u32> = out.collect_all().await.into_iter().collect();
        let want: BTreeSet<u32> = (0..20).filter(|n| *n != 5).collect();
        assert_eq!(got, want);

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::WorkerFailed {
                assert_eq!(ev.stage.as_deref(), Some("picky"));
                assert!(ev.worker.is_some());
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_closes_the_merge() {
        let p = Pipeline::new(Config::default());
        let src = p.repeat("ones", vec![1u8]);
        let mut out = p.fan_out("slow", src, 4, |n| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(n)
        });
        assert_eq!(out.recv().await, Some(1));

        p.cancel();
        let closed = tokio::time::timeout(Duration::from_secs(1), async {
            while out.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_suspended_workers() {
        let p = Pipeline::new(Config::default());
        let src = p.repeat("ones", vec![1u8]);
        let out = p.fan_out("stuck", src, 2, |n| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(n)
        });
        // Let both workers pull an item and park inside `f`.
        tokio::time::sleep(Duration::from_millis(10)).await;

        p.cancel();
        let closed = tokio::time::timeout(Duration::from_secs(1), out.collect_all()).await;
        assert_eq!(closed.ok(), Some(Vec::new()));
        assert!(p.shutdown().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_in_is_complete() {
        let p = Pipeline::new(Config::default());
        let inputs: Vec<_> = (0..5u32)
            .map(|i| p.generator("part", (i * 100)..(i * 100 + 100)))
            .collect();
        let merged = p.fan_in("merge", inputs);

        let got = merged.collect_all().await;
        assert_eq!(got.len(), 500);
        let unique: BTreeSet<u32> = got.into_iter().collect();
        assert_eq!(unique, (0..500).collect());
    }
}
