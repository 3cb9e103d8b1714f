//! # Example: Self-healing with a Steward
//!
//! The ward is an "irresponsible" worker that never pulses; the steward notices the
//! silence after `timeout`, cancels it, and starts a fresh one, forever, until Ctrl-C.
//! A second steward watches a ward that hangs twice before settling down, bounded by a
//! restart policy with exponential backoff.
//!
//! Run with: `RUST_LOG=pipevisor=info cargo run --example healing --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pipevisor::{
    BackoffPolicy, Config, HeartbeatMode, LogWriter, Pipeline, Steward, StewardPolicy, Subscribe,
    Ward, WardFn,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pipeline = Pipeline::builder(Config {
        grace: Duration::from_secs(5),
        ..Config::default()
    })
    .with_subscribers(subs)
    .build();

    let irresponsible = WardFn::new(|ward: Pipeline, _interval| {
        let (heartbeat, _out) =
            ward.with_heartbeat::<(), _, _>("irresponsible", HeartbeatMode::WorkStart, |beat| async move {
                tracing::info!("ward: hello, I'm irresponsible");
                beat.token().cancelled().await;
                tracing::info!("ward: I am halting");
                Ok(())
            });
        heartbeat
    });
    let _watchdog = pipeline.supervise("watchdog", Duration::from_secs(4), irresponsible);

    let hangs_left = Arc::new(AtomicU32::new(2));
    let moody = WardFn::new(move |ward: Pipeline, interval| {
        let hangs_left = Arc::clone(&hangs_left);
        let (heartbeat, _out) =
            ward.with_heartbeat::<(), _, _>("moody", HeartbeatMode::Interval(interval), move |mut beat| async move {
                beat.sleep(Duration::from_secs(1)).await?;
                if hangs_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| h.checked_sub(1)).is_ok() {
                    tracing::info!("moody: hanging");
                    beat.token().cancelled().await;
                    return Ok(());
                }
                tracing::info!("moody: settled down");
                loop {
                    beat.sleep(Duration::from_secs(1)).await?;
                }
            });
        heartbeat
    });
    let policy = StewardPolicy::unlimited()
        .with_backoff(BackoffPolicy::exponential(Duration::from_millis(250), Duration::from_secs(5)))
        .with_max_restarts(5);
    let _moody = Steward::new("moody-steward", Duration::from_secs(2), moody)
        .with_policy(policy)
        .start(pipeline.clone(), Duration::from_secs(2));

    pipeline.run_until_signal().await?;
    Ok(())
}
