//! # Example: Heartbeats
//!
//! A worker emits results at a steady pace and pulses on an interval while it waits.
//! The observer uses a timeout of twice the pulse interval and reports liveness; after a
//! few results the worker "wedges" outside of any heartbeat-aware wait, and the observer
//! notices the silence.
//!
//! Run with: `cargo run --example heartbeat`

use std::time::Duration;

use pipevisor::{Config, HeartbeatMode, Liveness, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(Config {
        grace: Duration::from_secs(2),
        ..Config::default()
    });

    let pulse = Duration::from_millis(500);
    let (mut heartbeat, mut results) =
        pipeline.with_heartbeat("ticker", HeartbeatMode::Interval(pulse), move |mut beat| async move {
            for n in 0u32..4 {
                beat.sleep(Duration::from_millis(700)).await?;
                beat.emit(n).await?;
            }
            // Wedged: nothing below pulses any more.
            beat.token().cancelled().await;
            Ok(())
        });

    let timeout = Config::heartbeat_timeout(pulse);
    loop {
        tokio::select! {
            liveness = heartbeat.observe(timeout) => match liveness {
                Liveness::Pulse => println!("pulse"),
                Liveness::Closed => break,
                Liveness::TimedOut => {
                    println!("worker unhealthy: no pulse for {timeout:?}");
                    break;
                }
            },
            Some(n) = results.recv() => println!("results {n}"),
        }
    }

    pipeline.shutdown().await?;
    Ok(())
}
