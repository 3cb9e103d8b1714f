use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pipevisor::{
    Config, EventKind, HeartbeatMode, Liveness, Pipeline, StewardPolicy, WardFn, channel,
};
use tokio::time::timeout;

const PULSE: Duration = Duration::from_millis(50);

#[tokio::test(start_paused = true)]
async fn steward_heals_a_ward_and_data_keeps_flowing() {
    let pipeline = Pipeline::new(Config::default());
    let mut events = pipeline.events();
    let (sink, mut results) = channel::<u32>(pipeline.token().clone(), 64);
    let hangs_left = Arc::new(AtomicU32::new(2));

    let ward = WardFn::new(move |ward: Pipeline, interval| {
        let sink = sink.clone();
        let hangs_left = Arc::clone(&hangs_left);
        let (heartbeat, _out) = ward.with_heartbeat::<(), _, _>(
            "producer",
            HeartbeatMode::Interval(interval),
            move |mut beat| async move {
                for n in 0u32.. {
                    beat.sleep(Duration::from_millis(10)).await?;
                    sink.emit(n).await?;
                    let should_hang = n == 3
                        && hangs_left
                            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| h.checked_sub(1))
                            .is_ok();
                    if should_hang {
                        // Stuck outside any heartbeat-aware wait.
                        beat.token().cancelled().await;
                        return Ok(());
                    }
                }
                Ok(())
            },
        );
        heartbeat
    });

    let _steward = pipeline.supervise("healer", PULSE * 4, ward);

    // Two hung incarnations deliver 0..=3 each, the third keeps going.
    let mut got = Vec::new();
    while got.len() < 20 {
        let n = timeout(Duration::from_secs(5), results.recv())
            .await
            .expect("steward did not restart the ward")
            .expect("sink closed");
        got.push(n);
    }
    assert_eq!(&got[..8], &[0, 1, 2, 3, 0, 1, 2, 3]);
    assert_eq!(got[8..].to_vec(), (0..12).collect::<Vec<_>>());

    pipeline.shutdown().await.unwrap();

    let mut unhealthy = 0;
    let mut stopped = false;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::WardUnhealthy => {
                assert_eq!(ev.stage.as_deref(), Some("healer"));
                unhealthy += 1;
            }
            EventKind::StewardStopped => stopped = true,
            _ => {}
        }
    }
    assert_eq!(unhealthy, 2);
    assert!(stopped);
}

#[tokio::test(start_paused = true)]
async fn exhausted_steward_escalates_through_its_heartbeat() {
    let pipeline = Pipeline::new(Config {
        steward: StewardPolicy::unlimited().with_max_restarts(1),
        ..Config::default()
    });

    let ward = WardFn::new(|ward: Pipeline, _interval| {
        let (heartbeat, _out) =
            ward.with_heartbeat::<(), _, _>("hangs", HeartbeatMode::WorkStart, |beat| async move {
                beat.token().cancelled().await;
                Ok(())
            });
        heartbeat
    });

    let mut steward_hb = pipeline.supervise("escalating", PULSE * 4, ward);
    let verdict = loop {
        match steward_hb.observe(PULSE * 100).await {
            Liveness::Pulse => continue,
            other => break other,
        }
    };
    assert_eq!(verdict, Liveness::Closed);
    pipeline.shutdown().await.unwrap();
}
