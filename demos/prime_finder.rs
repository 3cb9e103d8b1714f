//! # Example: Prime Finder
//!
//! Random candidates are fanned out to one worker per CPU, each running a deliberately
//! slow primality test; the merged results are filtered and the first ten primes taken.
//!
//! Run with: `RUST_LOG=pipevisor=debug cargo run --example prime_finder --features logging`

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipevisor::{Config, LogWriter, Pipeline, StageError, Subscribe};
use rand::Rng;
use tracing_subscriber::EnvFilter;

/// Trial division without any shortcuts, so the work is worth spreading out.
fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    (2..n).all(|d| n % d != 0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config {
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pipeline = Pipeline::builder(cfg).with_subscribers(subs).build();

    let started = Instant::now();
    let candidates = pipeline.repeat_fn("rand", || rand::rng().random_range(1..50_000_000u64));
    let checked = pipeline.fan_out("prime-finder", candidates, 0, |n| async move {
        let checked = tokio::task::spawn_blocking(move || (n, is_prime(n)))
            .await
            .map_err(StageError::fail)?;
        Ok(checked)
    });
    let primes = pipeline.filter("primes", checked, |(_, prime)| *prime);
    let first = pipeline.take("first-ten", primes, 10);

    let mut first = pipeline.map("unwrap", first, |(n, _)| n);
    while let Some(prime) = first.recv().await {
        println!("\t{prime}");
    }
    println!("search took: {:?} with {} workers", started.elapsed(), pipeline.config().workers());

    pipeline.shutdown().await?;
    Ok(())
}
