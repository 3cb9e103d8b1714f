//! Channel combinators: or-done, tee and bridge.

use crate::core::Pipeline;
use crate::error::StageError;
use crate::sequence::{self, Emitter, Sequence};

impl Pipeline {
    /// Relays a sequence owned by someone else until it ends or the token fires.
    ///
    /// Wrap foreign sequences with this before reading them in a loop, so consumers stop
    /// when the pipeline is cancelled even if the producer never closes.
    pub fn or_done<T>(&self, name: &str, input: Sequence<T>) -> Sequence<T>
    where
        T: Send + 'static,
    {
        self.stage(name, input, |mut input, out| async move {
            let token = out.token().clone();
            while let Some(item) = input.recv_or_cancel(&token).await {
                out.emit(item).await?;
            }
            Ok(())
        })
    }

    /// Splits `input` into two sequences that both see every item.
    ///
    /// Each item is delivered to both outputs before the next one is read, so the slower
    /// consumer paces the faster one. If one consumer drops its sequence the other keeps
    /// receiving.
    pub fn tee<T>(&self, name: &str, input: Sequence<T>) -> (Sequence<T>, Sequence<T>)
    where
        T: Clone + Send + 'static,
    {
        let capacity = self.config().sequence_capacity_clamped();
        let (left_tx, left) = sequence::channel(self.token().clone(), capacity);
        let (right_tx, right) = sequence::channel(self.token().clone(), capacity);
        self.spawn_stage(name, tee_worker(input, left_tx, right_tx));
        (left, right)
    }

    /// Flattens a sequence of sequences, draining each inner sequence in order.
    pub fn bridge<T>(&self, name: &str, input: Sequence<Sequence<T>>) -> Sequence<T>
    where
        T: Send + 'static,
    {
        self.stage(name, input, |mut outer, out| async move {
            let token = out.token().clone();
            while let Some(mut inner) = outer.recv_or_cancel(&token).await {
                while let Some(item) = inner.recv_or_cancel(&token).await {
                    out.emit(item).await?;
                }
            }
            Ok(())
        })
    }
}

async fn tee_worker<T: Clone>(
    mut input: Sequence<T>,
    left: Emitter<T>,
    right: Emitter<T>,
) -> Result<(), StageError> {
    let token = left.token().clone();
    let mut left = Some(left);
    let mut right = Some(right);

    while left.is_some() || right.is_some() {
        let Some(item) = input.recv_or_cancel(&token).await else {
            break;
        };
        let (l, r) = tokio::join!(
            deliver(left.as_ref(), item.clone()),
            deliver(right.as_ref(), item),
        );
        keep_open(&mut left, l)?;
        keep_open(&mut right, r)?;
    }
    Ok(())
}

async fn deliver<T>(out: Option<&Emitter<T>>, item: T) -> Result<(), StageError> {
    match out {
        Some(out) => out.emit(item).await,
        None => Ok(()),
    }
}

/// Drops an output whose consumer went away; any other error ends the tee.
fn keep_open<T>(out: &mut Option<Emitter<T>>, res: Result<(), StageError>) -> Result<(), StageError> {
    match res {
        Err(StageError::Closed) => {
            *out = None;
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, Pipeline};
    use std::time::Duration;

    #[tokio::test]
    async fn tee_delivers_every_item_to_both() {
        let p = Pipeline::new(Config::default());
        let src = p.generator("src", vec![1, 2, 3]);
        let (a, b) = p.tee("tee", src);
        let (a, b) = tokio::join!(a.collect_all(), b.collect_all());
        assert_eq!(a, vec![1, 2, 3]);
        assert_eq!(b, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn tee_survives_one_consumer_leaving() {
        let p = Pipeline::new(Config::default());
        let src = p.generator("src", 0..50u32);
        let (a, b) = p.tee("tee", src);
        drop(b);
        assert_eq!(a.collect_all().await, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn bridge_flattens_in_order() {
        let p = Pipeline::new(Config::default());
        let inner: Vec<_> = (0..3u32)
            .map(|i| p.generator("inner", vec![i * 10, i * 10 + 1]))
            .collect();
        let outer = p.generator("outer", inner);
        let flat = p.bridge("bridge", outer);
        assert_eq!(flat.collect_all().await, vec![0, 1, 10, 11, 20, 21]);
    }

    #[tokio::test(start_paused = true)]
    async fn or_done_stops_on_cancel_even_if_producer_never_closes() {
        let p = Pipeline::new(Config::default());
        let (_held_open, foreign) = crate::sequence::channel::<u8>(Default::default(), 1);
        let guarded = p.or_done("guard", foreign);

        p.cancel();
        let ended = tokio::time::timeout(Duration::from_secs(1), guarded.collect_all()).await;
        assert_eq!(ended.unwrap(), Vec::<u8>::new());
    }
}
