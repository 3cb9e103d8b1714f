//! # Sequences: the data path between stages.
//!
//! A stage owns exactly one output [`Sequence`] and fills it through the matching
//! [`Emitter`]. Both wrap a bounded `tokio::sync::mpsc` channel:
//!
//! ```text
//!  stage worker                        downstream
//!  Emitter<T> ──[ capacity N buffer ]──► Sequence<T>
//!      │                                   │
//!      └─ drop ⇒ sequence closed           └─ recv() == None once closed and drained
//! ```
//!
//! ## Rules
//! - **Backpressure**: `emit` suspends while the buffer is full; `recv` suspends while empty.
//! - **Closed exactly once**: closing is tied to dropping the emitter, so every exit
//!   path of a worker (return, `?`, panic) closes the output.
//! - **Cancel-aware**: [`Emitter::emit`] and [`Sequence::recv_or_cancel`] are the
//!   uniform "select on token or operation" wrappers every stage uses.
//! - Capacity is clamped to a minimum of 1; tokio channels have no rendezvous mode.

mod heartbeat;

pub use heartbeat::{Heartbeat, Liveness, Pulse, Pulser, pulse_channel};

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;

/// Creates a connected emitter/sequence pair.
///
/// The emitter observes `token` on every send.
pub fn channel<T>(token: CancellationToken, capacity: usize) -> (Emitter<T>, Sequence<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Emitter { tx, token }, Sequence { rx })
}

/// Receiving half: a finite-or-infinite lazy sequence produced by one stage.
#[derive(Debug)]
pub struct Sequence<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Sequence<T> {
    /// Receives the next item, or `None` once the producer is done and the buffer drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receives the next item unless `token` fires first.
    ///
    /// Returns `None` both on cancellation and on end of sequence; callers that need to
    /// tell them apart check the token.
    pub async fn recv_or_cancel(&mut self, token: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    /// Returns the next item if one is buffered right now.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Returns `true` once the producer is gone and nothing is buffered.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if nothing is buffered right now.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Drains the sequence into a `Vec` until it closes.
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = self.rx.recv().await {
            out.push(item);
        }
        out
    }
}

impl<T> Stream for Sequence<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending half owned by a stage worker.
///
/// Dropping the emitter closes the sequence.
#[derive(Debug)]
pub struct Emitter<T> {
    tx: mpsc::Sender<T>,
    token: CancellationToken,
}

impl<T> Emitter<T> {
    /// Sends `item` downstream, waiting for buffer space.
    ///
    /// ### Errors
    /// - [`StageError::Canceled`] if the token fires first (the item is dropped)
    /// - [`StageError::Closed`] if the consumer dropped the sequence
    pub async fn emit(&self, item: T) -> Result<(), StageError> {
        if self.token.is_cancelled() {
            return Err(StageError::Canceled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StageError::Canceled),
            res = self.tx.send(item) => res.map_err(|_| StageError::Closed),
        }
    }

    /// Sends `item` only if there is buffer space right now.
    ///
    /// Returns the item back when it could not be delivered.
    pub fn try_emit(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) | mpsc::error::TrySendError::Closed(v) => v,
        })
    }

    /// The token this emitter observes.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` if the stage should stop: cancelled or consumer gone.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// Completes when the consumer drops the sequence.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            token: self.token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn dropping_emitter_closes_sequence() {
        let (tx, mut rx) = channel::<u32>(CancellationToken::new(), 4);
        tx.emit(1).await.unwrap();
        drop(tx);
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
        assert!(rx.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn emit_on_full_buffer_unblocks_on_cancel() {
        let token = CancellationToken::new();
        let (tx, _rx) = channel::<u32>(token.clone(), 1);
        tx.emit(1).await.unwrap();

        let blocked = tokio::spawn(async move { tx.emit(2).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!blocked.is_finished());

        token.cancel();
        assert_eq!(blocked.await.unwrap(), Err(StageError::Canceled));
    }

    #[tokio::test]
    async fn emit_after_consumer_drop_reports_closed() {
        let (tx, rx) = channel::<u32>(CancellationToken::new(), 1);
        drop(rx);
        assert_eq!(tx.emit(7).await, Err(StageError::Closed));
        assert!(tx.is_done());
    }

    #[tokio::test]
    async fn recv_or_cancel_returns_none_when_cancelled() {
        let token = CancellationToken::new();
        let (_tx, mut rx) = channel::<u32>(token.clone(), 1);
        token.cancel();
        assert_eq!(rx.recv_or_cancel(&token).await, None);
    }

    #[tokio::test]
    async fn capacity_zero_is_clamped() {
        let (tx, rx) = channel::<u32>(CancellationToken::new(), 0);
        assert!(tx.try_emit(1).is_ok());
        assert_eq!(tx.try_emit(2), Err(2));
        drop(tx);
        assert_eq!(rx.collect::<Vec<_>>().await, vec![1]);
    }
}
