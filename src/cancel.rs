//! # Composite cancellation.
//!
//! [`or`] derives a single [`CancellationToken`] that fires as soon as **any** of its
//! inputs fires. A component uses it to build "stop if the whole operation stops OR if
//! I decide to stop just this child"; the [`Steward`](crate::Steward) hands each ward
//! `or(&[steward_token, ward_token])`.
//!
//! ## Construction
//! ```text
//! or([])              → fresh token that nothing cancels
//! or([a])             → a
//! or([a, b])          → watcher { a | b | derived }
//! or([a, b, c, ...])  → watcher { a | b | c | or([rest..., derived]) | derived }
//! ```
//! Each watcher observes at most four tokens; passing `derived` down the recursion lets
//! the whole tree of watchers exit once the result has fired.
//!
//! ## Rules
//! - Must be called from within a tokio runtime (watchers are spawned tasks).
//! - Watchers are parked until something fires; an `or` over tokens that never fire
//!   keeps its watchers alive for as long as the runtime runs.

use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled once any of `tokens` is cancelled.
///
/// # Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use pipevisor::cancel::or;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let global = CancellationToken::new();
/// let local = CancellationToken::new();
/// let either = or(&[global.clone(), local.clone()]);
///
/// local.cancel();
/// either.cancelled().await;
/// assert!(!global.is_cancelled());
/// # }
/// ```
pub fn or(tokens: &[CancellationToken]) -> CancellationToken {
    match tokens {
        [] => CancellationToken::new(),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let derived = CancellationToken::new();
            if tokens.iter().any(CancellationToken::is_cancelled) {
                derived.cancel();
                return derived;
            }
            spawn_watcher(first.clone(), rest.to_vec(), derived.clone());
            derived
        }
    }
}

fn spawn_watcher(first: CancellationToken, rest: Vec<CancellationToken>, derived: CancellationToken) {
    tokio::spawn(async move {
        match rest.as_slice() {
            [second] => {
                tokio::select! {
                    _ = first.cancelled() => {}
                    _ = second.cancelled() => {}
                    _ = derived.cancelled() => {}
                }
            }
            [second, third] => {
                tokio::select! {
                    _ = first.cancelled() => {}
                    _ = second.cancelled() => {}
                    _ = third.cancelled() => {}
                    _ = derived.cancelled() => {}
                }
            }
            [second, third, remainder @ ..] => {
                let mut tail = remainder.to_vec();
                tail.push(derived.clone());
                let subtree = or(&tail);
                tokio::select! {
                    _ = first.cancelled() => {}
                    _ = second.cancelled() => {}
                    _ = third.cancelled() => {}
                    _ = subtree.cancelled() => {}
                }
            }
            [] => return,
        }
        derived.cancel();
    });
}
