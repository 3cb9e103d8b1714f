//! 1:1 and filtering transforms built on [`Pipeline::stage`].

use crate::core::Pipeline;
use crate::error::StageError;
use crate::sequence::Sequence;

impl Pipeline {
    /// Applies `f` to every item, preserving order.
    pub fn map<T, U, F>(&self, name: &str, input: Sequence<T>, mut f: F) -> Sequence<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.stage(name, input, move |mut input, out| async move {
            let token = out.token().clone();
            while let Some(item) = input.recv_or_cancel(&token).await {
                out.emit(f(item)).await?;
            }
            Ok(())
        })
    }

    /// Applies a fallible `f` to every item, preserving order.
    ///
    /// The first error ends the stage: the output closes and the error is published
    /// as `StageFailed`.
    pub fn try_map<T, U, E, F>(&self, name: &str, input: Sequence<T>, mut f: F) -> Sequence<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: std::fmt::Display,
        F: FnMut(T) -> Result<U, E> + Send + 'static,
    {
        self.stage(name, input, move |mut input, out| async move {
            let token = out.token().clone();
            while let Some(item) = input.recv_or_cancel(&token).await {
                let mapped = f(item).map_err(StageError::fail)?;
                out.emit(mapped).await?;
            }
            Ok(())
        })
    }

    /// Forwards only the items for which `pred` returns `true`.
    pub fn filter<T, F>(&self, name: &str, input: Sequence<T>, mut pred: F) -> Sequence<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send + 'static,
    {
        self.stage(name, input, move |mut input, out| async move {
            let token = out.token().clone();
            while let Some(item) = input.recv_or_cancel(&token).await {
                if pred(&item) {
                    out.emit(item).await?;
                }
            }
            Ok(())
        })
    }

    /// Forwards the first `n` items, then closes.
    ///
    /// Dropping `input` on exit lets the upstream stage observe `Closed` and stop.
    pub fn take<T>(&self, name: &str, input: Sequence<T>, n: usize) -> Sequence<T>
    where
        T: Send + 'static,
    {
        self.stage(name, input, move |mut input, out| async move {
            let token = out.token().clone();
            for _ in 0..n {
                match input.recv_or_cancel(&token).await {
                    Some(item) => out.emit(item).await?,
                    None => break,
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, EventKind, Pipeline};

    fn pipeline() -> Pipeline {
        Pipeline::new(Config::default())
    }

    #[tokio::test]
    async fn map_filter_take_compose() {
        let p = pipeline();
        let nums = p.generator("nums", (1..=20).collect::<Vec<u32>>());
        let squares = p.map("square", nums, |n| n * n);
        let odd = p.filter("odd", squares, |n| n % 2 == 1);
        let first = p.take("first", odd, 3);
        assert_eq!(first.collect_all().await, vec![1, 9, 25]);
    }

    #[tokio::test]
    async fn take_stops_an_infinite_upstream() {
        let p = pipeline();
        let mut events = p.events();
        let ones = p.repeat("ones", vec![1u8]);
        let five = p.take("five", ones, 5);
        assert_eq!(five.collect_all().await, vec![1; 5]);

        p.join().await;
        let mut stopped = Vec::new();
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::StageStopped {
                stopped.push(ev.stage.unwrap().to_string());
            }
        }
        stopped.sort();
        assert_eq!(stopped, vec!["five", "ones"]);
    }

    #[tokio::test]
    async fn try_map_stops_at_first_error() {
        let p = pipeline();
        let mut events = p.events();
        let raw = p.generator("raw", vec!["1", "2", "x", "4"]);
        let parsed = p.try_map("parse", raw, |s| s.parse::<i32>());
        assert_eq!(parsed.collect_all().await, vec![1, 2]);

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::StageFailed {
                assert_eq!(ev.stage.as_deref(), Some("parse"));
                assert!(ev.reason.as_deref().unwrap().contains("invalid digit"));
                break;
            }
        }
    }
}
