//! Type-erasure boundary for heterogeneous stage graphs.
//!
//! Stages are generic over their element type; [`Erased`] is the narrow escape hatch
//! for places that must carry mixed types through one sequence. Getting a concrete type
//! back is always an explicit, fallible [`Pipeline::downcast`].

use std::any::Any;

use crate::core::Pipeline;
use crate::error::StageError;
use crate::sequence::Sequence;

/// A type-erased sequence element.
pub type Erased = Box<dyn Any + Send>;

impl Pipeline {
    /// Boxes every item as [`Erased`].
    pub fn erase<T>(&self, name: &str, input: Sequence<T>) -> Sequence<Erased>
    where
        T: Send + 'static,
    {
        self.map(name, input, |item| Box::new(item) as Erased)
    }

    /// Converts [`Erased`] items back to `T`.
    ///
    /// The first item of another type ends the stage with
    /// [`StageError::Conversion`], reported as `StageFailed`.
    pub fn downcast<T>(&self, name: &str, input: Sequence<Erased>) -> Sequence<T>
    where
        T: Send + 'static,
    {
        self.stage(name, input, |mut input, out| async move {
            let token = out.token().clone();
            while let Some(item) = input.recv_or_cancel(&token).await {
                let item = item.downcast::<T>().map_err(|_| StageError::Conversion {
                    expected: std::any::type_name::<T>(),
                })?;
                out.emit(*item).await?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Erased;
    use crate::{Config, EventKind, Pipeline};

    #[tokio::test]
    async fn erase_then_downcast_restores_items() {
        let p = Pipeline::new(Config::default());
        let nums = p.generator("nums", vec![3u16, 1, 4]);
        let erased = p.erase("erase", nums);
        let back = p.downcast::<u16>("downcast", erased);
        assert_eq!(back.collect_all().await, vec![3, 1, 4]);
    }

    #[tokio::test]
    async fn wrong_type_fails_the_stage() {
        let p = Pipeline::new(Config::default());
        let mut events = p.events();
        let mixed = p.generator(
            "mixed",
            vec![Box::new(1i64) as Erased, Box::new("two") as Erased],
        );
        let ints = p.downcast::<i64>("ints", mixed);
        assert_eq!(ints.collect_all().await, vec![1]);

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::StageFailed {
                assert_eq!(ev.reason.as_deref(), Some("expected i64"));
                break;
            }
        }
    }
}
