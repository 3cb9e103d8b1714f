//! Producer stages: finite seeds, endless cycles, and generator functions.
//!
//! All of them stop as soon as the token fires or the consumer drops the sequence.

use crate::core::Pipeline;
use crate::sequence::Sequence;

impl Pipeline {
    /// Emits `values` in order, then closes.
    pub fn generator<T, I>(&self, name: &str, values: I) -> Sequence<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let values = values.into_iter();
        self.source(name, move |out| async move {
            for item in values {
                out.emit(item).await?;
            }
            Ok(())
        })
    }

    /// Cycles through `values` forever.
    ///
    /// An empty `values` closes immediately instead of spinning.
    pub fn repeat<T>(&self, name: &str, values: Vec<T>) -> Sequence<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.source(name, move |out| async move {
            if values.is_empty() {
                return Ok(());
            }
            loop {
                for item in &values {
                    out.emit(item.clone()).await?;
                }
            }
        })
    }

    /// Calls `f` forever and emits each result.
    pub fn repeat_fn<T, F>(&self, name: &str, mut f: F) -> Sequence<T>
    where
        T: Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        self.source(name, move |out| async move {
            loop {
                out.emit(f()).await?;
            }
        })
    }
}
