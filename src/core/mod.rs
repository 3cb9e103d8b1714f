//! Runtime core: the pipeline handle and its lifecycle.
//!
//! Public API from this module: [`Pipeline`], [`PipelineBuilder`], [`Config`].
//!
//! Internal modules:
//! - [`pipeline`]: the cloneable handle, scoped tokens, graceful shutdown;
//! - [`builder`]: wires bus, subscribers, and the alive tracker;
//! - [`runner`]: spawns one stage worker and publishes its lifecycle events;
//! - [`alive`]: live stage set used to name stuck stages;
//! - [`shutdown`]: cross-platform termination signals.

mod alive;
mod builder;
mod config;
mod pipeline;
mod runner;
mod shutdown;

pub use builder::PipelineBuilder;
pub use config::Config;
pub use pipeline::Pipeline;
