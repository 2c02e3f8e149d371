//! Signal aggregation runtime: source subscription + batching loop + dispatch.

pub mod config;
pub mod dispatch;
mod disposition;
mod error;
mod gate;
pub mod kind;
pub mod paths;
mod processor;
pub mod source;

pub use config::{ProcessorConfig, ResumePolicy};
pub use dispatch::{Batch, SignalHandler};
pub use error::SignalError;
pub use kind::{SignalKind, SignalSet};
pub use processor::{LifecycleState, SignalProcessor};
pub use source::{SignalInjector, SignalSource};
