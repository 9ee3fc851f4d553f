//! Engine context for model code.
//!
//! [`EngineContext`] bundles the state machine registry and the two string
//! pools. [`EngineContext::global`] hands out the process-wide instances;
//! [`EngineContext::new`] builds an isolated set, which is what tests and
//! embedders running several engines in one process use.

mod context;
pub mod logging;
pub mod snapshot;

pub use context::EngineContext;
pub use vigil_config::EngineConfig;
