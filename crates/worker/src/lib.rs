//! Background persistence.
//!
//! A [`BackgroundPersister`] owns one data sink and at most one worker
//! thread. [`BackgroundPersister::start_persist`] hands a [`PersistTask`] to
//! a freshly spawned thread and returns immediately; a second request while
//! the first is in flight is rejected, not queued, so at most one snapshot
//! of model state is alive at a time.

mod panic;
mod periodic;
mod persister;
mod sink;
mod spawn;
mod task;

pub use panic::panic_message;
pub use periodic::PeriodicPersist;
pub use persister::{BackgroundPersister, DEFAULT_THREAD_NAME};
pub use sink::{DataSink, DirSink, DirStream, MemorySink, MemoryStream, SinkError};
pub use spawn::spawn_named_thread;
pub use task::{PersistFn, PersistTask};

#[cfg(test)]
mod tests;
