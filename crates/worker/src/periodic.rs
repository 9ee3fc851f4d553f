use std::time::{Duration, Instant};

use crate::persister::BackgroundPersister;
use crate::sink::DataSink;
use crate::task::PersistTask;

/// Fires a persistence task once every `interval`.
///
/// The clock resets on every due tick, whether or not the runner accepted
/// the task, so a busy runner costs one missed snapshot rather than a retry
/// storm.
#[derive(Debug, Clone)]
pub struct PeriodicPersist {
	interval: Duration,
	last: Instant,
}

impl PeriodicPersist {
	pub fn new(interval: Duration, now: Instant) -> Self {
		Self { interval, last: now }
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn is_due(&self, now: Instant) -> bool {
		now.saturating_duration_since(self.last) >= self.interval
	}

	/// Starts a task built by `make_task` if the interval has elapsed.
	///
	/// `make_task` runs only when due. Returns whether a task was started.
	pub fn start_if_due<S, F>(&mut self, now: Instant, runner: &BackgroundPersister<S>, make_task: F) -> bool
	where
		S: DataSink,
		F: FnOnce() -> PersistTask<S>,
	{
		if !self.is_due(now) {
			return false;
		}
		self.last = now;
		if runner.is_busy() {
			tracing::warn!(runner = runner.thread_name(), "persist.periodic.skipped_busy");
			return false;
		}
		runner.start_persist(make_task())
	}
}
