use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::panic::panic_message;
use crate::sink::DataSink;
use crate::spawn::spawn_named_thread;
use crate::task::{PersistFn, PersistTask};

/// Worker thread name used by [`BackgroundPersister::new`].
pub const DEFAULT_THREAD_NAME: &str = "vigil-persist";

/// Runs persistence tasks on a dedicated thread, one at a time.
///
/// The runner is `Idle` or `Busy`. [`Self::start_persist`] moves it to
/// `Busy`; the worker moves it back when its task returns, fails or panics.
/// Dropping the runner waits for the worker.
///
/// There is no cancellation: an in-flight task always runs to completion.
pub struct BackgroundPersister<S: DataSink> {
	thread_name: String,
	shared: Arc<Shared<S>>,
	/// Join handle of the most recent worker. Held across a whole
	/// `start_persist` and across the join in `wait_for_idle`.
	worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<S> {
	state: Mutex<State<S>>,
	sink: Mutex<S>,
}

struct State<S> {
	busy: bool,
	task: Option<PersistFn<S>>,
}

impl<S: DataSink> BackgroundPersister<S> {
	pub fn new(sink: S) -> Self {
		Self::with_thread_name(DEFAULT_THREAD_NAME, sink)
	}

	pub fn with_thread_name(thread_name: impl Into<String>, sink: S) -> Self {
		Self {
			thread_name: thread_name.into(),
			shared: Arc::new(Shared {
				state: Mutex::new(State { busy: false, task: None }),
				sink: Mutex::new(sink),
			}),
			worker: Mutex::new(None),
		}
	}

	/// Returns `true` while a task is in flight.
	pub fn is_busy(&self) -> bool {
		self.shared.state.lock().busy
	}

	/// Starts `task` on a new worker thread.
	///
	/// Returns `false` without doing anything if `task` is empty or a task is
	/// already in flight. Callers retry on a later tick.
	pub fn start_persist(&self, task: PersistTask<S>) -> bool {
		let Some(work) = task.into_inner() else {
			tracing::debug!(runner = %self.thread_name, "persist.start.empty");
			return false;
		};

		let mut worker = self.worker.lock();
		if self.is_busy() {
			tracing::debug!(runner = %self.thread_name, "persist.start.busy");
			return false;
		}
		// Not busy, so the previous worker has finished its task and only
		// needs reaping.
		if let Some(previous) = worker.take() {
			reap(&self.thread_name, previous);
		}

		{
			let mut state = self.shared.state.lock();
			state.task = Some(work);
			state.busy = true;
		}

		let shared = Arc::clone(&self.shared);
		let span = tracing::Span::current();
		let runner = self.thread_name.clone();
		match spawn_named_thread(self.thread_name.clone(), move || {
			let _entered = span.enter();
			run_worker(&runner, &shared);
		}) {
			Ok(handle) => {
				tracing::debug!(runner = %self.thread_name, "persist.start");
				*worker = Some(handle);
				true
			}
			Err(error) => {
				let mut state = self.shared.state.lock();
				state.task = None;
				state.busy = false;
				tracing::error!(runner = %self.thread_name, %error, "persist.start.spawn_failed");
				false
			}
		}
	}

	/// Blocks until the current worker, if any, has exited.
	///
	/// Returns `true` immediately if no worker was ever started. Returns
	/// `false` only if the worker thread itself died abnormally.
	///
	/// The join happens under the worker lock, so concurrent waiters queue
	/// behind it and none returns while the task is still running.
	pub fn wait_for_idle(&self) -> bool {
		let mut worker = self.worker.lock();
		match worker.take() {
			None => true,
			Some(handle) => reap(&self.thread_name, handle),
		}
	}

	/// Runs `f` against the sink on the calling thread.
	///
	/// Blocks while a task holds the sink.
	pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
		f(&mut self.shared.sink.lock())
	}

	pub fn thread_name(&self) -> &str {
		&self.thread_name
	}
}

impl<S: DataSink> Drop for BackgroundPersister<S> {
	fn drop(&mut self) {
		self.wait_for_idle();
	}
}

impl<S: DataSink> std::fmt::Debug for BackgroundPersister<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BackgroundPersister")
			.field("thread_name", &self.thread_name)
			.field("busy", &self.is_busy())
			.finish()
	}
}

fn reap(runner: &str, handle: JoinHandle<()>) -> bool {
	match handle.join() {
		Ok(()) => true,
		Err(payload) => {
			tracing::error!(
				runner,
				panic = panic_message(&*payload).as_deref().unwrap_or("<opaque>"),
				"persist.worker.died"
			);
			false
		}
	}
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
pub(crate) fn millis(elapsed: Duration) -> u64 {
	u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Clears the busy flag however the worker body exits.
struct IdleOnExit<'a, S>(&'a Shared<S>);

impl<S> Drop for IdleOnExit<'_, S> {
	fn drop(&mut self) {
		self.0.state.lock().busy = false;
	}
}

fn run_worker<S: DataSink>(runner: &str, shared: &Shared<S>) {
	let _idle = IdleOnExit(shared);
	let Some(work) = shared.state.lock().task.take() else {
		return;
	};

	let started = Instant::now();
	let outcome = {
		let mut sink = shared.sink.lock();
		// The task and everything it captured are dropped when the call
		// returns, before the busy flag is cleared.
		std::panic::catch_unwind(AssertUnwindSafe(|| work(&mut *sink)))
	};
	let elapsed_ms = millis(started.elapsed());

	match outcome {
		Ok(Ok(())) => tracing::debug!(runner, elapsed_ms, "persist.done"),
		Ok(Err(error)) => tracing::warn!(runner, elapsed_ms, error = %format_args!("{error:#}"), "persist.failed"),
		Err(payload) => tracing::error!(
			runner,
			elapsed_ms,
			panic = panic_message(&*payload).as_deref().unwrap_or("<opaque>"),
			"persist.panicked"
		),
	}
}
