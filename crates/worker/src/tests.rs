use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::*;

/// Task that blocks until the returned sender fires or is dropped.
fn held_task(started: mpsc::Sender<()>) -> (PersistTask<MemorySink>, mpsc::Sender<()>) {
	let (release_tx, release_rx) = mpsc::channel::<()>();
	let task = PersistTask::new(move |_sink: &mut MemorySink| {
		let _ = started.send(());
		let _ = release_rx.recv();
		Ok(())
	});
	(task, release_tx)
}

fn write_stream(name: &'static str, body: &'static [u8]) -> PersistTask<MemorySink> {
	PersistTask::new(move |sink: &mut MemorySink| {
		let mut stream = sink.open_stream(name)?;
		stream.write_all(body)?;
		sink.stream_complete(stream)?;
		Ok(())
	})
}

#[test]
fn empty_task_is_rejected() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(!runner.start_persist(PersistTask::empty()));
	assert!(!runner.is_busy());
	assert!(runner.wait_for_idle());
}

#[test]
fn wait_for_idle_without_worker_returns_immediately() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.wait_for_idle());
	assert!(runner.wait_for_idle());
}

#[test]
fn task_writes_to_sink() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(write_stream("model", b"state")));
	assert!(runner.wait_for_idle());
	assert!(!runner.is_busy());
	runner.with_sink(|sink| {
		assert_eq!(sink.get("model"), Some(&b"state"[..]));
		assert_eq!(sink.completed(), 1);
	});
}

#[test]
fn second_start_while_busy_is_rejected() {
	let runner = BackgroundPersister::new(MemorySink::new());
	let (started_tx, started_rx) = mpsc::channel();
	let (task, release) = held_task(started_tx);

	assert!(runner.start_persist(task));
	started_rx.recv().unwrap();
	assert!(runner.is_busy());

	let ran = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&ran);
	let rejected = PersistTask::new(move |_: &mut MemorySink| {
		flag.store(true, Ordering::SeqCst);
		Ok(())
	});
	assert!(!runner.start_persist(rejected));

	release.send(()).unwrap();
	assert!(runner.wait_for_idle());
	assert!(!runner.is_busy());
	assert!(!ran.load(Ordering::SeqCst), "rejected task must never run");
}

#[test]
fn concurrent_waiters_all_block_until_worker_exits() {
	let runner = BackgroundPersister::new(MemorySink::new());
	let (started_tx, started_rx) = mpsc::channel();
	let (task, release) = held_task(started_tx);
	assert!(runner.start_persist(task));
	started_rx.recv().unwrap();

	let outcomes = std::thread::scope(|scope| {
		let waiters: Vec<_> = (0..2)
			.map(|_| {
				scope.spawn(|| {
					let idle = runner.wait_for_idle();
					(idle, runner.is_busy())
				})
			})
			.collect();
		std::thread::sleep(Duration::from_millis(50));
		assert!(runner.is_busy(), "task is still held");
		release.send(()).unwrap();
		waiters.into_iter().map(|waiter| waiter.join().unwrap()).collect::<Vec<_>>()
	});

	assert_eq!(outcomes, [(true, false), (true, false)], "every waiter returns only once the worker is idle");
}

#[test]
fn restarts_after_idle() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(write_stream("a", b"1")));
	assert!(runner.wait_for_idle());
	assert!(runner.start_persist(write_stream("b", b"2")));
	assert!(runner.wait_for_idle());
	runner.with_sink(|sink| {
		assert_eq!(sink.names().collect::<Vec<_>>(), ["a", "b"]);
	});
}

#[test]
fn restarts_once_busy_clears_without_explicit_wait() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(write_stream("a", b"1")));
	let deadline = Instant::now() + Duration::from_secs(10);
	while runner.is_busy() {
		assert!(Instant::now() < deadline, "worker never went idle");
		std::thread::yield_now();
	}
	assert!(runner.start_persist(write_stream("a", b"2")));
	assert!(runner.wait_for_idle());
	runner.with_sink(|sink| assert_eq!(sink.get("a"), Some(&b"2"[..])));
}

#[test]
fn failing_task_clears_busy() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(PersistTask::new(|_: &mut MemorySink| anyhow::bail!("disk full"))));
	assert!(runner.wait_for_idle());
	assert!(!runner.is_busy());
	assert!(runner.start_persist(write_stream("after", b"ok")));
	assert!(runner.wait_for_idle());
}

#[test]
fn panicking_task_clears_busy() {
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(PersistTask::new(|_: &mut MemorySink| panic!("persist exploded"))));
	assert!(runner.wait_for_idle(), "panic is contained inside the worker");
	assert!(!runner.is_busy());
	assert!(runner.start_persist(write_stream("after", b"ok")));
	assert!(runner.wait_for_idle());
	runner.with_sink(|sink| assert_eq!(sink.get("after"), Some(&b"ok"[..])));
}

#[test]
fn captured_state_is_released_after_run() {
	let snapshot = Arc::new(vec![1u8, 2, 3]);
	let captured = Arc::clone(&snapshot);
	let runner = BackgroundPersister::new(MemorySink::new());
	assert!(runner.start_persist(PersistTask::new(move |sink: &mut MemorySink| {
		let mut stream = sink.open_stream("bytes")?;
		stream.write_all(&captured)?;
		sink.stream_complete(stream)?;
		Ok(())
	})));
	assert!(runner.wait_for_idle());
	assert_eq!(Arc::strong_count(&snapshot), 1);
}

#[test]
fn drop_waits_for_in_flight_task() {
	let finished = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&finished);
	{
		let runner = BackgroundPersister::new(MemorySink::new());
		assert!(runner.start_persist(PersistTask::new(move |_: &mut MemorySink| {
			std::thread::sleep(Duration::from_millis(50));
			flag.store(true, Ordering::SeqCst);
			Ok(())
		})));
	}
	assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn worker_thread_carries_configured_name() {
	let (tx, rx) = mpsc::channel();
	let runner = BackgroundPersister::with_thread_name("model-saver", MemorySink::new());
	assert!(runner.start_persist(PersistTask::new(move |_: &mut MemorySink| {
		let _ = tx.send(std::thread::current().name().map(str::to_owned));
		Ok(())
	})));
	assert!(runner.wait_for_idle());
	assert_eq!(rx.recv().unwrap().as_deref(), Some("model-saver"));
	assert_eq!(runner.thread_name(), "model-saver");
}

#[test]
fn dir_sink_only_publishes_completed_streams() {
	let dir = tempfile::tempdir().unwrap();
	let runner = BackgroundPersister::new(DirSink::new(dir.path().join("state")).unwrap());

	assert!(runner.start_persist(PersistTask::new(|sink: &mut DirSink| {
		let mut done = sink.open_stream("done.json")?;
		done.write_all(b"{}")?;
		sink.stream_complete(done)?;
		let mut abandoned = sink.open_stream("abandoned.json")?;
		abandoned.write_all(b"partial")?;
		Ok(())
	})));
	assert!(runner.wait_for_idle());

	let (done, abandoned) = runner.with_sink(|sink| (sink.path_of("done.json"), sink.path_of("abandoned.json")));
	assert_eq!(std::fs::read(done).unwrap(), b"{}");
	assert!(!abandoned.exists());
}

#[test]
fn dir_sink_rejects_path_like_names() {
	let dir = tempfile::tempdir().unwrap();
	let mut sink = DirSink::new(dir.path()).unwrap();
	for name in ["", ".", "..", "a/b", "x.partial"] {
		assert!(matches!(sink.open_stream(name), Err(SinkError::InvalidName(_))), "{name:?}");
	}
}

#[test]
fn periodic_fires_on_interval_and_resets_when_busy() {
	let start = Instant::now();
	let interval = Duration::from_secs(30);
	let mut periodic = PeriodicPersist::new(interval, start);
	let runner = BackgroundPersister::new(MemorySink::new());
	let built = AtomicUsize::new(0);
	let make = || {
		built.fetch_add(1, Ordering::SeqCst);
		write_stream("tick", b"t")
	};

	assert!(!periodic.start_if_due(start + Duration::from_secs(10), &runner, make));
	assert_eq!(built.load(Ordering::SeqCst), 0);

	assert!(periodic.start_if_due(start + interval, &runner, make));
	assert!(runner.wait_for_idle());

	let (started_tx, started_rx) = mpsc::channel();
	let (held, release) = held_task(started_tx);
	assert!(runner.start_persist(held));
	started_rx.recv().unwrap();

	let busy_tick = start + interval * 2;
	assert!(!periodic.start_if_due(busy_tick, &runner, make));
	assert!(!periodic.is_due(busy_tick + Duration::from_secs(1)), "clock resets on a skipped tick");

	release.send(()).unwrap();
	assert!(runner.wait_for_idle());
	assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn elapsed_millis_saturate() {
	use crate::persister::millis;
	assert_eq!(millis(Duration::from_millis(1500)), 1500);
	assert_eq!(millis(Duration::MAX), u64::MAX);
}
