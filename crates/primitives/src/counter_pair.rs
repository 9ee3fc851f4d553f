use std::sync::atomic::{AtomicUsize, Ordering};

/// Reader/writer announcement counters.
///
/// Readers and writers each bump their own counter and then inspect the
/// other one. That is a store-then-load handshake on two different
/// locations, so every operation here is `SeqCst`: with acquire/release
/// alone a reader's increment and a writer's check may be reordered and both
/// sides would proceed.
///
/// The pair never blocks. Callers decide what to do when the other side is
/// active, usually by taking a slower but still correct path.
#[derive(Debug, Default)]
pub struct AtomicCounterPair {
	readers: AtomicUsize,
	writers: AtomicUsize,
}

impl AtomicCounterPair {
	pub const fn new() -> Self {
		Self {
			readers: AtomicUsize::new(0),
			writers: AtomicUsize::new(0),
		}
	}

	/// Announces an in-flight read.
	#[inline]
	pub fn enter_reader(&self) {
		self.readers.fetch_add(1, Ordering::SeqCst);
	}

	/// Retires a read. Returns `true` if this was the last reader in flight.
	#[inline]
	pub fn leave_reader(&self) -> bool {
		let prev = self.readers.fetch_sub(1, Ordering::SeqCst);
		debug_assert!(prev > 0, "reader count underflow");
		prev == 1
	}

	/// Returns `true` while any writer has announced itself.
	#[inline]
	pub fn writer_active(&self) -> bool {
		self.writers.load(Ordering::SeqCst) != 0
	}

	/// Announces an intended write.
	#[inline]
	pub fn enter_writer(&self) {
		self.writers.fetch_add(1, Ordering::SeqCst);
	}

	/// Retires a write announcement.
	#[inline]
	pub fn leave_writer(&self) {
		let prev = self.writers.fetch_sub(1, Ordering::SeqCst);
		debug_assert!(prev > 0, "writer count underflow");
	}

	/// Announces a write and returns a guard that retires it on drop.
	pub fn announce_writer(&self) -> WriterGuard<'_> {
		self.enter_writer();
		WriterGuard { pair: self }
	}

	/// Spins until no reader is in flight.
	///
	/// Only meaningful while a writer is announced: new readers then back
	/// off immediately, so the count can only fall.
	pub fn wait_for_readers(&self) {
		let mut spins = 0u32;
		while self.readers.load(Ordering::SeqCst) != 0 {
			if spins < 64 {
				std::hint::spin_loop();
				spins += 1;
			} else {
				std::thread::yield_now();
			}
		}
	}

	/// Current number of in-flight readers.
	pub fn readers(&self) -> usize {
		self.readers.load(Ordering::SeqCst)
	}

	/// Current number of announced writers.
	pub fn writers(&self) -> usize {
		self.writers.load(Ordering::SeqCst)
	}
}

/// Scoped writer announcement.
#[must_use = "dropping the guard retires the writer immediately"]
pub struct WriterGuard<'a> {
	pair: &'a AtomicCounterPair,
}

impl Drop for WriterGuard<'_> {
	fn drop(&mut self) {
		self.pair.leave_writer();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[test]
	fn last_reader_is_reported() {
		let pair = AtomicCounterPair::new();
		pair.enter_reader();
		pair.enter_reader();
		assert!(!pair.leave_reader());
		assert!(pair.leave_reader());
		assert_eq!(pair.readers(), 0);
	}

	#[test]
	fn writer_guard_retires_on_drop() {
		let pair = AtomicCounterPair::new();
		{
			let _guard = pair.announce_writer();
			assert!(pair.writer_active());
			assert_eq!(pair.writers(), 1);
		}
		assert!(!pair.writer_active());
	}

	#[test]
	fn wait_for_readers_returns_once_drained() {
		let pair = Arc::new(AtomicCounterPair::new());
		pair.enter_reader();

		let _guard = pair.announce_writer();
		let reader = {
			let pair = Arc::clone(&pair);
			std::thread::spawn(move || {
				std::thread::sleep(std::time::Duration::from_millis(20));
				pair.leave_reader();
			})
		};

		pair.wait_for_readers();
		assert_eq!(pair.readers(), 0);
		reader.join().unwrap();
	}

	#[test]
	fn proceeding_readers_never_overlap_a_write() {
		use std::sync::atomic::AtomicBool;

		let pair = Arc::new(AtomicCounterPair::new());
		let writing = Arc::new(AtomicBool::new(false));
		let mut threads = Vec::new();

		for _ in 0..4 {
			let pair = Arc::clone(&pair);
			let writing = Arc::clone(&writing);
			threads.push(std::thread::spawn(move || {
				for _ in 0..20_000 {
					pair.enter_reader();
					if !pair.writer_active() {
						assert!(!writing.load(Ordering::SeqCst), "reader overlapped a write");
					}
					pair.leave_reader();
				}
			}));
		}
		for _ in 0..2 {
			let pair = Arc::clone(&pair);
			let writing = Arc::clone(&writing);
			threads.push(std::thread::spawn(move || {
				for _ in 0..5_000 {
					pair.enter_reader();
					pair.enter_writer();
					if pair.leave_reader() {
						writing.store(true, Ordering::SeqCst);
						std::hint::spin_loop();
						writing.store(false, Ordering::SeqCst);
					}
					pair.leave_writer();
				}
			}));
		}

		for t in threads {
			t.join().unwrap();
		}
		assert_eq!(pair.readers(), 0);
		assert_eq!(pair.writers(), 0);
	}
}
