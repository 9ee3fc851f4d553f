use std::borrow::Borrow;
use std::cell::UnsafeCell;
use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use vigil_primitives::AtomicCounterPair;

use crate::IStr;

/// Pool of canonical shared strings.
///
/// # Concurrency
///
/// The table is read without a lock. Readers and writers announce themselves
/// on an [`AtomicCounterPair`]:
///
/// - A reader that sees no writer looks the value up directly.
/// - A reader that misses announces a write and retires its read. If it was
///   the last reader it takes the mutex and inserts; otherwise it gives up.
/// - Anyone who finds the other side busy returns a private, non-interned
///   copy. `get` therefore never blocks; contention costs a missed
///   de-duplication, never a stall or a wrong answer.
///
/// Maintenance (`prune*`, `clear*`, size queries) takes the mutex. Passes
/// that mutate the table also announce a write and wait for in-flight
/// readers to drain, so a racing `get` falls back rather than observing the
/// table mid-mutation.
pub struct StringStore {
	label: &'static str,
	gate: AtomicCounterPair,
	/// Written only by a holder of `maintenance` that has announced a write
	/// and seen the reader count reach zero.
	strings: UnsafeCell<FxHashSet<IStr>>,
	maintenance: Mutex<Removed>,
	fallbacks: AtomicU64,
}

// SAFETY: `strings` is only mutated under the protocol documented on the
// field; shared reads happen either under `maintenance` or as an announced
// reader that saw no writer.
unsafe impl Sync for StringStore {}

/// Values marked for removal at the next prune.
#[derive(Default)]
struct Removed(FxHashSet<String>);

impl StringStore {
	pub fn new(label: &'static str) -> Self {
		Self::with_capacity(label, 0)
	}

	pub fn with_capacity(label: &'static str, capacity: usize) -> Self {
		Self {
			label,
			gate: AtomicCounterPair::new(),
			strings: UnsafeCell::new(FxHashSet::with_capacity_and_hasher(capacity, Default::default())),
			maintenance: Mutex::new(Removed::default()),
			fallbacks: AtomicU64::new(0),
		}
	}

	/// Process-wide pool of field names.
	pub fn names() -> &'static Self {
		static NAMES: OnceLock<StringStore> = OnceLock::new();
		NAMES.get_or_init(|| Self::new("names"))
	}

	/// Process-wide pool of influencer field values.
	pub fn influencers() -> &'static Self {
		static INFLUENCERS: OnceLock<StringStore> = OnceLock::new();
		INFLUENCERS.get_or_init(|| Self::new("influencers"))
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Returns the canonical handle for `value`, inserting it if needed.
	///
	/// Under contention the result may be a private copy that is equal by
	/// content but not shared with the pool.
	pub fn get(&self, value: &str) -> IStr {
		self.gate.enter_reader();
		if self.gate.writer_active() {
			self.gate.leave_reader();
			return self.private_copy(value);
		}

		// SAFETY: announced reader, and no writer was active after we announced.
		if let Some(existing) = unsafe { self.table() }.get(value) {
			let existing = existing.clone();
			self.gate.leave_reader();
			return existing;
		}

		let _writer = self.gate.announce_writer();
		if !self.gate.leave_reader() {
			return self.private_copy(value);
		}

		let _lock = self.maintenance.lock();
		// SAFETY: we hold the lock, our write is announced, and we were the
		// last reader; later readers see the announcement and back off.
		let strings = unsafe { self.table_mut() };
		if let Some(existing) = strings.get(value) {
			return existing.clone();
		}
		let interned = IStr::from(value);
		strings.insert(interned.clone());
		interned
	}

	/// Marks `value` for removal at the next [`Self::prune`].
	pub fn remove(&self, value: &str) {
		self.maintenance.lock().0.insert(value.to_owned());
	}

	/// Drops marked values that nothing outside the pool still holds.
	///
	/// Marked values that are still in use stay marked. Returns the number
	/// of entries dropped.
	pub fn prune(&self) -> usize {
		self.prune_marked(|_| true)
	}

	/// Like [`Self::prune`], but never drops a value contained in `keep`.
	pub fn prune_removed_not_in<S, H>(&self, keep: &HashSet<S, H>) -> usize
	where
		S: Borrow<str> + Hash + Eq,
		H: BuildHasher,
	{
		self.prune_marked(|value| !keep.contains(value))
	}

	/// Drops every unreferenced entry whose value is not in `keep`, marked or not.
	pub fn prune_not_in<S, H>(&self, keep: &HashSet<S, H>) -> usize
	where
		S: Borrow<str> + Hash + Eq,
		H: BuildHasher,
	{
		let mut removed = self.maintenance.lock();
		let before;
		let after;
		{
			let _writer = self.exclusive();
			// SAFETY: lock held, write announced, readers drained.
			let strings = unsafe { self.table_mut() };
			before = strings.len();
			strings.retain(|s| !s.is_unique() || keep.contains(s.as_str()));
			after = strings.len();
		}
		removed.0.clear();
		let pruned = before - after;
		tracing::debug!(pool = self.label, pruned, remaining = after, "intern.prune_not_in");
		pruned
	}

	fn prune_marked(&self, eligible: impl Fn(&str) -> bool) -> usize {
		let mut removed = self.maintenance.lock();
		if removed.0.is_empty() {
			return 0;
		}

		let mut pruned = 0;
		let remaining;
		{
			let _writer = self.exclusive();
			// SAFETY: lock held, write announced, readers drained.
			let strings = unsafe { self.table_mut() };
			removed.0.retain(|value| {
				let Some(entry) = strings.get(value.as_str()) else {
					return false;
				};
				if !entry.is_unique() || !eligible(value.as_str()) {
					return true;
				}
				strings.remove(value.as_str());
				pruned += 1;
				false
			});
			remaining = strings.len();
		}
		tracing::debug!(pool = self.label, pruned, remaining, still_marked = removed.0.len(), "intern.prune");
		pruned
	}

	/// Empties the pool and the removal marks.
	pub fn clear_everything_test_only(&self) {
		let mut removed = self.maintenance.lock();
		let _writer = self.exclusive();
		// SAFETY: lock held, write announced, readers drained.
		unsafe { self.table_mut() }.clear();
		removed.0.clear();
	}

	/// Number of canonical entries.
	pub fn len(&self) -> usize {
		let _lock = self.maintenance.lock();
		// SAFETY: mutation requires the lock we hold.
		unsafe { self.table() }.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns `true` if `value` has a canonical entry.
	pub fn contains(&self, value: &str) -> bool {
		let _lock = self.maintenance.lock();
		// SAFETY: mutation requires the lock we hold.
		unsafe { self.table() }.contains(value)
	}

	/// Approximate bytes retained by the pool.
	pub fn memory_usage(&self) -> usize {
		let removed = self.maintenance.lock();
		// SAFETY: mutation requires the lock we hold.
		let strings = unsafe { self.table() };
		let table = strings.capacity() * std::mem::size_of::<IStr>();
		let contents: usize = strings.iter().map(IStr::heap_size).sum();
		let marks: usize = removed.0.iter().map(|s| std::mem::size_of::<String>() + s.capacity()).sum();
		table + contents + marks
	}

	/// Number of `get` calls answered with a private copy.
	pub fn fallbacks(&self) -> u64 {
		self.fallbacks.load(Ordering::Relaxed)
	}

	fn private_copy(&self, value: &str) -> IStr {
		self.fallbacks.fetch_add(1, Ordering::Relaxed);
		tracing::trace!(pool = self.label, "intern.fallback");
		IStr::from(value)
	}

	#[cfg(test)]
	pub(crate) fn gate(&self) -> &AtomicCounterPair {
		&self.gate
	}

	/// Announces a write and waits until no reader is looking at the table.
	fn exclusive(&self) -> vigil_primitives::WriterGuard<'_> {
		let writer = self.gate.announce_writer();
		self.gate.wait_for_readers();
		writer
	}

	/// # Safety
	///
	/// The caller must either hold `maintenance` or be an announced reader
	/// that observed no active writer after announcing.
	unsafe fn table(&self) -> &FxHashSet<IStr> {
		// SAFETY: upheld by the caller.
		unsafe { &*self.strings.get() }
	}

	/// # Safety
	///
	/// The caller must hold `maintenance`, have an announced write, and have
	/// observed the reader count reach zero after announcing.
	#[allow(clippy::mut_from_ref)]
	unsafe fn table_mut(&self) -> &mut FxHashSet<IStr> {
		// SAFETY: upheld by the caller.
		unsafe { &mut *self.strings.get() }
	}
}

impl std::fmt::Debug for StringStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StringStore")
			.field("label", &self.label)
			.field("len", &self.len())
			.field("fallbacks", &self.fallbacks())
			.finish()
	}
}

/// Bytes retained by both process-wide pools.
pub fn memory_usage() -> usize {
	StringStore::names().memory_usage() + StringStore::influencers().memory_usage()
}
