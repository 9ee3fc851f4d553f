//! Append-only storage with lock-free reads.
//!
//! Entries live in segments of doubling size so that an entry never moves
//! once written. Segment `k` holds `2^k` entries; index `i` lives in segment
//! `floor(log2(i + 1))`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::MutexGuard;

const SEGMENTS: usize = 32;

/// Largest number of entries the store can hold.
pub(crate) const CAPACITY: usize = u32::MAX as usize;

pub(crate) struct AppendOnly<T> {
	segments: [OnceLock<Box<[OnceLock<T>]>>; SEGMENTS],
	published: AtomicUsize,
}

impl<T> AppendOnly<T> {
	pub(crate) fn new() -> Self {
		Self {
			segments: [const { OnceLock::new() }; SEGMENTS],
			published: AtomicUsize::new(0),
		}
	}

	/// Number of entries visible to this thread.
	///
	/// Pairs with the release store in [`Self::push`]: every index below the
	/// returned count refers to a fully written entry.
	#[inline]
	pub(crate) fn published(&self) -> usize {
		self.published.load(Ordering::Acquire)
	}

	#[inline]
	pub(crate) fn get(&self, index: usize) -> Option<&T> {
		if index >= self.published() {
			return None;
		}
		let (segment, offset) = locate(index);
		self.segments[segment].get()?.get(offset)?.get()
	}

	/// Iterates over the first `len` entries with their indices.
	///
	/// `len` must come from [`Self::published`].
	pub(crate) fn iter(&self, len: usize) -> impl Iterator<Item = (usize, &T)> + '_ {
		(0..len).filter_map(move |index| {
			let (segment, offset) = locate(index);
			let entry = self.segments[segment].get()?.get(offset)?.get()?;
			Some((index, entry))
		})
	}

	/// Appends `value`, returning its index, or gives it back when full.
	///
	/// Requires the caller's insert lock: there is exactly one writer, so the
	/// relaxed load of the count is its own last store.
	pub(crate) fn push(&self, _insert: &MutexGuard<'_, ()>, value: T) -> Result<usize, T> {
		let index = self.published.load(Ordering::Relaxed);
		if index >= CAPACITY {
			return Err(value);
		}
		let (segment, offset) = locate(index);
		let slots = self.segments[segment].get_or_init(|| (0..1usize << segment).map(|_| OnceLock::new()).collect());
		if let Err(value) = slots[offset].set(value) {
			return Err(value);
		}
		self.published.store(index + 1, Ordering::Release);
		Ok(index)
	}

	pub(crate) fn clear(&mut self) {
		*self = Self::new();
	}
}

#[inline]
fn locate(index: usize) -> (usize, usize) {
	let n = index + 1;
	let segment = (usize::BITS - 1 - n.leading_zeros()) as usize;
	(segment, n - (1 << segment))
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	#[test]
	fn locate_maps_segments() {
		assert_eq!(locate(0), (0, 0));
		assert_eq!(locate(1), (1, 0));
		assert_eq!(locate(2), (1, 1));
		assert_eq!(locate(3), (2, 0));
		assert_eq!(locate(6), (2, 3));
		assert_eq!(locate(7), (3, 0));
	}

	#[test]
	fn entries_survive_segment_growth() {
		let lock = Mutex::new(());
		let store = AppendOnly::new();
		let first = {
			let guard = lock.lock();
			store.push(&guard, String::from("zero")).unwrap();
			store.get(0).unwrap() as *const String
		};
		for i in 1..100 {
			let guard = lock.lock();
			assert_eq!(store.push(&guard, i.to_string()).unwrap(), i);
		}
		assert_eq!(store.published(), 100);
		assert_eq!(store.get(0).unwrap() as *const String, first);
		assert_eq!(store.get(57).map(String::as_str), Some("57"));
		assert!(store.get(100).is_none());
		assert_eq!(store.iter(store.published()).count(), 100);
	}

	#[test]
	fn clear_resets() {
		let lock = Mutex::new(());
		let mut store = AppendOnly::new();
		store.push(&lock.lock(), 1u8).unwrap();
		store.clear();
		assert_eq!(store.published(), 0);
		assert!(store.get(0).is_none());
	}
}
