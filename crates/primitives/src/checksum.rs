use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Incremental checksum over primitive values.
///
/// Lengths and integers are fed as fixed-width `u64` so the result does not
/// depend on the platform's `usize` width. Used to detect drift between a
/// persisted model and the instance restored from it, never for security.
#[derive(Default)]
pub struct Checksum {
	hasher: FxHasher,
}

impl Checksum {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn u64(mut self, value: u64) -> Self {
		self.hasher.write_u64(value);
		self
	}

	pub fn usize(self, value: usize) -> Self {
		self.u64(value as u64)
	}

	/// Length-prefixed so that `["ab", "c"]` and `["a", "bc"]` differ.
	pub fn str(mut self, value: &str) -> Self {
		self.hasher.write_u64(value.len() as u64);
		self.hasher.write(value.as_bytes());
		self
	}

	pub fn strs<'a>(self, values: impl ExactSizeIterator<Item = &'a str>) -> Self {
		let mut this = self.usize(values.len());
		for value in values {
			this = this.str(value);
		}
		this
	}

	pub fn finish(&self) -> u64 {
		self.hasher.finish()
	}
}

/// Folds `value` into `seed`.
pub fn combine(seed: u64, value: u64) -> u64 {
	Checksum::new().u64(seed).u64(value).finish()
}
