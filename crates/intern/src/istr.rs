use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Shared immutable string, compared and hashed by content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IStr(Arc<str>);

impl IStr {
	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns `true` if both handles share one allocation.
	#[inline]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}

	/// Returns `true` when no other handle to this allocation exists.
	#[inline]
	pub(crate) fn is_unique(&self) -> bool {
		Arc::strong_count(&self.0) == 1
	}

	/// Bytes owned by this allocation, including the reference counts.
	pub(crate) fn heap_size(&self) -> usize {
		2 * std::mem::size_of::<usize>() + self.0.len()
	}
}

impl From<&str> for IStr {
	fn from(value: &str) -> Self {
		Self(Arc::from(value))
	}
}

impl From<String> for IStr {
	fn from(value: String) -> Self {
		Self(Arc::from(value))
	}
}

impl Deref for IStr {
	type Target = str;

	#[inline]
	fn deref(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for IStr {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for IStr {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl PartialEq<str> for IStr {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for IStr {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}

impl fmt::Debug for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
