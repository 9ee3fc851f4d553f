/// Boxed persistence body run against the runner's sink.
pub type PersistFn<S> = Box<dyn FnOnce(&mut S) -> anyhow::Result<()> + Send>;

/// A persistence body, or nothing.
///
/// Empty tasks are rejected by
/// [`BackgroundPersister::start_persist`](crate::BackgroundPersister::start_persist).
pub struct PersistTask<S>(Option<PersistFn<S>>);

impl<S> PersistTask<S> {
	pub fn new<F>(work: F) -> Self
	where
		F: FnOnce(&mut S) -> anyhow::Result<()> + Send + 'static,
	{
		Self(Some(Box::new(work)))
	}

	pub fn empty() -> Self {
		Self(None)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_none()
	}

	pub(crate) fn into_inner(self) -> Option<PersistFn<S>> {
		self.0
	}
}

impl<S> Default for PersistTask<S> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<S> std::fmt::Debug for PersistTask<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("PersistTask").field(&if self.is_empty() { "empty" } else { "set" }).finish()
	}
}
