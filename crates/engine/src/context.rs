use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use vigil_config::EngineConfig;
use vigil_intern::StringStore;
use vigil_registry::StateMachineRegistry;
use vigil_worker::{BackgroundPersister, DataSink, PeriodicPersist};

/// Either a process-wide instance or one owned by this context.
#[derive(Debug)]
enum Scoped<T: 'static> {
	Global(&'static T),
	Owned(Arc<T>),
}

impl<T: 'static> Clone for Scoped<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Global(value) => Self::Global(*value),
			Self::Owned(value) => Self::Owned(Arc::clone(value)),
		}
	}
}

impl<T: 'static> Deref for Scoped<T> {
	type Target = T;

	fn deref(&self) -> &T {
		match self {
			Self::Global(value) => value,
			Self::Owned(value) => value,
		}
	}
}

/// Registry and string pools shared by every model in one engine.
///
/// Cloning is cheap and clones share the same instances.
#[derive(Debug, Clone)]
pub struct EngineContext {
	registry: Scoped<StateMachineRegistry>,
	names: Scoped<StringStore>,
	influencers: Scoped<StringStore>,
}

impl EngineContext {
	/// Context over the process-wide registry and pools.
	pub fn global() -> Self {
		Self {
			registry: Scoped::Global(StateMachineRegistry::global()),
			names: Scoped::Global(StringStore::names()),
			influencers: Scoped::Global(StringStore::influencers()),
		}
	}

	/// Isolated context sized from `config`.
	pub fn new(config: &EngineConfig) -> Self {
		let capacity = config.intern.initial_capacity;
		Self {
			registry: Scoped::Owned(Arc::new(StateMachineRegistry::new())),
			names: Scoped::Owned(Arc::new(StringStore::with_capacity("names", capacity))),
			influencers: Scoped::Owned(Arc::new(StringStore::with_capacity("influencers", capacity))),
		}
	}

	pub fn registry(&self) -> &StateMachineRegistry {
		&self.registry
	}

	/// Pool of field names.
	pub fn names(&self) -> &StringStore {
		&self.names
	}

	/// Pool of influencer field values.
	pub fn influencers(&self) -> &StringStore {
		&self.influencers
	}

	/// Bytes retained by both string pools.
	pub fn memory_usage(&self) -> usize {
		self.names.memory_usage() + self.influencers.memory_usage()
	}

	/// Runs a prune pass on both pools, returning the number of entries
	/// dropped.
	pub fn prune(&self) -> usize {
		let dropped = self.names.prune() + self.influencers.prune();
		if dropped > 0 {
			tracing::debug!(dropped, memory = self.memory_usage(), "engine.prune");
		}
		dropped
	}

	/// Persistence runner configured from `config.persist`.
	pub fn persister<S: DataSink>(config: &EngineConfig, sink: S) -> BackgroundPersister<S> {
		BackgroundPersister::with_thread_name(config.persist.thread_name.clone(), sink)
	}

	/// Periodic schedule for `config.persist.interval_secs`, starting at `now`.
	pub fn periodic(config: &EngineConfig, now: Instant) -> PeriodicPersist {
		PeriodicPersist::new(config.persist.interval(), now)
	}
}
