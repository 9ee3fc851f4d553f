//! Configuration for the vigil engine primitives.
//!
//! Configuration is a single TOML document. Every section and key is
//! optional; missing values take the defaults below.
//!
//! ```toml
//! [log]
//! level = "info"          # error | warn | info | debug | trace
//!
//! [persist]
//! interval_secs = 300     # periodic snapshot interval, must be > 0
//! thread_name = "vigil-persist"
//!
//! [intern]
//! initial_capacity = 0    # pre-sized slots per intern pool
//! ```
//!
//! Unknown keys are rejected so typos surface at startup.

mod error;

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub use error::{ConfigError, Result};

/// Default periodic persistence interval.
pub const DEFAULT_PERSIST_INTERVAL_SECS: u64 = 300;

/// Default name of the persistence worker thread.
pub const DEFAULT_PERSIST_THREAD_NAME: &str = "vigil-persist";

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	pub log: LogConfig,
	pub persist: PersistConfig,
	pub intern: InternConfig,
}

/// `[log]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
	pub level: LogLevel,
}

/// Maximum verbosity of emitted log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

/// `[persist]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistConfig {
	pub interval_secs: u64,
	pub thread_name: String,
}

impl Default for PersistConfig {
	fn default() -> Self {
		Self {
			interval_secs: DEFAULT_PERSIST_INTERVAL_SECS,
			thread_name: DEFAULT_PERSIST_THREAD_NAME.to_owned(),
		}
	}
}

impl PersistConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}
}

/// `[intern]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InternConfig {
	pub initial_capacity: usize,
}

impl EngineConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates the file at `path`.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Loads `path` if it exists, otherwise returns the defaults.
	pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		if path.exists() {
			Self::load(path)
		} else {
			Ok(Self::default())
		}
	}

	fn validate(&self) -> Result<()> {
		if self.persist.interval_secs == 0 {
			return Err(ConfigError::Invalid {
				field: "persist.interval_secs",
				reason: "must be greater than zero",
			});
		}
		if self.persist.thread_name.is_empty() || self.persist.thread_name.contains('\0') {
			return Err(ConfigError::Invalid {
				field: "persist.thread_name",
				reason: "must be non-empty and free of NUL bytes",
			});
		}
		Ok(())
	}
}
