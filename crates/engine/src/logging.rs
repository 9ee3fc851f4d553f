//! Process-wide `tracing` subscriber setup.

use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use vigil_config::{LogConfig, LogLevel};

/// Maps a configured level onto `tracing`'s.
pub fn level(level: LogLevel) -> Level {
	match level {
		LogLevel::Error => Level::ERROR,
		LogLevel::Warn => Level::WARN,
		LogLevel::Info => Level::INFO,
		LogLevel::Debug => Level::DEBUG,
		LogLevel::Trace => Level::TRACE,
	}
}

/// Installs a formatting subscriber as the global default.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), SetGlobalDefaultError> {
	let subscriber = tracing_subscriber::fmt()
		.with_max_level(level(config.level))
		.with_thread_names(true)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;
	tracing::debug!(level = ?config.level, "logging.init");
	Ok(())
}
