use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
	#[error("invalid stream name {0:?}")]
	InvalidName(String),

	#[error("stream {name:?}: {source}")]
	Io {
		name: String,
		#[source]
		source: io::Error,
	},
}

/// Append-only destination for persisted state.
///
/// A persistence task opens one or more named streams, writes to them and
/// signals completion. A stream that is never completed must not become
/// visible to readers of the sink.
pub trait DataSink: Send + 'static {
	type Stream: Write;

	fn open_stream(&mut self, name: &str) -> Result<Self::Stream, SinkError>;

	fn stream_complete(&mut self, stream: Self::Stream) -> Result<(), SinkError>;
}

/// Sink that keeps completed streams in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
	streams: BTreeMap<String, Vec<u8>>,
	completed: usize,
}

/// Open stream of a [`MemorySink`].
#[derive(Debug)]
pub struct MemoryStream {
	name: String,
	buf: Vec<u8>,
}

impl Write for MemoryStream {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buf.extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Contents of the most recently completed stream called `name`.
	pub fn get(&self, name: &str) -> Option<&[u8]> {
		self.streams.get(name).map(Vec::as_slice)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.streams.keys().map(String::as_str)
	}

	/// Total number of completions, counting overwrites.
	pub fn completed(&self) -> usize {
		self.completed
	}
}

impl DataSink for MemorySink {
	type Stream = MemoryStream;

	fn open_stream(&mut self, name: &str) -> Result<MemoryStream, SinkError> {
		if name.is_empty() {
			return Err(SinkError::InvalidName(name.to_owned()));
		}
		Ok(MemoryStream {
			name: name.to_owned(),
			buf: Vec::new(),
		})
	}

	fn stream_complete(&mut self, stream: MemoryStream) -> Result<(), SinkError> {
		self.streams.insert(stream.name, stream.buf);
		self.completed += 1;
		Ok(())
	}
}

/// Sink writing one file per stream under a directory.
///
/// Streams are written to `<name>.partial` and renamed into place on
/// completion, so an interrupted persist never replaces a good file.
#[derive(Debug, Clone)]
pub struct DirSink {
	root: PathBuf,
}

/// Open stream of a [`DirSink`].
#[derive(Debug)]
pub struct DirStream {
	name: String,
	partial: PathBuf,
	file: BufWriter<File>,
}

impl Write for DirStream {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.file.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.file.flush()
	}
}

impl DirSink {
	/// Creates the directory if needed.
	pub fn new(root: impl Into<PathBuf>) -> Result<Self, SinkError> {
		let root = root.into();
		std::fs::create_dir_all(&root).map_err(|source| SinkError::Io {
			name: root.display().to_string(),
			source,
		})?;
		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Final path of the stream called `name`.
	pub fn path_of(&self, name: &str) -> PathBuf {
		self.root.join(name)
	}
}

fn valid_file_name(name: &str) -> bool {
	!name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\']) && !name.ends_with(".partial")
}

impl DataSink for DirSink {
	type Stream = DirStream;

	fn open_stream(&mut self, name: &str) -> Result<DirStream, SinkError> {
		if !valid_file_name(name) {
			return Err(SinkError::InvalidName(name.to_owned()));
		}
		let partial = self.root.join(format!("{name}.partial"));
		let file = File::create(&partial).map_err(|source| SinkError::Io {
			name: name.to_owned(),
			source,
		})?;
		Ok(DirStream {
			name: name.to_owned(),
			partial,
			file: BufWriter::new(file),
		})
	}

	fn stream_complete(&mut self, stream: DirStream) -> Result<(), SinkError> {
		let DirStream { name, partial, file } = stream;
		let io_err = |source: io::Error| SinkError::Io { name: name.clone(), source };
		let file = file.into_inner().map_err(|e| io_err(e.into_error()))?;
		file.sync_all().map_err(io_err)?;
		drop(file);
		std::fs::rename(&partial, self.root.join(&name)).map_err(io_err)?;
		tracing::trace!(stream = %name, "sink.dir.complete");
		Ok(())
	}
}
