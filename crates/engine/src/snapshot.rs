//! JSON snapshots of machine state written through a persistence runner.

use std::io::Write;

use anyhow::Context;
use vigil_registry::{MachineHandle, MachineState, RegistryError, StateMachineRegistry};
use vigil_worker::{DataSink, PersistTask};

/// Captures every handle for a background write.
///
/// Capture happens on the calling thread so the task owns a consistent copy
/// and the caller may keep stepping its machines. Record `i` belongs to
/// `handles[i]`; a bad handle fails the whole capture.
pub fn capture(registry: &StateMachineRegistry, handles: &[MachineHandle]) -> Result<Vec<MachineState>, RegistryError> {
	handles.iter().map(|handle| registry.persist(handle)).collect()
}

/// Task writing `states` as a JSON array to the stream called `stream`.
pub fn persist_task<S: DataSink>(stream: impl Into<String>, states: Vec<MachineState>) -> PersistTask<S> {
	let stream = stream.into();
	PersistTask::new(move |sink: &mut S| {
		let mut out = sink.open_stream(&stream)?;
		serde_json::to_writer(&mut out, &states).with_context(|| format!("encoding {stream}"))?;
		out.flush().with_context(|| format!("flushing {stream}"))?;
		sink.stream_complete(out)?;
		tracing::debug!(stream = %stream, machines = states.len(), "snapshot.written");
		Ok(())
	})
}

/// Decodes a snapshot and re-creates its machines in `registry`.
///
/// Fails on the first record whose shape no longer validates.
pub fn restore(registry: &StateMachineRegistry, bytes: &[u8]) -> anyhow::Result<Vec<MachineHandle>> {
	let states: Vec<MachineState> = serde_json::from_slice(bytes).context("decoding machine snapshot")?;
	states
		.into_iter()
		.enumerate()
		.map(|(index, state)| registry.restore(state).with_context(|| format!("restoring machine {index}")))
		.collect()
}
