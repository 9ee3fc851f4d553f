use std::sync::OnceLock;

use parking_lot::Mutex;
use vigil_primitives::combine;

use crate::definition::MachineDefinition;
use crate::error::RegistryError;
use crate::handle::{MachineHandle, MachineId};
use crate::persist::MachineState;
use crate::store::AppendOnly;

/// Rendered name for anything asked of a bad handle.
pub const BAD_MACHINE: &str = "BAD MACHINE";

/// Rendered name for an out-of-range state or symbol.
pub const UNKNOWN_NAME: &str = "UNKNOWN";

/// Checksum seed standing in for the fingerprint of a bad handle.
const BAD_FINGERPRINT: u64 = u64::MAX;

/// Append-only, de-duplicated store of machine definitions.
///
/// Use [`Self::global`] in the engine; construct private instances in tests.
pub struct StateMachineRegistry {
	machines: AppendOnly<MachineDefinition>,
	insert: Mutex<()>,
}

impl Default for StateMachineRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for StateMachineRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StateMachineRegistry").field("len", &self.len()).finish()
	}
}

impl StateMachineRegistry {
	pub fn new() -> Self {
		Self {
			machines: AppendOnly::new(),
			insert: Mutex::new(()),
		}
	}

	/// Process-wide registry.
	pub fn global() -> &'static Self {
		static GLOBAL: OnceLock<StateMachineRegistry> = OnceLock::new();
		GLOBAL.get_or_init(Self::new)
	}

	/// Creates a handle in `initial_state`, or a bad handle if the shape is
	/// inconsistent. Nothing is published for a bad handle.
	pub fn create<A, S>(&self, alphabet: A, states: S, transition: Vec<Vec<usize>>, initial_state: usize) -> MachineHandle
	where
		A: IntoIterator,
		A::Item: Into<String>,
		S: IntoIterator,
		S::Item: Into<String>,
	{
		let alphabet = alphabet.into_iter().map(Into::into).collect();
		let states = states.into_iter().map(Into::into).collect();
		match self.try_create(MachineDefinition::new(alphabet, states, transition), initial_state) {
			Ok(handle) => handle,
			Err(error) => {
				tracing::error!(%error, "registry.create.rejected");
				MachineHandle::bad()
			}
		}
	}

	/// Fallible form of [`Self::create`].
	pub fn try_create(&self, definition: MachineDefinition, initial_state: usize) -> Result<MachineHandle, RegistryError> {
		definition.validate()?;
		let states = definition.states().len();
		if initial_state >= states {
			return Err(crate::ShapeError::StateOutOfRange {
				state: initial_state,
				states,
			}
			.into());
		}
		let machine = self.lookup_or_insert(definition)?;
		Ok(MachineHandle::new(machine, initial_state))
	}

	fn lookup_or_insert(&self, definition: MachineDefinition) -> Result<MachineId, RegistryError> {
		let seen = self.machines.published();
		if let Some(id) = self.find(&definition, 0, seen) {
			return Ok(id);
		}

		let guard = self.insert.lock();
		// A racing writer may have published the same definition after our scan.
		let published = self.machines.published();
		if let Some(id) = self.find(&definition, seen, published) {
			return Ok(id);
		}
		let index = self.machines.push(&guard, definition).map_err(|_| RegistryError::Full)?;
		drop(guard);

		tracing::debug!(machine = index, "registry.insert");
		Ok(MachineId::from_index(index))
	}

	fn find(&self, definition: &MachineDefinition, from: usize, to: usize) -> Option<MachineId> {
		self.machines
			.iter(to)
			.skip(from)
			.find(|(_, existing)| *existing == definition)
			.map(|(index, _)| MachineId::from_index(index))
	}

	/// Published definition for `id`.
	#[inline]
	pub fn definition(&self, id: MachineId) -> Option<&MachineDefinition> {
		self.machines.get(id.as_usize())
	}

	/// Steps `handle` on `symbol`.
	///
	/// Returns `false` and leaves the state unchanged for a bad handle or a
	/// symbol outside the machine's alphabet.
	#[inline]
	pub fn apply(&self, handle: &mut MachineHandle, symbol: usize) -> bool {
		let Some(next) = self.definition(handle.machine).and_then(|def| def.next(symbol, handle.state)) else {
			return false;
		};
		handle.state = next;
		true
	}

	/// Name of `state` in `handle`'s machine.
	pub fn print_state(&self, handle: &MachineHandle, state: usize) -> &str {
		match self.definition(handle.machine) {
			Some(def) => def.states().get(state).map_or(UNKNOWN_NAME, String::as_str),
			None => BAD_MACHINE,
		}
	}

	/// Name of `symbol` in `handle`'s machine.
	pub fn print_symbol(&self, handle: &MachineHandle, symbol: usize) -> &str {
		match self.definition(handle.machine) {
			Some(def) => def.alphabet().get(symbol).map_or(UNKNOWN_NAME, String::as_str),
			None => BAD_MACHINE,
		}
	}

	/// Checksum of the definition's content and the current state.
	///
	/// Equal across processes for equal definitions in equal states,
	/// whatever id each process assigned.
	pub fn checksum(&self, handle: &MachineHandle) -> u64 {
		let seed = self.definition(handle.machine).map_or(BAD_FINGERPRINT, MachineDefinition::fingerprint);
		combine(seed, handle.state as u64)
	}

	/// Captures `handle`'s definition and current state.
	pub fn persist(&self, handle: &MachineHandle) -> Result<MachineState, RegistryError> {
		let def = self.definition(handle.machine).ok_or(RegistryError::BadMachine)?;
		Ok(MachineState {
			alphabet: def.alphabet().to_vec(),
			states: def.states().to_vec(),
			transition: def.transition().to_vec(),
			state: handle.state,
		})
	}

	/// Rebuilds a handle from persisted state, re-validating its shape.
	pub fn restore(&self, persisted: MachineState) -> Result<MachineHandle, RegistryError> {
		let MachineState {
			alphabet,
			states,
			transition,
			state,
		} = persisted;
		self.try_create(MachineDefinition::new(alphabet, states, transition), state)
			.inspect_err(|error| tracing::warn!(%error, "registry.restore.failed"))
	}

	/// Number of published definitions.
	pub fn len(&self) -> usize {
		self.machines.published()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Forgets every definition. Outstanding handles become dangling ids
	/// that behave as bad handles until the id is reused.
	pub fn clear(&mut self) {
		self.machines.clear();
	}
}
