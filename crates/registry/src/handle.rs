/// Dense index of a published definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(u32);

impl MachineId {
	pub(crate) const BAD: Self = Self(u32::MAX);

	pub(crate) fn from_index(index: usize) -> Self {
		debug_assert!(index < u32::MAX as usize);
		Self(index as u32)
	}

	#[inline]
	pub const fn as_u32(self) -> u32 {
		self.0
	}

	#[inline]
	pub const fn as_usize(self) -> usize {
		self.0 as usize
	}
}

/// One model instance's view of a machine: which definition, and where it is.
///
/// Cheap to copy. All behaviour lives on
/// [`StateMachineRegistry`](crate::StateMachineRegistry), which owns the
/// definition this handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineHandle {
	pub(crate) machine: MachineId,
	pub(crate) state: usize,
}

impl MachineHandle {
	pub(crate) const fn new(machine: MachineId, state: usize) -> Self {
		Self { machine, state }
	}

	/// Handle produced by inconsistent construction parameters.
	pub const fn bad() -> Self {
		Self {
			machine: MachineId::BAD,
			state: 0,
		}
	}

	/// Returns `true` if this handle refers to no definition.
	#[inline]
	pub fn is_bad(&self) -> bool {
		self.machine == MachineId::BAD
	}

	#[inline]
	pub fn machine(&self) -> MachineId {
		self.machine
	}

	#[inline]
	pub fn state(&self) -> usize {
		self.state
	}
}
