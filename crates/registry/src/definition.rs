use vigil_primitives::Checksum;

use crate::error::ShapeError;

/// Immutable finite state machine definition.
///
/// `transition[symbol][state]` is the state reached on `symbol` from
/// `state`. Alphabet and state order are part of identity: two definitions
/// with the same sets in a different order are distinct.
#[derive(Debug, Clone)]
pub struct MachineDefinition {
	alphabet: Vec<String>,
	states: Vec<String>,
	transition: Vec<Vec<usize>>,
	fingerprint: u64,
}

impl MachineDefinition {
	/// Builds a definition without validating it. See [`Self::validate`].
	pub fn new(alphabet: Vec<String>, states: Vec<String>, transition: Vec<Vec<usize>>) -> Self {
		let fingerprint = fingerprint(&alphabet, &states, &transition);
		Self {
			alphabet,
			states,
			transition,
			fingerprint,
		}
	}

	/// Checks the table is `alphabet.len() x states.len()` and every target is a state.
	pub fn validate(&self) -> Result<(), ShapeError> {
		if self.transition.len() != self.alphabet.len() {
			return Err(ShapeError::RowCount {
				alphabet: self.alphabet.len(),
				rows: self.transition.len(),
			});
		}
		let states = self.states.len();
		for (row, targets) in self.transition.iter().enumerate() {
			if targets.len() != states {
				return Err(ShapeError::RowLength {
					row,
					len: targets.len(),
					states,
				});
			}
			if let Some((column, &target)) = targets.iter().enumerate().find(|&(_, &t)| t >= states) {
				return Err(ShapeError::TargetOutOfRange { row, column, target, states });
			}
		}
		Ok(())
	}

	pub fn alphabet(&self) -> &[String] {
		&self.alphabet
	}

	pub fn states(&self) -> &[String] {
		&self.states
	}

	pub fn transition(&self) -> &[Vec<usize>] {
		&self.transition
	}

	/// Content hash, stable across processes for equal definitions.
	pub fn fingerprint(&self) -> u64 {
		self.fingerprint
	}

	/// Next state, or `None` when `symbol` or `state` is out of range.
	#[inline]
	pub fn next(&self, symbol: usize, state: usize) -> Option<usize> {
		self.transition.get(symbol)?.get(state).copied()
	}
}

impl PartialEq for MachineDefinition {
	fn eq(&self, other: &Self) -> bool {
		self.fingerprint == other.fingerprint
			&& self.alphabet == other.alphabet
			&& self.states == other.states
			&& self.transition == other.transition
	}
}

impl Eq for MachineDefinition {}

fn fingerprint(alphabet: &[String], states: &[String], transition: &[Vec<usize>]) -> u64 {
	let mut sum = Checksum::new()
		.strs(alphabet.iter().map(String::as_str))
		.strs(states.iter().map(String::as_str))
		.usize(transition.len());
	for row in transition {
		sum = sum.usize(row.len());
		for &target in row {
			sum = sum.usize(target);
		}
	}
	sum.finish()
}
