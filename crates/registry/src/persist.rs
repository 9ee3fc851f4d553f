use serde::{Deserialize, Serialize};

/// Persisted form of a [`MachineHandle`](crate::MachineHandle).
///
/// Carries the full definition, not the id: ids follow registration order
/// and a restarted process may register machines in a different order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
	pub alphabet: Vec<String>,
	pub states: Vec<String>,
	pub transition: Vec<Vec<usize>>,
	pub state: usize,
}
