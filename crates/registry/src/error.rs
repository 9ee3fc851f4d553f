/// Inconsistent alphabet/states/transition shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
	#[error("alphabet has {alphabet} symbols but the transition table has {rows} rows")]
	RowCount { alphabet: usize, rows: usize },

	#[error("transition row {row} has {len} entries, expected one per state ({states})")]
	RowLength { row: usize, len: usize, states: usize },

	#[error("transition[{row}][{column}] = {target} is not a state index (have {states} states)")]
	TargetOutOfRange {
		row: usize,
		column: usize,
		target: usize,
		states: usize,
	},

	#[error("state {state} is out of range (have {states} states)")]
	StateOutOfRange { state: usize, states: usize },
}

/// Registry error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	#[error("invalid machine: {0}")]
	Shape(#[from] ShapeError),

	#[error("machine registry is full")]
	Full,

	#[error("bad machine has no definition to persist")]
	BadMachine,
}
