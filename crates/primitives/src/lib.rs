//! Leaf primitives for the vigil shared-state core: the reader/writer counter
//! gate used by the intern pool and the stable checksum used by persisted
//! model state.

/// Stable, process-independent checksums.
pub mod checksum;
/// Pair of atomic counters used as a light-weight reader/writer gate.
pub mod counter_pair;

pub use checksum::{Checksum, combine};
pub use counter_pair::{AtomicCounterPair, WriterGuard};
