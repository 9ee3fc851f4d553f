//! Canonical state machine registry.
//!
//! # Purpose
//!
//! Thousands of model instances step through a handful of distinct finite
//! state machines. Rather than storing a transition table per instance, each
//! distinct definition is stored once in a process-wide registry and
//! instances hold a [`MachineHandle`]: the definition's dense
//! [`MachineId`] plus the current state index.
//!
//! # Mental Model
//!
//! 1. **Create:** [`StateMachineRegistry::create`] validates the shape of an
//!    alphabet/states/transition triple and performs a lookup-or-insert keyed
//!    on full structural equality.
//! 2. **Step:** [`StateMachineRegistry::apply`] reads the immutable published
//!    definition and updates the caller's handle. This is the hottest call in
//!    the engine and takes no lock.
//! 3. **Persist:** [`StateMachineRegistry::persist`] writes the whole
//!    definition plus the current state, since ids depend on registration
//!    order and are not stable across restarts. [`StateMachineRegistry::restore`]
//!    re-runs creation and re-validates.
//!
//! # Concurrency
//!
//! - **Reads:** Lock-free. The published count is loaded with acquire
//!   ordering and only that prefix of the store is scanned.
//! - **Inserts:** Double-checked. A miss on the lock-free scan takes the
//!   insert mutex, re-scans everything published so far and appends only if
//!   still absent. The count is then bumped with release ordering.
//!
//! # Invariants
//!
//! - A definition is published at most once.
//!   - Enforced in: [`StateMachineRegistry::try_create`] (re-scan under lock).
//!   - Tested by: `tests::concurrent_creates_share_one_definition`.
//! - No reader observes a partially written definition.
//!   - Enforced in: `store::AppendOnly::push` (release store after the slot is set).
//! - A bad handle never changes state.
//!   - Enforced in: [`StateMachineRegistry::apply`].
//!   - Tested by: `tests::bad_handle_is_inert`.

mod definition;
mod error;
mod handle;
mod persist;
mod registry;
mod store;

pub use definition::MachineDefinition;
pub use error::{RegistryError, ShapeError};
pub use handle::{MachineHandle, MachineId};
pub use persist::MachineState;
pub use registry::{BAD_MACHINE, StateMachineRegistry, UNKNOWN_NAME};
