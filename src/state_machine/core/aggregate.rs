use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

use super::engine::StateCommit;

// ============================================================================
// Aggregate Root Pattern - State Machine Core
// ============================================================================
//
// Key Principles:
// 1. The aggregate owns its state label, but never assigns it directly
// 2. Only the engine can produce a StateCommit
// 3. Guards read the aggregate, they never mutate it
// 4. A committed state reflects the last successful business action
//
// This is the GENERIC accessor trait that lets the engine drive ANY aggregate.
//
// ============================================================================

/// Generic Aggregate trait - every aggregate driven by the engine implements this
///
/// Type Parameters:
/// - `State`: The closed set of lifecycle labels for this aggregate
/// - `Event`: The named triggers accepted by this aggregate's table
pub trait Aggregate: Sized + Send + Sync + 'static {
    type State: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Event: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Get aggregate ID
    fn aggregate_id(&self) -> Uuid;

    /// Get current version (optimistic concurrency counter)
    fn version(&self) -> i64;

    /// Set by the persistence layer after a successful save
    fn set_version(&mut self, version: i64);

    /// Current lifecycle label
    fn current_state(&self) -> Self::State;

    /// Apply a transition decided by the engine
    fn commit_state(&mut self, commit: StateCommit<Self::State, Self::Event>);
}
