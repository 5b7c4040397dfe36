// ============================================================================
// State Machine Core - Generic Transition Engine
// ============================================================================
//
// This module contains GENERIC, reusable state machine infrastructure
// that works with ANY aggregate implementing the Aggregate trait.
//
// Key Principles:
// - No domain-specific code (no Order, Shipment, PaymentMethod, etc.)
// - Transition tables are data, the engine is the only dispatch algorithm
// - Only the engine can commit a new state
//
// ============================================================================

pub mod aggregate;
pub mod engine;
pub mod transition;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export core types for convenience
pub use aggregate::Aggregate;
pub use engine::{Engine, NoOpReason, StateCommit, TransitionOutcome};
pub use transition::{Guard, GuardFn, Hook, HookFn, Transition, TransitionTable};
