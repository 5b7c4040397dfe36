// ============================================================================
// State Machine Infrastructure
// ============================================================================
//
// Generic, reusable guarded-transition engine and persistence boundary.
// Domain-specific code is in src/domain/
//
// ============================================================================

// Core abstractions (GENERIC - works with any aggregate)
pub mod core;
pub mod store;

// Re-export core infrastructure
pub use self::core::*;
pub use self::store::*;
