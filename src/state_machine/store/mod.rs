// ============================================================================
// State Machine Store - Generic Persistence Boundary
// ============================================================================
//
// This module contains GENERIC persistence infrastructure.
// All components work with ANY aggregate driven by the engine.
//
// ============================================================================

pub mod repository;

pub use repository::{InMemoryRepository, Repository};
