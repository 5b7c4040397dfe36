// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with its value objects, events,
// errors, transition table and service. The engine and repository it runs
// on live in state_machine.
//
// ============================================================================

pub mod order;
