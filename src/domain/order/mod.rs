// ============================================================================
// Order Domain - Order Lifecycle
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderState, Money, ShippingAddress, PaymentMethod, Shipment)
// - Events (OrderEvent, TransitionRecord)
// - Errors (OrderError enum)
// - Aggregate (OrderAggregate and its collaborator predicates)
// - Readiness validation
// - External services and notifications seen by guards and hooks
// - Transition table (order_transition_table)
// - Lifecycle service (OrderLifecycleService)
//
// The guarded-transition engine itself lives in state_machine.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod aggregate;
pub mod validation;
pub mod services;
pub mod notifications;
pub mod lifecycle;
pub mod command_handler;

#[cfg(test)]
mod lifecycle_scenarios;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use aggregate::*;
pub use validation::*;
pub use services::*;
pub use notifications::*;
pub use lifecycle::*;
pub use command_handler::*;
