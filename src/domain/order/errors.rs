use uuid::Uuid;

// ============================================================================
// Order Business Rule Errors
// ============================================================================
//
// Raised by collaborator operations that attach or update sub-entities.
// Transitions never raise: an unavailable event or a failed guard is a
// TransitionOutcome, not an error.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Postal code cannot be empty")]
    EmptyPostalCode,

    #[error("Order total cannot be negative: {0}")]
    NegativeTotal(i64),

    #[error("Order has no payment method")]
    PaymentMethodMissing,

    #[error("Shipment not found: {0}")]
    ShipmentNotFound(Uuid),
}
