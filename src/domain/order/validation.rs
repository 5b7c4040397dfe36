use std::fmt;

use serde::{Deserialize, Serialize};

use super::aggregate::OrderAggregate;

// ============================================================================
// Readiness Validation
// ============================================================================
//
// A named rule set checked by the guard that moves an order into
// ready_to_order. Every rule is checked; one violation is recorded per
// broken rule, in declaration order.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationContext {
    ReadyToOrder,
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationContext::ReadyToOrder => f.write_str("ready_to_order"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ReadinessViolation {
    #[error("Shipping address can't be blank")]
    MissingShippingAddress,

    #[error("Shipments can't be blank")]
    MissingShipments,

    #[error("Payment method can't be blank")]
    MissingPaymentMethod,

    #[error("Payment method was declined")]
    PaymentMethodDeclined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub context: ValidationContext,
    violations: Vec<ReadinessViolation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[ReadinessViolation] {
        &self.violations
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Run the rule set for `context` against the order
pub fn validate(order: &OrderAggregate, context: ValidationContext) -> ValidationReport {
    let violations = match context {
        ValidationContext::ReadyToOrder => ready_to_order_violations(order),
    };
    ValidationReport { context, violations }
}

fn ready_to_order_violations(order: &OrderAggregate) -> Vec<ReadinessViolation> {
    let mut violations = Vec::new();

    if !order.has_shipping_address() {
        violations.push(ReadinessViolation::MissingShippingAddress);
    }
    if !order.has_shipments() {
        violations.push(ReadinessViolation::MissingShipments);
    }
    match order.payment_method() {
        None => violations.push(ReadinessViolation::MissingPaymentMethod),
        Some(method) if method.is_declined() => {
            violations.push(ReadinessViolation::PaymentMethodDeclined)
        }
        Some(_) => {}
    }

    violations
}

impl OrderAggregate {
    pub fn validate(&self, context: ValidationContext) -> ValidationReport {
        validate(self, context)
    }
}
