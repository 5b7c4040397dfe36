use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::aggregate::OrderAggregate;
use super::notifications::Notifier;
use super::value_objects::Money;

// ============================================================================
// External Services - Guard Collaborators
// ============================================================================
//
// Payment gateway, carrier quoting and order submission seen from the
// engine: synchronous, single-shot, boolean. No retries. A `false` is the
// designed trigger for the paired failure transition, not an error.
//
// Implementations may block. Callers that need a deadline wrap their
// implementation and answer `false` on timeout.
//
// ============================================================================

pub trait ExternalServices: Send + Sync {
    /// Quote and build the order's shipments with the carrier
    fn build_shipments(&self, order: &OrderAggregate) -> bool;

    /// Choose shipping options for the built shipments
    fn set_shipping_options(&self, order: &OrderAggregate) -> bool;

    /// Authorize the charge with the payment gateway
    fn authorize_charge(&self, order: &OrderAggregate) -> bool;

    /// Submit the order for fulfillment
    fn submit_order(&self, order: &OrderAggregate) -> bool;

    /// Settle the authorized charge
    fn settle_charge(&self, order: &OrderAggregate) -> bool;

    /// Charge again after a failed settlement
    fn recharge(&self, order: &OrderAggregate, amount: Money) -> bool;
}

/// Collaborators handed to every guard and hook
#[derive(Clone)]
pub struct LifecycleContext {
    pub services: Arc<dyn ExternalServices>,
    pub notifier: Arc<dyn Notifier>,
}

impl LifecycleContext {
    pub fn new(services: Arc<dyn ExternalServices>, notifier: Arc<dyn Notifier>) -> Self {
        Self { services, notifier }
    }
}

impl fmt::Debug for LifecycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleContext").finish_non_exhaustive()
    }
}

// ============================================================================
// Scripted Services - deterministic stand-in
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCall {
    BuildShipments,
    SetShippingOptions,
    AuthorizeCharge,
    SubmitOrder,
    SettleCharge,
    Recharge,
}

impl ServiceCall {
    pub const ALL: [ServiceCall; 6] = [
        ServiceCall::BuildShipments,
        ServiceCall::SetShippingOptions,
        ServiceCall::AuthorizeCharge,
        ServiceCall::SubmitOrder,
        ServiceCall::SettleCharge,
        ServiceCall::Recharge,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Answers every call from a configurable script and counts invocations
pub struct ScriptedServices {
    outcomes: [AtomicBool; 6],
    calls: [AtomicUsize; 6],
    last_recharge_cents: AtomicUsize,
}

impl Default for ScriptedServices {
    fn default() -> Self {
        Self::succeeding()
    }
}

impl ScriptedServices {
    /// Every call succeeds
    pub fn succeeding() -> Self {
        Self {
            outcomes: std::array::from_fn(|_| AtomicBool::new(true)),
            calls: std::array::from_fn(|_| AtomicUsize::new(0)),
            last_recharge_cents: AtomicUsize::new(0),
        }
    }

    pub fn with_outcome(self, call: ServiceCall, outcome: bool) -> Self {
        self.set_outcome(call, outcome);
        self
    }

    pub fn set_outcome(&self, call: ServiceCall, outcome: bool) {
        self.outcomes[call.index()].store(outcome, Ordering::SeqCst);
    }

    pub fn calls(&self, call: ServiceCall) -> usize {
        self.calls[call.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        ServiceCall::ALL.iter().map(|call| self.calls(*call)).sum()
    }

    /// Amount passed to the most recent recharge, in cents
    pub fn last_recharge_cents(&self) -> usize {
        self.last_recharge_cents.load(Ordering::SeqCst)
    }

    fn answer(&self, call: ServiceCall, order: &OrderAggregate) -> bool {
        self.calls[call.index()].fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcomes[call.index()].load(Ordering::SeqCst);
        tracing::debug!(
            order_id = %order.id,
            call = ?call,
            outcome = outcome,
            "Scripted external call"
        );
        outcome
    }
}

impl ExternalServices for ScriptedServices {
    fn build_shipments(&self, order: &OrderAggregate) -> bool {
        self.answer(ServiceCall::BuildShipments, order)
    }

    fn set_shipping_options(&self, order: &OrderAggregate) -> bool {
        self.answer(ServiceCall::SetShippingOptions, order)
    }

    fn authorize_charge(&self, order: &OrderAggregate) -> bool {
        self.answer(ServiceCall::AuthorizeCharge, order)
    }

    fn submit_order(&self, order: &OrderAggregate) -> bool {
        self.answer(ServiceCall::SubmitOrder, order)
    }

    fn settle_charge(&self, order: &OrderAggregate) -> bool {
        self.answer(ServiceCall::SettleCharge, order)
    }

    fn recharge(&self, order: &OrderAggregate, amount: Money) -> bool {
        let cents = usize::try_from(amount.cents()).unwrap_or(0);
        self.last_recharge_cents.store(cents, Ordering::SeqCst);
        self.answer(ServiceCall::Recharge, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_outcomes_and_counters() {
        let services = ScriptedServices::succeeding().with_outcome(ServiceCall::AuthorizeCharge, false);
        let order = OrderAggregate::new("PO-3001", Money::from_cents(2_500).unwrap());

        assert!(!services.authorize_charge(&order));
        assert!(services.submit_order(&order));
        assert!(services.recharge(&order, order.total));

        assert_eq!(services.calls(ServiceCall::AuthorizeCharge), 1);
        assert_eq!(services.calls(ServiceCall::SettleCharge), 0);
        assert_eq!(services.total_calls(), 3);
        assert_eq!(services.last_recharge_cents(), 2_500);
    }

    #[test]
    fn test_outcome_can_change_between_calls() {
        let services = ScriptedServices::default();
        let order = OrderAggregate::new("PO-3002", Money::zero());

        assert!(services.settle_charge(&order));
        services.set_outcome(ServiceCall::SettleCharge, false);
        assert!(!services.settle_charge(&order));
        assert_eq!(services.calls(ServiceCall::SettleCharge), 2);
    }
}
