// ============================================================================
// Order Lifecycle Scenarios
// ============================================================================
//
// Drives OrderAggregate through the order table with the scripted
// services and a channel notifier.
//
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;

use super::aggregate::OrderAggregate;
use super::events::OrderEvent;
use super::lifecycle::{order_engine, OrderEngine};
use super::notifications::{ChannelNotifier, OutboundNotification, Recipient};
use super::services::{LifecycleContext, ScriptedServices, ServiceCall};
use super::value_objects::OrderState::{self, *};
use super::value_objects::{Money, PaymentMethod, Shipment, ShippingAddress};
use crate::state_machine::core::{NoOpReason, TransitionOutcome};

struct World {
    engine: OrderEngine,
    services: Arc<ScriptedServices>,
    context: LifecycleContext,
    notifications: mpsc::Receiver<OutboundNotification>,
}

impl World {
    fn new() -> Self {
        let services = Arc::new(ScriptedServices::succeeding());
        let (notifier, notifications) = ChannelNotifier::new(64);
        let context = LifecycleContext::new(services.clone(), Arc::new(notifier));
        Self { engine: order_engine(), services, context, notifications }
    }

    fn fire(&self, order: &mut OrderAggregate, event: OrderEvent) -> TransitionOutcome<OrderState> {
        self.engine.fire(order, event, &self.context)
    }

    fn advance(&self, order: &mut OrderAggregate) -> TransitionOutcome<OrderState> {
        self.fire(order, OrderEvent::Advance)
    }

    fn advance_until(&self, order: &mut OrderAggregate, target: OrderState) {
        while order.state() != target {
            let outcome = self.advance(order);
            assert!(outcome.is_transitioned(), "stuck in {} before reaching {}", order.state(), target);
        }
    }

    fn drain(&mut self) -> Vec<(Recipient, OrderState)> {
        let mut sent = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            sent.push((notification.recipient, notification.context.state));
        }
        sent
    }
}

fn complete_order() -> OrderAggregate {
    let mut order = OrderAggregate::new("PO-9001", Money::from_cents(4_200).unwrap());
    order.attach_shipping_address(ShippingAddress::new("94107").unwrap());
    order.add_shipment(Shipment::new());
    order.attach_payment_method(PaymentMethod::new());
    order
}

fn ship_everything(order: &mut OrderAggregate) {
    let ids: Vec<_> = order.shipments().iter().map(|s| s.id).collect();
    for id in ids {
        order.mark_shipment_shipped(id).unwrap();
    }
}

#[test]
fn test_happy_path_reaches_ordered() {
    let mut world = World::new();
    let mut order = complete_order();

    let expected = [
        HasShippingAddress,
        HasShipments,
        HasShippingOptions,
        HasPaymentMethod,
        ReadyToOrder,
        PaymentAuthorized,
        Ordered,
    ];
    for state in expected {
        let from = order.state();
        assert_eq!(world.advance(&mut order), TransitionOutcome::Transitioned { from, to: state });
    }

    let path: Vec<_> = order.history().iter().map(|r| r.to).collect();
    assert_eq!(path, expected);
    assert!(order.history().iter().all(|r| r.event == OrderEvent::Advance));
    assert_eq!(world.drain(), vec![(Recipient::Customer, Ordered)]);
}

#[test]
fn test_ordered_waits_for_every_shipment() {
    let world = World::new();
    let mut order = complete_order();
    order.add_shipment(Shipment::new());
    world.advance_until(&mut order, Ordered);

    let first = order.shipments().iter().next().unwrap().id;
    order.mark_shipment_shipped(first).unwrap();

    assert_eq!(
        world.advance(&mut order),
        TransitionOutcome::Unchanged { state: Ordered, reason: NoOpReason::GuardRejected }
    );

    ship_everything(&mut order);
    assert_eq!(world.advance(&mut order).state(), Shipped);
}

#[test]
fn test_removed_shipments_keep_ordered_from_shipping() {
    let world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, Ordered);

    let id = order.shipments().iter().next().unwrap().id;
    order.remove_shipment(id).unwrap();

    assert_eq!(world.advance(&mut order).state(), Ordered);
}

#[test]
fn test_authorization_failure_and_recovery() {
    let mut world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, ReadyToOrder);
    world.drain();

    world.services.set_outcome(ServiceCall::AuthorizeCharge, false);
    assert_eq!(world.advance(&mut order).state(), AuthorizationFailed);
    assert_eq!(
        world.drain(),
        vec![(Recipient::Admin, AuthorizationFailed), (Recipient::Customer, AuthorizationFailed)]
    );

    assert_eq!(
        world.advance(&mut order),
        TransitionOutcome::Unchanged { state: AuthorizationFailed, reason: NoOpReason::NoCandidate }
    );

    world.services.set_outcome(ServiceCall::AuthorizeCharge, true);
    assert_eq!(world.fire(&mut order, OrderEvent::EditPaymentMethod).state(), HasPaymentMethod);
    world.advance_until(&mut order, Ordered);
}

#[test]
fn test_settlement_failure_and_recharge() {
    let mut world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, Ordered);
    ship_everything(&mut order);
    world.advance_until(&mut order, Shipped);
    world.drain();

    world.services.set_outcome(ServiceCall::SettleCharge, false);
    assert_eq!(world.advance(&mut order).state(), SettlementFailed);
    assert_eq!(world.drain(), vec![(Recipient::Admin, SettlementFailed)]);

    assert_eq!(world.fire(&mut order, OrderEvent::EditPaymentMethod).state(), PaymentSettled);
    assert_eq!(world.services.last_recharge_cents(), 4_200);
    assert_eq!(world.drain(), vec![(Recipient::Customer, PaymentSettled)]);
    assert!(world.engine.permitted_events(&order).is_empty());
}

#[test]
fn test_failed_recharge_stays_in_settlement_failed() {
    let mut world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, Ordered);
    ship_everything(&mut order);
    world.services.set_outcome(ServiceCall::SettleCharge, false);
    world.advance_until(&mut order, SettlementFailed);
    world.drain();

    world.services.set_outcome(ServiceCall::Recharge, false);
    let outcome = world.fire(&mut order, OrderEvent::EditPaymentMethod);

    assert_eq!(outcome, TransitionOutcome::Transitioned { from: SettlementFailed, to: SettlementFailed });
    assert_eq!(world.drain(), vec![(Recipient::Admin, SettlementFailed)]);
    assert_eq!(world.services.calls(ServiceCall::Recharge), 1);
}

#[test]
fn test_pending_without_address_is_noop() {
    let world = World::new();
    let mut order = OrderAggregate::new("PO-9002", Money::zero());

    assert_eq!(
        world.advance(&mut order),
        TransitionOutcome::Unchanged { state: Pending, reason: NoOpReason::GuardRejected }
    );
    assert!(order.history().is_empty());
    assert_eq!(world.services.total_calls(), 0);
}

#[test]
fn test_quote_failure_is_terminal() {
    let mut world = World::new();
    let mut order = complete_order();
    world.services.set_outcome(ServiceCall::BuildShipments, false);

    world.advance_until(&mut order, ShipmentQuoteFailed);
    assert_eq!(world.drain(), vec![(Recipient::Admin, ShipmentQuoteFailed)]);

    for event in OrderEvent::ALL {
        let outcome = world.fire(&mut order, event);
        assert_eq!(outcome, TransitionOutcome::Unchanged { state: ShipmentQuoteFailed, reason: NoOpReason::NoCandidate });
    }
}

#[test]
fn test_quote_without_shipments_falls_back_to_failure() {
    let world = World::new();
    let mut order = OrderAggregate::new("PO-9003", Money::zero());
    order.attach_shipping_address(ShippingAddress::new("94107").unwrap());

    world.advance_until(&mut order, HasShippingAddress);
    assert_eq!(world.advance(&mut order).state(), ShipmentQuoteFailed);
    assert_eq!(world.services.calls(ServiceCall::BuildShipments), 1);
}

#[test]
fn test_shipping_options_failure_stays_put() {
    let world = World::new();
    let mut order = complete_order();
    world.services.set_outcome(ServiceCall::SetShippingOptions, false);
    world.advance_until(&mut order, HasShipments);

    assert_eq!(
        world.advance(&mut order),
        TransitionOutcome::Unchanged { state: HasShipments, reason: NoOpReason::GuardRejected }
    );
}

#[test]
fn test_declined_payment_blocks_readiness() {
    let world = World::new();
    let mut order = complete_order();
    order.decline_payment_method().unwrap();
    world.advance_until(&mut order, HasPaymentMethod);

    assert_eq!(world.advance(&mut order).state(), HasPaymentMethod);

    order.accept_payment_method().unwrap();
    assert_eq!(world.advance(&mut order).state(), ReadyToOrder);
}

#[test]
fn test_submit_failure_is_terminal() {
    let mut world = World::new();
    let mut order = complete_order();
    world.services.set_outcome(ServiceCall::SubmitOrder, false);
    world.advance_until(&mut order, OrderFailed);

    assert_eq!(world.drain(), vec![(Recipient::Admin, OrderFailed)]);
    assert!(world.engine.permitted_events(&order).is_empty());
}

#[test]
fn test_each_guard_called_once_per_fire() {
    let world = World::new();
    let mut order = complete_order();
    world.services.set_outcome(ServiceCall::AuthorizeCharge, false);
    world.advance_until(&mut order, AuthorizationFailed);

    for call in ServiceCall::ALL {
        let expected = match call {
            ServiceCall::BuildShipments | ServiceCall::SetShippingOptions | ServiceCall::AuthorizeCharge => 1,
            _ => 0,
        };
        assert_eq!(world.services.calls(call), expected, "{:?}", call);
    }
}

#[test]
fn test_edits_rewind_before_placement() {
    let world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, ReadyToOrder);

    assert_eq!(world.fire(&mut order, OrderEvent::EditShippingAddress).state(), Pending);

    world.advance_until(&mut order, HasShippingOptions);
    assert_eq!(world.fire(&mut order, OrderEvent::EditShippingOptions).state(), Pending);

    assert_eq!(
        world.fire(&mut order, OrderEvent::EditShippingOptions),
        TransitionOutcome::Unchanged { state: Pending, reason: NoOpReason::NoCandidate }
    );
}

#[test]
fn test_edits_ignored_after_placement() {
    let world = World::new();
    let mut order = complete_order();
    world.advance_until(&mut order, Ordered);
    let history = order.history().len();

    for event in [OrderEvent::EditShippingAddress, OrderEvent::EditShippingOptions, OrderEvent::EditPaymentMethod] {
        assert_eq!(
            world.fire(&mut order, event),
            TransitionOutcome::Unchanged { state: Ordered, reason: NoOpReason::NoCandidate }
        );
    }
    assert_eq!(order.history().len(), history);
}
