use chrono::Utc;

use crate::state_machine::core::{Engine, Transition, TransitionTable};
use super::aggregate::OrderAggregate;
use super::events::OrderEvent;
use super::notifications::{NotificationContext, Recipient};
use super::services::LifecycleContext;
use super::validation::ValidationContext;
use super::value_objects::OrderState::{self, *};

// ============================================================================
// Order Lifecycle - Transition Table
// ============================================================================
//
// advance walks the happy path one milestone per call. Risky steps declare
// a guarded primary candidate followed by an unguarded fallback into a
// *_failed state.
//
// payment_declined is part of the state set but no candidate targets it.
// shipment_quote_failed and order_failed have no way out.
//
// ============================================================================

pub type OrderTransition = Transition<OrderAggregate, LifecycleContext>;
pub type OrderTransitionTable = TransitionTable<OrderAggregate, LifecycleContext>;
pub type OrderEngine = Engine<OrderAggregate, LifecycleContext>;

/// States where the shipping address may still be edited
const SHIPPING_ADDRESS_EDITABLE: [OrderState; 5] = [
    HasShippingAddress,
    HasShipments,
    HasShippingOptions,
    HasPaymentMethod,
    ReadyToOrder,
];

/// States where shipping options may still be edited
const SHIPPING_OPTIONS_EDITABLE: [OrderState; 3] = [HasShippingOptions, HasPaymentMethod, ReadyToOrder];

/// States where a new payment method re-enters has_payment_method
const PAYMENT_METHOD_EDITABLE: [OrderState; 3] = [HasPaymentMethod, ReadyToOrder, AuthorizationFailed];

pub fn order_transition_table() -> OrderTransitionTable {
    OrderTransitionTable::new()
        .event(OrderEvent::Advance, vec![
            OrderTransition::new([Pending], HasShippingAddress)
                .guarded_by("shipping_address_present", |order, _| order.has_shipping_address()),
            OrderTransition::new([HasShippingAddress], HasShipments)
                .guarded_by("build_shipments", guards::build_shipments),
            OrderTransition::new([HasShippingAddress], ShipmentQuoteFailed)
                .on_success("notify_admin_of_quote_failure", hooks::notify_admin_of_quote_failure),
            OrderTransition::new([HasShipments], HasShippingOptions)
                .guarded_by("set_shipping_options", |order, ctx| ctx.services.set_shipping_options(order)),
            OrderTransition::new([HasShippingOptions], HasPaymentMethod)
                .guarded_by("payment_method_present", |order, _| order.has_payment_method()),
            OrderTransition::new([HasPaymentMethod], ReadyToOrder)
                .guarded_by("ready_to_order", guards::ready_to_order),
            OrderTransition::new([ReadyToOrder], PaymentAuthorized)
                .guarded_by("authorize_charge", |order, ctx| ctx.services.authorize_charge(order)),
            OrderTransition::new([ReadyToOrder], AuthorizationFailed)
                .on_success("notify_of_authorization_failure", hooks::notify_of_authorization_failure),
            OrderTransition::new([PaymentAuthorized], Ordered)
                .guarded_by("submit_order", |order, ctx| ctx.services.submit_order(order))
                .on_success("notify_customer_of_order", hooks::notify_customer_of_order),
            OrderTransition::new([PaymentAuthorized], OrderFailed)
                .on_success("notify_admin_of_order_failure", hooks::notify_admin_of_order_failure),
            OrderTransition::new([Ordered], Shipped)
                .guarded_by("all_shipped", |order, _| order.all_shipped())
                .on_success("notify_customer_of_shipment", hooks::notify_customer_of_shipment),
            OrderTransition::new([Shipped], PaymentSettled)
                .guarded_by("settle_charge", |order, ctx| ctx.services.settle_charge(order))
                .on_success("notify_customer_of_settlement", hooks::notify_customer_of_settlement),
            OrderTransition::new([Shipped], SettlementFailed)
                .on_success("notify_admin_of_failed_payment", hooks::notify_admin_of_failed_payment),
        ])
        .event(OrderEvent::EditShippingAddress, vec![
            OrderTransition::new(SHIPPING_ADDRESS_EDITABLE, Pending),
        ])
        .event(OrderEvent::EditShippingOptions, vec![
            OrderTransition::new(SHIPPING_OPTIONS_EDITABLE, Pending),
        ])
        .event(OrderEvent::EditPaymentMethod, vec![
            OrderTransition::new([SettlementFailed], PaymentSettled)
                .guarded_by("recharge_order_total", |order, ctx| ctx.services.recharge(order, order.total))
                .on_success("notify_customer_of_settlement", hooks::notify_customer_of_settlement),
            OrderTransition::new([SettlementFailed], SettlementFailed)
                .on_success("notify_admin_of_failed_payment", hooks::notify_admin_of_failed_payment),
            OrderTransition::new(PAYMENT_METHOD_EDITABLE, HasPaymentMethod),
        ])
}

/// Engine over the order table
pub fn order_engine() -> OrderEngine {
    Engine::new(order_transition_table())
}

mod guards {
    use super::*;

    /// Carrier quote succeeded and at least one shipment is attached
    pub(super) fn build_shipments(order: &OrderAggregate, ctx: &LifecycleContext) -> bool {
        ctx.services.build_shipments(order) && order.has_shipments()
    }

    pub(super) fn ready_to_order(order: &OrderAggregate, _ctx: &LifecycleContext) -> bool {
        let report = order.validate(ValidationContext::ReadyToOrder);
        if !report.is_valid() {
            tracing::warn!(
                order_id = %order.id,
                context = %report.context,
                errors = ?report.messages(),
                "Order failed readiness validation"
            );
        }
        report.is_valid()
    }
}

mod hooks {
    use super::*;

    fn send(order: &OrderAggregate, ctx: &LifecycleContext, recipients: &[Recipient], message: &str) {
        for recipient in recipients {
            ctx.notifier.notify(
                *recipient,
                order.id,
                NotificationContext {
                    po_number: order.po_number.clone(),
                    state: order.state(),
                    message: message.to_string(),
                    occurred_at: Utc::now(),
                },
            );
        }
    }

    pub(super) fn notify_customer_of_order(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Customer], "Your order has been placed");
    }

    pub(super) fn notify_of_authorization_failure(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Admin, Recipient::Customer], "Payment authorization failed");
    }

    pub(super) fn notify_admin_of_quote_failure(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Admin], "Shipment quote failed");
    }

    pub(super) fn notify_admin_of_order_failure(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Admin], "Order submission failed");
    }

    pub(super) fn notify_customer_of_shipment(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Customer], "All shipments have shipped");
    }

    pub(super) fn notify_customer_of_settlement(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Customer], "Charges settled");
    }

    pub(super) fn notify_admin_of_failed_payment(order: &OrderAggregate, ctx: &LifecycleContext) {
        send(order, ctx, &[Recipient::Admin], "Payment settlement failed");
    }
}
