use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::core::{Aggregate, StateCommit};
use super::errors::OrderError;
use super::events::{OrderEvent, TransitionRecord};
use super::value_objects::{Money, OrderState, PaymentMethod, Shipment, Shipments, ShippingAddress};

// ============================================================================
// Order Aggregate - Domain Model
// ============================================================================
//
// The order is the aggregate root. Shipping address, payment method and
// shipments have no lifecycle of their own.
//
// `state` is never assigned here: it only changes through commit_state,
// which takes a StateCommit that only the engine can build.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub version: i64,
    pub po_number: String,
    pub total: Money,

    // Lifecycle
    state: OrderState,
    history: Vec<TransitionRecord>,

    // Owned sub-entities
    shipping_address: Option<ShippingAddress>,
    payment_method: Option<PaymentMethod>,
    shipments: Shipments,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type Order = OrderAggregate;

impl OrderAggregate {
    /// New order in the initial state with no sub-entities
    pub fn new(po_number: impl Into<String>, total: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            version: 0,
            po_number: po_number.into(),
            total,
            state: OrderState::INITIAL,
            history: Vec::new(),
            shipping_address: None,
            payment_method: None,
            shipments: Shipments::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn payment_method(&self) -> Option<&PaymentMethod> {
        self.payment_method.as_ref()
    }

    pub fn shipments(&self) -> &Shipments {
        &self.shipments
    }

    // ------------------------------------------------------------------------
    // Derived predicates read by guards
    // ------------------------------------------------------------------------

    pub fn has_shipping_address(&self) -> bool {
        self.shipping_address.is_some()
    }

    pub fn has_shipments(&self) -> bool {
        !self.shipments.is_empty()
    }

    pub fn has_payment_method(&self) -> bool {
        self.payment_method.is_some()
    }

    pub fn payment_method_accepted(&self) -> bool {
        self.payment_method.as_ref().is_some_and(PaymentMethod::is_accepted)
    }

    pub fn all_shipped(&self) -> bool {
        self.shipments.all_shipped()
    }

    // ------------------------------------------------------------------------
    // Collaborator operations (never touch `state`)
    // ------------------------------------------------------------------------

    pub fn attach_shipping_address(&mut self, address: ShippingAddress) {
        self.shipping_address = Some(address);
        self.touch();
    }

    /// Attach a payment method, replacing any previous one
    pub fn attach_payment_method(&mut self, payment_method: PaymentMethod) -> Uuid {
        let id = payment_method.id;
        self.payment_method = Some(payment_method);
        self.touch();
        id
    }

    pub fn decline_payment_method(&mut self) -> Result<(), OrderError> {
        let method = self.payment_method.as_mut().ok_or(OrderError::PaymentMethodMissing)?;
        method.mark_declined();
        self.touch();
        Ok(())
    }

    pub fn accept_payment_method(&mut self) -> Result<(), OrderError> {
        let method = self.payment_method.as_mut().ok_or(OrderError::PaymentMethodMissing)?;
        method.mark_accepted();
        self.touch();
        Ok(())
    }

    pub fn add_shipment(&mut self, shipment: Shipment) -> Uuid {
        let id = shipment.id;
        self.shipments.push(shipment);
        self.touch();
        id
    }

    pub fn remove_shipment(&mut self, shipment_id: Uuid) -> Result<Shipment, OrderError> {
        let removed = self
            .shipments
            .remove(shipment_id)
            .ok_or(OrderError::ShipmentNotFound(shipment_id))?;
        self.touch();
        Ok(removed)
    }

    pub fn mark_shipment_shipped(&mut self, shipment_id: Uuid) -> Result<(), OrderError> {
        let shipment = self
            .shipments
            .get_mut(shipment_id)
            .ok_or(OrderError::ShipmentNotFound(shipment_id))?;
        shipment.mark_shipped();
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type State = OrderState;
    type Event = OrderEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn current_state(&self) -> OrderState {
        self.state
    }

    fn commit_state(&mut self, commit: StateCommit<OrderState, OrderEvent>) {
        self.state = commit.to();
        self.updated_at = commit.committed_at();
        self.history.push(TransitionRecord {
            event: commit.event(),
            from: commit.from(),
            to: commit.to(),
            committed_at: commit.committed_at(),
        });
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
