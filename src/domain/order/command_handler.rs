use std::sync::Arc;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::state_machine::core::{Aggregate, TransitionOutcome};
use crate::state_machine::store::Repository;

use super::aggregate::OrderAggregate;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::lifecycle::OrderEngine;
use super::services::LifecycleContext;
use super::value_objects::{Money, OrderState, PaymentMethod, Shipment, ShippingAddress};

// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orchestrates: Load → Fire (or collaborator mutation) → Save
//
// One call is one unit of work against the repository. Callers serialize
// concurrent calls for the same order; the repository's version check
// rejects a lost update.
//
// ============================================================================

pub struct OrderLifecycleService {
    repository: Arc<dyn Repository<OrderAggregate>>,
    engine: Arc<OrderEngine>,
    context: LifecycleContext,
}

impl OrderLifecycleService {
    pub fn new(
        repository: Arc<dyn Repository<OrderAggregate>>,
        engine: Arc<OrderEngine>,
        context: LifecycleContext,
    ) -> Self {
        Self { repository, engine, context }
    }

    /// Create an order in the initial state and persist it
    pub async fn create_order(&self, po_number: impl Into<String>, total_cents: i64) -> Result<Uuid> {
        let total = Money::from_cents(total_cents)?;
        let mut order = OrderAggregate::new(po_number, total);
        self.repository.save(&mut order).await?;

        tracing::info!(
            order_id = %order.id,
            po_number = %order.po_number,
            total = %order.total,
            "📝 Order created"
        );

        Ok(order.id)
    }

    pub async fn load(&self, order_id: Uuid) -> Result<OrderAggregate> {
        self.repository
            .load(order_id)
            .await?
            .ok_or_else(|| anyhow!("Order does not exist: {}", order_id))
    }

    pub async fn state(&self, order_id: Uuid) -> Result<OrderState> {
        Ok(self.load(order_id).await?.state())
    }

    /// Fire an event and persist the order if a transition was committed.
    ///
    /// Guards may block on external systems, so the engine runs on the
    /// blocking pool.
    pub async fn fire(&self, order_id: Uuid, event: OrderEvent) -> Result<TransitionOutcome<OrderState>> {
        let order = self.load(order_id).await?;

        let engine = Arc::clone(&self.engine);
        let context = self.context.clone();
        let (mut order, outcome) = tokio::task::spawn_blocking(move || {
            let mut order = order;
            let outcome = engine.fire(&mut order, event, &context);
            (order, outcome)
        })
        .await
        .map_err(|e| anyhow!("Lifecycle fire for order {} panicked: {}", order_id, e))?;

        if outcome.is_transitioned() {
            self.repository.save(&mut order).await?;
        }

        Ok(outcome)
    }

    pub async fn advance(&self, order_id: Uuid) -> Result<TransitionOutcome<OrderState>> {
        self.fire(order_id, OrderEvent::Advance).await
    }

    /// Events with a candidate from the order's current state
    pub async fn permitted_events(&self, order_id: Uuid) -> Result<Vec<OrderEvent>> {
        let order = self.load(order_id).await?;
        Ok(self.engine.permitted_events(&order))
    }

    // ------------------------------------------------------------------------
    // Collaborator commands
    // ------------------------------------------------------------------------

    pub async fn attach_shipping_address(&self, order_id: Uuid, postal_code: &str) -> Result<()> {
        let address = ShippingAddress::new(postal_code)?;
        self.update(order_id, |order| {
            order.attach_shipping_address(address);
            Ok(())
        })
        .await
    }

    pub async fn attach_payment_method(&self, order_id: Uuid) -> Result<Uuid> {
        self.update(order_id, |order| Ok(order.attach_payment_method(PaymentMethod::new())))
            .await
    }

    pub async fn decline_payment_method(&self, order_id: Uuid) -> Result<()> {
        self.update(order_id, OrderAggregate::decline_payment_method).await
    }

    pub async fn accept_payment_method(&self, order_id: Uuid) -> Result<()> {
        self.update(order_id, OrderAggregate::accept_payment_method).await
    }

    pub async fn add_shipment(&self, order_id: Uuid) -> Result<Uuid> {
        self.update(order_id, |order| Ok(order.add_shipment(Shipment::new()))).await
    }

    pub async fn remove_shipment(&self, order_id: Uuid, shipment_id: Uuid) -> Result<()> {
        self.update(order_id, |order| order.remove_shipment(shipment_id).map(|_| ()))
            .await
    }

    pub async fn mark_shipment_shipped(&self, order_id: Uuid, shipment_id: Uuid) -> Result<()> {
        self.update(order_id, |order| order.mark_shipment_shipped(shipment_id))
            .await
    }

    async fn update<T, F>(&self, order_id: Uuid, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut OrderAggregate) -> Result<T, OrderError>,
    {
        let mut order = self.load(order_id).await?;
        let expected_version = order.version();

        let value = mutate(&mut order)
            .map_err(|e| anyhow!("Command failed for order {}: {}", order_id, e))?;
        let new_version = self.repository.save(&mut order).await?;

        tracing::debug!(
            order_id = %order_id,
            expected_version = expected_version,
            new_version = new_version,
            "Applied collaborator command"
        );

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::lifecycle::order_engine;
    use crate::domain::order::notifications::{ChannelNotifier, OutboundNotification, Recipient};
    use crate::domain::order::services::{ScriptedServices, ServiceCall};
    use crate::state_machine::core::NoOpReason;
    use crate::state_machine::store::InMemoryRepository;
    use tokio::sync::mpsc;

    struct Harness {
        service: OrderLifecycleService,
        services: Arc<ScriptedServices>,
        repository: Arc<InMemoryRepository<OrderAggregate>>,
        notifications: mpsc::Receiver<OutboundNotification>,
    }

    fn harness() -> Harness {
        let services = Arc::new(ScriptedServices::succeeding());
        let repository = Arc::new(InMemoryRepository::<OrderAggregate>::new("Order"));
        let (notifier, notifications) = ChannelNotifier::new(32);
        let context = LifecycleContext::new(services.clone(), Arc::new(notifier));
        let service = OrderLifecycleService::new(repository.clone(), Arc::new(order_engine()), context);

        Harness { service, services, repository, notifications }
    }

    async fn order_with_collaborators(h: &Harness) -> Uuid {
        let order_id = h.service.create_order("PO-5001", 12_500).await.unwrap();
        h.service.attach_shipping_address(order_id, "55401").await.unwrap();
        h.service.add_shipment(order_id).await.unwrap();
        h.service.attach_payment_method(order_id).await.unwrap();
        order_id
    }

    #[tokio::test]
    async fn test_create_order_persists_pending() {
        let h = harness();
        let order_id = h.service.create_order("PO-5000", 100).await.unwrap();

        let order = h.service.load(order_id).await.unwrap();
        assert_eq!(order.state(), OrderState::Pending);
        assert_eq!(order.version, 1);
        assert_eq!(h.repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_order_rejects_negative_total() {
        let h = harness();
        let result = h.service.create_order("PO-5000", -5).await;

        assert!(result.is_err());
        assert!(h.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_fire_unknown_order_fails() {
        let h = harness();
        let result = h.service.advance(Uuid::new_v4()).await;

        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_advance_to_ordered_persists_each_step() {
        let mut h = harness();
        let order_id = order_with_collaborators(&h).await;

        for _ in 0..7 {
            assert!(h.service.advance(order_id).await.unwrap().is_transitioned());
        }

        let order = h.service.load(order_id).await.unwrap();
        assert_eq!(order.state(), OrderState::Ordered);
        assert_eq!(order.history().len(), 7);
        assert_eq!(h.repository.ids_in_state("ordered").await.unwrap(), vec![order_id]);

        let placed = h.notifications.recv().await.unwrap();
        assert_eq!(placed.recipient, Recipient::Customer);
        assert_eq!(placed.context.state, OrderState::Ordered);
    }

    #[tokio::test]
    async fn test_noop_does_not_save() {
        let h = harness();
        let order_id = h.service.create_order("PO-5002", 100).await.unwrap();
        let before = h.service.load(order_id).await.unwrap().version;

        let outcome = h.service.advance(order_id).await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Unchanged { state: OrderState::Pending, reason: NoOpReason::GuardRejected }
        );
        assert_eq!(h.service.load(order_id).await.unwrap().version, before);
    }

    #[tokio::test]
    async fn test_collaborator_command_errors_surface() {
        let h = harness();
        let order_id = h.service.create_order("PO-5003", 100).await.unwrap();

        assert!(h.service.decline_payment_method(order_id).await.is_err());
        assert!(h.service.mark_shipment_shipped(order_id, Uuid::new_v4()).await.is_err());
        assert!(h.service.attach_shipping_address(order_id, "").await.is_err());
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let h = harness();
        let order_id = h.service.create_order("PO-5004", 100).await.unwrap();

        let mut stale = h.service.load(order_id).await.unwrap();
        h.service.attach_shipping_address(order_id, "55401").await.unwrap();

        let result = h.repository.save(&mut stale).await;
        assert!(result.unwrap_err().to_string().contains("Concurrency conflict"));
    }

    #[tokio::test]
    async fn test_settlement_recovery_through_service() {
        let mut h = harness();
        let order_id = order_with_collaborators(&h).await;
        for _ in 0..7 {
            let _ = h.service.advance(order_id).await.unwrap();
        }

        let order = h.service.load(order_id).await.unwrap();
        let shipment_id = order.shipments().iter().next().unwrap().id;
        h.service.mark_shipment_shipped(order_id, shipment_id).await.unwrap();
        assert_eq!(h.service.advance(order_id).await.unwrap().state(), OrderState::Shipped);

        h.services.set_outcome(ServiceCall::SettleCharge, false);
        assert_eq!(h.service.advance(order_id).await.unwrap().state(), OrderState::SettlementFailed);
        assert_eq!(
            h.service.permitted_events(order_id).await.unwrap(),
            vec![OrderEvent::EditPaymentMethod]
        );

        let outcome = h.service.fire(order_id, OrderEvent::EditPaymentMethod).await.unwrap();
        assert_eq!(outcome.state(), OrderState::PaymentSettled);
        assert_eq!(h.services.last_recharge_cents(), 12_500);

        let mut recipients = Vec::new();
        while let Ok(notification) = h.notifications.try_recv() {
            recipients.push((notification.recipient, notification.context.state));
        }
        assert!(recipients.contains(&(Recipient::Admin, OrderState::SettlementFailed)));
        assert!(recipients.contains(&(Recipient::Customer, OrderState::PaymentSettled)));
    }
}
