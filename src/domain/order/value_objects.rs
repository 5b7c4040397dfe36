use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle position of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    HasShippingAddress,
    HasShipments,
    HasShippingOptions,
    HasPaymentMethod,
    ReadyToOrder,
    PaymentAuthorized,
    Ordered,
    Shipped,
    PaymentSettled,

    // Failure States
    ShipmentQuoteFailed,
    PaymentDeclined,
    AuthorizationFailed,
    OrderFailed,
    SettlementFailed,
}

impl OrderState {
    pub const ALL: [OrderState; 15] = [
        OrderState::Pending,
        OrderState::HasShippingAddress,
        OrderState::HasShipments,
        OrderState::HasShippingOptions,
        OrderState::HasPaymentMethod,
        OrderState::ReadyToOrder,
        OrderState::PaymentAuthorized,
        OrderState::Ordered,
        OrderState::Shipped,
        OrderState::PaymentSettled,
        OrderState::ShipmentQuoteFailed,
        OrderState::PaymentDeclined,
        OrderState::AuthorizationFailed,
        OrderState::OrderFailed,
        OrderState::SettlementFailed,
    ];

    pub const INITIAL: OrderState = OrderState::Pending;

    /// Label as stored in the state column
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::HasShippingAddress => "has_shipping_address",
            OrderState::HasShipments => "has_shipments",
            OrderState::HasShippingOptions => "has_shipping_options",
            OrderState::HasPaymentMethod => "has_payment_method",
            OrderState::ReadyToOrder => "ready_to_order",
            OrderState::PaymentAuthorized => "payment_authorized",
            OrderState::Ordered => "ordered",
            OrderState::Shipped => "shipped",
            OrderState::PaymentSettled => "payment_settled",
            OrderState::ShipmentQuoteFailed => "shipment_quote_failed",
            OrderState::PaymentDeclined => "payment_declined",
            OrderState::AuthorizationFailed => "authorization_failed",
            OrderState::OrderFailed => "order_failed",
            OrderState::SettlementFailed => "settlement_failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OrderState::ShipmentQuoteFailed
                | OrderState::PaymentDeclined
                | OrderState::AuthorizationFailed
                | OrderState::OrderFailed
                | OrderState::SettlementFailed
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order total in minor units (cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> Result<Self, OrderError> {
        if cents < 0 {
            return Err(OrderError::NegativeTotal(cents));
        }
        Ok(Self(cents))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    postal_code: String,
}

impl ShippingAddress {
    pub fn new(postal_code: impl Into<String>) -> Result<Self, OrderError> {
        let postal_code = postal_code.into();
        if postal_code.trim().is_empty() {
            return Err(OrderError::EmptyPostalCode);
        }
        Ok(Self { postal_code })
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    #[serde(default)]
    declined: bool,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentMethod {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            declined: false,
        }
    }

    pub fn mark_declined(&mut self) {
        self.declined = true;
    }

    pub fn mark_accepted(&mut self) {
        self.declined = false;
    }

    pub fn is_declined(&self) -> bool {
        self.declined
    }

    pub fn is_accepted(&self) -> bool {
        !self.declined
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    shipped: bool,
    shipped_at: Option<DateTime<Utc>>,
}

impl Default for Shipment {
    fn default() -> Self {
        Self::new()
    }
}

impl Shipment {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            shipped: false,
            shipped_at: None,
        }
    }

    /// Idempotent: a second call keeps the flag and overwrites the timestamp
    pub fn mark_shipped(&mut self) {
        self.shipped = true;
        self.shipped_at = Some(Utc::now());
    }

    pub fn is_shipped(&self) -> bool {
        self.shipped
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }
}

/// The shipments owned by one order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shipments(Vec<Shipment>);

impl Shipments {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff there is at least one shipment and every one is shipped.
    /// An empty collection is NOT all shipped.
    pub fn all_shipped(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Shipment::is_shipped)
    }

    pub fn push(&mut self, shipment: Shipment) {
        self.0.push(shipment);
    }

    pub fn get_mut(&mut self, shipment_id: Uuid) -> Option<&mut Shipment> {
        self.0.iter_mut().find(|s| s.id == shipment_id)
    }

    pub fn remove(&mut self, shipment_id: Uuid) -> Option<Shipment> {
        let index = self.0.iter().position(|s| s.id == shipment_id)?;
        Some(self.0.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shipment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
