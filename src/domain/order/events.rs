use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::OrderState;

// ============================================================================
// Order Events - Named triggers accepted by the order lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    /// Move to the next milestone from wherever the order currently is
    Advance,
    EditShippingAddress,
    EditShippingOptions,
    EditPaymentMethod,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 4] = [
        OrderEvent::Advance,
        OrderEvent::EditShippingAddress,
        OrderEvent::EditShippingOptions,
        OrderEvent::EditPaymentMethod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Advance => "advance",
            OrderEvent::EditShippingAddress => "edit_shipping_address",
            OrderEvent::EditShippingOptions => "edit_shipping_options",
            OrderEvent::EditPaymentMethod => "edit_payment_method",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry for one committed transition
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransitionRecord {
    pub event: OrderEvent,
    pub from: OrderState,
    pub to: OrderState,
    pub committed_at: DateTime<Utc>,
}
