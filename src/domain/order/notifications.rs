use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::metrics::Metrics;
use super::value_objects::OrderState;

// ============================================================================
// Notification Boundary
// ============================================================================
//
// Invoked by post-transition hooks. Fire-and-forget: the engine never
// observes a delivery failure and never retries.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Customer,
    Admin,
}

impl Recipient {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recipient::Customer => "customer",
            Recipient::Admin => "admin",
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContext {
    pub po_number: String,
    pub state: OrderState,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: Recipient, order_id: Uuid, context: NotificationContext);
}

/// A notification queued on the outbound channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub id: Uuid,
    pub recipient: Recipient,
    pub order_id: Uuid,
    pub context: NotificationContext,
}

/// Hands notifications to a bounded tokio channel drained by the host
/// application. A full or closed channel drops the notification.
pub struct ChannelNotifier {
    sender: mpsc::Sender<OutboundNotification>,
    metrics: Option<Arc<Metrics>>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundNotification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender, metrics: None }, receiver)
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, recipient: Recipient, order_id: Uuid, context: NotificationContext) {
        let notification = OutboundNotification {
            id: Uuid::now_v7(),
            recipient,
            order_id,
            context,
        };

        match self.sender.try_send(notification) {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_notification(recipient.as_str());
                }
            }
            Err(TrySendError::Full(dropped)) | Err(TrySendError::Closed(dropped)) => {
                tracing::warn!(
                    order_id = %order_id,
                    recipient = %recipient,
                    notification_id = %dropped.id,
                    "Dropped notification, outbound channel unavailable"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_notification_dropped();
                }
            }
        }
    }
}

/// Logs notifications instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, recipient: Recipient, order_id: Uuid, context: NotificationContext) {
        tracing::info!(
            order_id = %order_id,
            po_number = %context.po_number,
            recipient = %recipient,
            state = %context.state,
            "📣 {}",
            context.message
        );
    }
}
