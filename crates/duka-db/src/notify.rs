//! # Event Notifier
//!
//! Fire-and-forget dispatch of [`NotificationEvent`]s to whatever transport
//! the host wires up (push fan-out, websocket bridge, a test inspector).
//!
//! ## The Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Never Blocks, Never Fails                              │
//! │                                                                         │
//! │  commit transaction ──COMMIT──► notify(LowStock) ──► mpsc ──► consumer │
//! │                                 notify(NewSale)                         │
//! │                                                                         │
//! │  • Emission happens strictly AFTER the transaction commits             │
//! │  • An unbounded channel send cannot block the request path             │
//! │  • A missing/closed consumer means the event is logged and dropped     │
//! │  • No retries here; delivery guarantees belong to the transport        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller of `commit_sale` can never observe a notification failure.

use tokio::sync::mpsc;
use tracing::debug;

use duka_core::NotificationEvent;

/// Handle used by the engine and shift register to announce events.
///
/// Cheap to clone; all clones feed the same consumer.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    tx: Option<mpsc::UnboundedSender<NotificationEvent>>,
}

impl EventNotifier {
    /// Creates a connected notifier plus the receiving end for a consumer
    /// task (or a test) to drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventNotifier { tx: Some(tx) }, rx)
    }

    /// Creates a notifier with no consumer. Every event is dropped after a
    /// debug log line. Useful for embedded/test setups that don't care.
    pub fn disconnected() -> Self {
        EventNotifier { tx: None }
    }

    /// Emits an event. Never blocks, never errors.
    pub fn notify(&self, event: NotificationEvent) {
        match &self.tx {
            Some(tx) => {
                if let Err(err) = tx.send(event) {
                    // Consumer went away; the event is dropped by contract
                    debug!(error = %err, "Notification consumer gone, event dropped");
                }
            }
            None => {
                debug!(business_id = %event.business_id(), "No notification consumer attached, event dropped");
            }
        }
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::SaleSummary;

    fn sample_event() -> NotificationEvent {
        NotificationEvent::NewSale {
            business_id: "biz-1".to_string(),
            sale: SaleSummary {
                receipt_number: "RCP-0001".to_string(),
                total_cents: 16000,
                created_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_connected_notifier_delivers() {
        let (notifier, mut rx) = EventNotifier::channel();

        notifier.notify(sample_event());

        let received = rx.recv().await.expect("event should arrive");
        assert_eq!(received.business_id(), "biz-1");
    }

    #[tokio::test]
    async fn test_disconnected_notifier_swallows() {
        let notifier = EventNotifier::disconnected();
        // Must not panic or error
        notifier.notify(sample_event());
    }

    #[tokio::test]
    async fn test_dropped_receiver_swallows() {
        let (notifier, rx) = EventNotifier::channel();
        drop(rx);
        // Consumer gone; send failure is swallowed by contract
        notifier.notify(sample_event());
    }
}
