use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events emitted by the core after committed mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Stock ledger events
    StockAdjusted {
        tenant_id: Uuid,
        product_id: Uuid,
        movement_type: String,
        quantity: i32,
        previous_stock: i32,
        new_stock: i32,
    },
    LowStock {
        tenant_id: Uuid,
        product_id: Uuid,
        stock: i32,
        threshold: i32,
    },

    // Rule resolver events
    DiscountRedeemed {
        tenant_id: Uuid,
        code: String,
        usage_count: i32,
    },

    // Automation job events
    AttendanceAutoClosed(Uuid),
    BookingMarkedNoShow(Uuid),
    BookingReminderSent(Uuid),
    CartReminderSent(Uuid),
    PriceChanged {
        tenant_id: Uuid,
        product_id: Uuid,
        old_price: Decimal,
        new_price: Decimal,
    },
    ReorderSuggested {
        tenant_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        auto_created: bool,
    },
    BranchChangeMerged {
        tenant_id: Uuid,
        entity_type: String,
        entity_id: Uuid,
    },
    SyncConflictDetected {
        tenant_id: Uuid,
        entity_type: String,
        entity_id: Uuid,
    },
    SuspiciousActivityFlagged {
        tenant_id: Uuid,
        actor_id: Uuid,
        alert_type: String,
    },
    JobCompleted {
        job: String,
        processed: u64,
        failed: u64,
    },
}

/// Drains the event channel, logging each event. Runs for the lifetime of
/// the process; exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                tenant_id,
                product_id,
                stock,
                threshold,
            } => {
                warn!(
                    %tenant_id,
                    %product_id,
                    stock,
                    threshold,
                    "product at or below low-stock threshold"
                );
            }
            Event::SuspiciousActivityFlagged {
                tenant_id,
                actor_id,
                alert_type,
            } => {
                warn!(%tenant_id, %actor_id, %alert_type, "suspicious activity flagged");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }
    info!("event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::BookingMarkedNoShow(Uuid::nil()))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::BookingMarkedNoShow(id)) => assert_eq!(id, Uuid::nil()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::JobCompleted {
                job: "no_show".into(),
                processed: 0,
                failed: 0,
            })
            .await;
        assert!(result.is_err());
    }
}
