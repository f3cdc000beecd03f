use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Fire-and-forget handle onto the notification sink.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns both ends.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event without blocking; a full or closed channel is logged and
    /// the event dropped. Used after commit, where the ledger outcome is final.
    pub fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.sender.try_send(event) {
            warn!(event = name, error = %e, "Dropped ledger event");
        }
    }
}

/// Domain events emitted after a ledger transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    InventoryAllocated {
        reference_type: String,
        reference_id: Uuid,
        entries: usize,
        quantity: Decimal,
    },
    InventoryReleased {
        reference_id: Uuid,
        quantity: Decimal,
        entries_removed: u64,
    },
    SaleFulfilled {
        reference_id: Uuid,
        quantity: Decimal,
    },
    BatchReceived {
        stock_id: i64,
        product_id: Uuid,
        warehouse_id: Uuid,
        batch_number: String,
        quantity: Decimal,
    },
    InventoryAdjusted {
        adjustment_id: Uuid,
        warehouse_id: Uuid,
        adjustment_type: String,
        lines: usize,
    },

    TransferSubmitted {
        transfer_id: Uuid,
        request_number: String,
    },
    TransferApproved {
        transfer_id: Uuid,
        approved_by: Uuid,
    },
    TransferRejected {
        transfer_id: Uuid,
        rejected_by: Uuid,
    },
    TransferEdited {
        transfer_id: Uuid,
    },
    TransferConfirmed {
        transfer_id: Uuid,
        new_stock_ids: Vec<i64>,
    },

    LoanIssued {
        loan_id: Uuid,
        request_number: String,
        customer_id: Uuid,
    },
    LoanApproved {
        loan_id: Uuid,
        approved_by: Uuid,
    },
    LoanRejected {
        loan_id: Uuid,
        rejected_by: Uuid,
    },
    LoanReturned {
        loan_id: Uuid,
        return_id: Uuid,
        status: String,
    },
    LoanClosed {
        loan_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::InventoryAllocated { .. } => "inventory_allocated",
            Event::InventoryReleased { .. } => "inventory_released",
            Event::SaleFulfilled { .. } => "sale_fulfilled",
            Event::BatchReceived { .. } => "batch_received",
            Event::InventoryAdjusted { .. } => "inventory_adjusted",
            Event::TransferSubmitted { .. } => "transfer_submitted",
            Event::TransferApproved { .. } => "transfer_approved",
            Event::TransferRejected { .. } => "transfer_rejected",
            Event::TransferEdited { .. } => "transfer_edited",
            Event::TransferConfirmed { .. } => "transfer_confirmed",
            Event::LoanIssued { .. } => "loan_issued",
            Event::LoanApproved { .. } => "loan_approved",
            Event::LoanRejected { .. } => "loan_rejected",
            Event::LoanReturned { .. } => "loan_returned",
            Event::LoanClosed { .. } => "loan_closed",
        }
    }

    /// Whether the event should reach an approver.
    pub fn needs_approval(&self) -> bool {
        matches!(
            self,
            Event::TransferSubmitted { .. } | Event::TransferEdited { .. } | Event::LoanIssued { .. }
        )
    }
}

/// Drains the channel, logging each event. Notification delivery is an
/// external collaborator; this loop is where it would be invoked.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        if event.needs_approval() {
            info!(event = event.name(), %payload, "Notifying approver");
            continue;
        }
        match &event {
            Event::TransferRejected { transfer_id, .. } => {
                info!(%transfer_id, "Notifying requester of rejected transfer");
            }
            Event::LoanRejected { loan_id, .. } => {
                info!(%loan_id, "Notifying requester of rejected loan");
            }
            other => {
                info!(event = other.name(), %payload, "Ledger event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_delivers_when_capacity_allows() {
        let (sender, mut rx) = EventSender::channel(4);
        let loan_id = Uuid::new_v4();
        sender.send_or_log(Event::LoanClosed { loan_id });
        assert_eq!(rx.recv().await, Some(Event::LoanClosed { loan_id }));
    }

    #[tokio::test]
    async fn send_or_log_drops_on_full_channel() {
        let (sender, mut rx) = EventSender::channel(1);
        let first = Uuid::new_v4();
        sender.send_or_log(Event::LoanClosed { loan_id: first });
        sender.send_or_log(Event::LoanClosed { loan_id: Uuid::new_v4() });
        assert_eq!(rx.recv().await, Some(Event::LoanClosed { loan_id: first }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        assert!(sender.send(Event::LoanClosed { loan_id: Uuid::new_v4() }).await.is_err());
    }

    #[test]
    fn approval_events() {
        let id = Uuid::new_v4();
        assert!(Event::TransferEdited { transfer_id: id }.needs_approval());
        assert!(!Event::LoanClosed { loan_id: id }.needs_approval());
    }
}
