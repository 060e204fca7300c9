use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// The various domain events the system can emit.
///
/// Events are advisory: services publish them after a successful mutation and
/// never fail the mutation when delivery fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Customer events
    CustomerCreated(Uuid),
    CustomerUpdated(Uuid),
    CustomerDeleted(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderNotesUpdated(Uuid),
    OrderItemAdded {
        order_id: Uuid,
        item_id: Uuid,
    },
    OrderItemRemoved {
        order_id: Uuid,
        item_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderReadyAtUpdated(Uuid),

    // Billing events
    PaymentRecorded {
        order_id: Uuid,
        payment_id: Uuid,
    },

    // Attachment events
    AttachmentUploaded {
        order_id: Uuid,
        attachment_id: Uuid,
    },
    AttachmentDeleted {
        order_id: Uuid,
        attachment_id: Uuid,
    },

    // Public tracking events
    TrackingTokenIssued(Uuid),
}

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

/// Consumes events from the channel until every sender is dropped.
///
/// The consumer only logs today; it is the seam where notification delivery
/// would plug in.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "domain event");
    }
    info!("Event processor stopped");
}
