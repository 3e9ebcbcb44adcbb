use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Handle for emitting domain events from services.
///
/// Sending never blocks the caller beyond channel backpressure; a full or
/// closed channel surfaces as an error the caller is expected to log and
/// swallow, state changes must not fail because an event was dropped.
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

/// Creates the in-process event channel with its sender handle.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

// The events emitted by the replenishment core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Purchase request lifecycle
    PurchaseRequestCreated {
        request_id: Uuid,
        product_id: Uuid,
        priority: String,
        source: String,
    },
    PurchaseRequestApproved {
        request_id: Uuid,
        approved_by: Option<Uuid>,
    },
    PurchaseRequestRejected {
        request_id: Uuid,
    },
    PurchaseRequestConverted {
        request_id: Uuid,
        purchase_order_id: Uuid,
    },

    // Purchase orders
    PurchaseOrderCreated(Uuid),

    // Inventory planning
    ReorderPointChanged {
        product_id: Uuid,
        old_value: i32,
        new_value: i32,
    },

    // Supplier catalog
    SupplierOfferUpserted {
        supplier_id: Uuid,
        product_id: Uuid,
    },
}

/// Consumes events off the channel and logs them.
///
/// External fan-out (webhooks, mail) is out of scope; the log stream is the
/// integration point.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseRequestCreated {
                request_id,
                product_id,
                priority,
                source,
            } => {
                info!(
                    %request_id,
                    %product_id,
                    priority,
                    source,
                    "purchase request created"
                );
            }
            Event::PurchaseRequestApproved {
                request_id,
                approved_by,
            } => {
                info!(%request_id, ?approved_by, "purchase request approved");
            }
            Event::PurchaseRequestRejected { request_id } => {
                info!(%request_id, "purchase request rejected");
            }
            Event::PurchaseRequestConverted {
                request_id,
                purchase_order_id,
            } => {
                info!(%request_id, %purchase_order_id, "purchase request converted");
            }
            Event::PurchaseOrderCreated(purchase_order_id) => {
                info!(%purchase_order_id, "purchase order created");
            }
            Event::ReorderPointChanged {
                product_id,
                old_value,
                new_value,
            } => {
                info!(%product_id, old_value, new_value, "reorder point changed");
            }
            Event::SupplierOfferUpserted {
                supplier_id,
                product_id,
            } => {
                info!(%supplier_id, %product_id, "supplier offer upserted");
            }
        }
    }

    warn!("Event channel closed; processing loop exiting");
}
