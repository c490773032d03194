use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::shipment::LoadingType;

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

// The events emitted after successful state changes. Consumers only observe;
// nothing here feeds back into the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ShipmentCreated(Uuid),
    DeliveryScheduled {
        shipment_id: Uuid,
        scheduled_for: DateTime<Utc>,
    },
    LoadingScheduled {
        shipment_id: Uuid,
        scheduled_for: DateTime<Utc>,
    },
    ShipmentLoaded(Uuid),
    ShipmentDelivered(Uuid),
    ShipmentCancelled {
        shipment_id: Uuid,
        reason: String,
    },
    ShipmentRestored(Uuid),
    ShipmentRebilled {
        original_id: Uuid,
        replacement_id: Uuid,
    },
    CarrierAssigned {
        shipment_id: Uuid,
        carrier_name: String,
    },
    LoadingTypeSet {
        shipment_id: Uuid,
        loading_type: LoadingType,
    },
    LabelCreated(Uuid),
    LabelReceived(Uuid),
    ShipmentEdited(Uuid),
    ShipmentDeleted(Uuid),
    CarrierCreated(Uuid),
    CarrierUpdated(Uuid),
    CarrierDeleted(Uuid),
}

// Consumes the event channel and dispatches each event to its handler.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::ShipmentCreated(shipment_id) => {
                if let Err(e) = handle_shipment_created(shipment_id).await {
                    error!(
                        "Failed to handle shipment created event: shipment_id={}, error={}",
                        shipment_id, e
                    );
                }
            }
            Event::ShipmentRebilled {
                original_id,
                replacement_id,
            } => {
                if let Err(e) = handle_shipment_rebilled(original_id, replacement_id).await {
                    error!(
                        "Failed to handle rebill event: original_id={}, error={}",
                        original_id, e
                    );
                }
            }
            Event::ShipmentCancelled {
                shipment_id,
                reason,
            } => {
                if let Err(e) = handle_shipment_cancelled(shipment_id, &reason).await {
                    error!(
                        "Failed to handle cancellation event: shipment_id={}, error={}",
                        shipment_id, e
                    );
                }
            }
            // The remaining events only need the audit log line above
            _ => {}
        }
    }

    info!("Event processing loop finished");
}

async fn handle_shipment_created(shipment_id: Uuid) -> Result<(), String> {
    info!(%shipment_id, "shipment entered the tracking pipeline");
    Ok(())
}

async fn handle_shipment_rebilled(original_id: Uuid, replacement_id: Uuid) -> Result<(), String> {
    info!(
        %original_id,
        %replacement_id,
        "shipment closed by rebilling, replacement created"
    );
    Ok(())
}

async fn handle_shipment_cancelled(shipment_id: Uuid, reason: &str) -> Result<(), String> {
    info!(%shipment_id, reason, "shipment cancelled");
    Ok(())
}
