pub mod carriers;
pub mod pendencies;
pub mod schedule;
pub mod shipments;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub shipments: Arc<crate::services::shipments::ShipmentService>,
    pub carriers: Arc<crate::services::carriers::CarrierService>,
    pub pendencies: Arc<crate::services::pendencies::PendencyService>,
    pub schedule: Arc<crate::services::schedule::ScheduleService>,
}

impl AppServices {
    /// Builds the service container shared by all handlers.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            shipments: Arc::new(crate::services::shipments::ShipmentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            carriers: Arc::new(crate::services::carriers::CarrierService::new(
                db_pool.clone(),
                event_sender,
            )),
            pendencies: Arc::new(crate::services::pendencies::PendencyService::new(
                db_pool.clone(),
            )),
            schedule: Arc::new(crate::services::schedule::ScheduleService::new(db_pool)),
        }
    }
}
