//! Calendar projections over the shipment collection.
//!
//! Scheduled loading and delivery dates are projected into calendar events,
//! and a day-based alert view groups what is due today or already missed.
//! Like pendency detection, everything here is derived on read.

use crate::{
    db::DbPool,
    entities::shipment::{self, ShipmentStatus},
    errors::ServiceError,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleEventKind {
    Loading,
    Delivery,
}

impl ScheduleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleEventKind::Loading => "loading",
            ScheduleEventKind::Delivery => "delivery",
        }
    }
}

impl fmt::Display for ScheduleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScheduleEventKind::Loading => "Loading",
            ScheduleEventKind::Delivery => "Delivery",
        };
        write!(f, "{}", label)
    }
}

/// One calendar entry. A shipment with both dates booked yields two.
#[derive(Debug, Clone)]
pub struct ScheduleEvent {
    pub shipment: shipment::Model,
    pub kind: ScheduleEventKind,
    pub scheduled_at: DateTime<Utc>,
    /// The shipment was cancelled; calendars render the entry struck through.
    pub cancelled: bool,
    /// The scheduled step already happened.
    pub completed: bool,
}

/// Day-based dashboard buckets.
#[derive(Debug, Clone, Default)]
pub struct ScheduleAlerts {
    pub loadings_today: Vec<shipment::Model>,
    pub deliveries_today: Vec<shipment::Model>,
    pub overdue_deliveries: Vec<shipment::Model>,
}

/// Projects one shipment into its calendar events.
pub fn events_for(shipment: &shipment::Model) -> Vec<ScheduleEvent> {
    let cancelled = shipment.status == ShipmentStatus::Cancelled;
    let mut events = Vec::new();

    if let Some(at) = shipment.scheduled_loading_at {
        events.push(ScheduleEvent {
            shipment: shipment.clone(),
            kind: ScheduleEventKind::Loading,
            scheduled_at: at,
            cancelled,
            completed: shipment.loaded_at.is_some(),
        });
    }
    if let Some(at) = shipment.scheduled_delivery_at {
        events.push(ScheduleEvent {
            shipment: shipment.clone(),
            kind: ScheduleEventKind::Delivery,
            scheduled_at: at,
            cancelled,
            completed: shipment.status == ShipmentStatus::Delivered,
        });
    }

    events
}

fn loading_due_today(shipment: &shipment::Model, today: NaiveDate) -> bool {
    shipment
        .scheduled_loading_at
        .map_or(false, |at| at.date_naive() == today)
        && shipment.loaded_at.is_none()
        && !shipment.status.is_terminal()
}

fn delivery_due_today(shipment: &shipment::Model, today: NaiveDate) -> bool {
    shipment
        .scheduled_delivery_at
        .map_or(false, |at| at.date_naive() == today)
        && !shipment.status.is_terminal()
}

// Whole-day granularity: a delivery is only listed here once its calendar
// day has fully passed, unlike the timestamp-level late badge.
fn delivery_missed(shipment: &shipment::Model, today: NaiveDate) -> bool {
    shipment
        .scheduled_delivery_at
        .map_or(false, |at| at.date_naive() < today)
        && !shipment.status.is_terminal()
}

/// Service for the logistics calendar and its alert widget
#[derive(Clone)]
pub struct ScheduleService {
    db_pool: Arc<DbPool>,
}

impl ScheduleService {
    /// Creates a new schedule service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists calendar events, optionally clipped to a day range, ordered by
    /// scheduled time
    #[instrument(skip(self))]
    pub async fn events(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ScheduleEvent>, ServiceError> {
        let shipments = self.fetch_all().await?;

        let mut events: Vec<ScheduleEvent> = shipments
            .iter()
            .flat_map(events_for)
            .filter(|event| {
                let day = event.scheduled_at.date_naive();
                from.map_or(true, |lower| day >= lower) && to.map_or(true, |upper| day <= upper)
            })
            .collect();

        events.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then(a.shipment.id.cmp(&b.shipment.id))
        });
        Ok(events)
    }

    /// Groups shipments into today's workload and the missed-delivery list
    #[instrument(skip(self))]
    pub async fn alerts(&self) -> Result<ScheduleAlerts, ServiceError> {
        let shipments = self.fetch_all().await?;
        let today = Utc::now().date_naive();

        let mut alerts = ScheduleAlerts::default();
        for shipment in shipments {
            if loading_due_today(&shipment, today) {
                alerts.loadings_today.push(shipment.clone());
            }
            if delivery_due_today(&shipment, today) {
                alerts.deliveries_today.push(shipment.clone());
            }
            if delivery_missed(&shipment, today) {
                alerts.overdue_deliveries.push(shipment);
            }
        }
        Ok(alerts)
    }

    async fn fetch_all(&self) -> Result<Vec<shipment::Model>, ServiceError> {
        let db = &*self.db_pool;
        shipment::Entity::find()
            .order_by_asc(shipment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
