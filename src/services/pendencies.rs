//! Pendency detection.
//!
//! A pendency is a derived condition, never stored: a shipment is missing
//! data it should have by now, or has blown past a scheduled date. Detection
//! is a pure function over one shipment and a clock reading; the service part
//! only fetches rows and aggregates.

use crate::{
    db::DbPool,
    entities::shipment::{self, ShipmentStatus},
    errors::ServiceError,
    services::shipments::search_condition,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum::{EnumIter, IntoEnumIterator};
use tracing::instrument;

/// The kinds of pendency, declared from most to least critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum PendencyKind {
    DeliveryOverdue,
    LoadingOverdue,
    MissingDeliveryDate,
    MissingLoadingDate,
    MissingScheduling,
}

impl PendencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendencyKind::DeliveryOverdue => "delivery_overdue",
            PendencyKind::LoadingOverdue => "loading_overdue",
            PendencyKind::MissingDeliveryDate => "missing_delivery_date",
            PendencyKind::MissingLoadingDate => "missing_loading_date",
            PendencyKind::MissingScheduling => "missing_scheduling",
        }
    }

    /// Sort rank, 1 is the most critical.
    pub fn severity(&self) -> u8 {
        match self {
            PendencyKind::DeliveryOverdue => 1,
            PendencyKind::LoadingOverdue => 2,
            PendencyKind::MissingDeliveryDate => 3,
            PendencyKind::MissingLoadingDate => 4,
            PendencyKind::MissingScheduling => 5,
        }
    }
}

impl fmt::Display for PendencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PendencyKind::DeliveryOverdue => "Delivery overdue",
            PendencyKind::LoadingOverdue => "Loading overdue",
            PendencyKind::MissingDeliveryDate => "Missing delivery date",
            PendencyKind::MissingLoadingDate => "Missing loading date",
            PendencyKind::MissingScheduling => "Missing scheduling",
        };
        write!(f, "{}", label)
    }
}

/// One detected pendency. A shipment with several concurrent conditions
/// yields several of these.
#[derive(Debug, Clone)]
pub struct Pendency {
    pub shipment: shipment::Model,
    pub kind: PendencyKind,
}

/// Filters for the pendency dashboard.
#[derive(Debug, Clone, Default)]
pub struct PendencyFilter {
    pub kind: Option<PendencyKind>,
    pub carrier_name: Option<String>,
    pub without_carrier: bool,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendencyCount {
    pub kind: PendencyKind,
    pub count: usize,
}

/// Per-kind counts plus the late-badge total, for the dashboard header.
#[derive(Debug, Clone, Serialize)]
pub struct PendencySummary {
    pub counts: Vec<PendencyCount>,
    pub late_shipments: usize,
}

/// Evaluates every pendency rule for one shipment against `now`.
///
/// The rules are independent; the result is ordered most critical first.
pub fn detect(shipment: &shipment::Model, now: DateTime<Utc>) -> Vec<PendencyKind> {
    let mut kinds = Vec::new();

    // Overdue rules share the late definition with the listing badge, so a
    // rebilled shipment is never overdue either.
    if shipment.is_late(now) {
        kinds.push(PendencyKind::DeliveryOverdue);
    }
    if matches!(
        shipment.status,
        ShipmentStatus::Scheduled | ShipmentStatus::AwaitingLoading
    ) {
        if let Some(loading_at) = shipment.scheduled_loading_at {
            if loading_at < now {
                kinds.push(PendencyKind::LoadingOverdue);
            }
        }
    }
    if shipment.scheduled_delivery_at.is_none()
        && matches!(
            shipment.status,
            ShipmentStatus::Loaded | ShipmentStatus::InTransit | ShipmentStatus::Delivered
        )
    {
        kinds.push(PendencyKind::MissingDeliveryDate);
    }
    if shipment.scheduled_loading_at.is_none()
        && matches!(
            shipment.status,
            ShipmentStatus::Scheduled | ShipmentStatus::AwaitingLoading
        )
    {
        kinds.push(PendencyKind::MissingLoadingDate);
    }
    if shipment.status == ShipmentStatus::AwaitingScheduling {
        kinds.push(PendencyKind::MissingScheduling);
    }

    kinds
}

/// Service for the pendency dashboard
#[derive(Clone)]
pub struct PendencyService {
    db_pool: Arc<DbPool>,
}

impl PendencyService {
    /// Creates a new pendency service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists current pendencies, most critical first, oldest shipment first
    /// within the same kind. All rules are evaluated against a single clock
    /// reading so one response is internally consistent.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &PendencyFilter) -> Result<Vec<Pendency>, ServiceError> {
        let shipments = self.fetch(filter).await?;
        let now = Utc::now();

        let mut pendencies: Vec<Pendency> = Vec::new();
        for shipment in shipments {
            for kind in detect(&shipment, now) {
                if filter.kind.map_or(true, |wanted| wanted == kind) {
                    pendencies.push(Pendency {
                        shipment: shipment.clone(),
                        kind,
                    });
                }
            }
        }

        pendencies.sort_by(|a, b| {
            a.kind
                .severity()
                .cmp(&b.kind.severity())
                .then(a.shipment.created_at.cmp(&b.shipment.created_at))
                .then(a.shipment.id.cmp(&b.shipment.id))
        });
        Ok(pendencies)
    }

    /// Counts pendencies per kind over the whole collection
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<PendencySummary, ServiceError> {
        let shipments = self.fetch(&PendencyFilter::default()).await?;
        let now = Utc::now();

        let mut per_kind: std::collections::HashMap<PendencyKind, usize> =
            std::collections::HashMap::new();
        let mut late_shipments = 0;
        for shipment in &shipments {
            if shipment.is_late(now) {
                late_shipments += 1;
            }
            for kind in detect(shipment, now) {
                *per_kind.entry(kind).or_insert(0) += 1;
            }
        }

        // Every kind appears, zero or not, in severity order.
        let counts = PendencyKind::iter()
            .map(|kind| PendencyCount {
                kind,
                count: per_kind.get(&kind).copied().unwrap_or(0),
            })
            .collect();

        Ok(PendencySummary {
            counts,
            late_shipments,
        })
    }

    async fn fetch(&self, filter: &PendencyFilter) -> Result<Vec<shipment::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = shipment::Entity::find();
        if filter.without_carrier {
            query = query.filter(shipment::Column::CarrierName.is_null());
        } else if let Some(name) = &filter.carrier_name {
            query = query.filter(shipment::Column::CarrierName.eq(name.clone()));
        }
        if let Some(term) = &filter.search {
            if !term.trim().is_empty() {
                query = query.filter(search_condition(term));
            }
        }

        query
            .order_by_asc(shipment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use test_case::test_case;
    use uuid::Uuid;

    fn sample(status: ShipmentStatus) -> shipment::Model {
        shipment::Model {
            id: Uuid::new_v4(),
            shipment_number: "RM-001".to_string(),
            invoice_number: "NF-100".to_string(),
            client_name: "Acme".to_string(),
            carrier_name: None,
            status,
            loading_type: None,
            scheduled_delivery_at: None,
            scheduled_loading_at: None,
            loaded_at: None,
            dispatched_at: None,
            label_created: false,
            label_created_at: None,
            label_received: false,
            label_received_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn a_fresh_shipment_only_misses_scheduling() {
        let shipment = sample(ShipmentStatus::AwaitingScheduling);
        let kinds = detect(&shipment, Utc::now());
        assert_eq!(kinds, vec![PendencyKind::MissingScheduling]);
    }

    #[test_case(ShipmentStatus::Scheduled ; "scheduled")]
    #[test_case(ShipmentStatus::AwaitingLoading ; "awaiting loading")]
    fn missing_loading_date_applies_before_loading(status: ShipmentStatus) {
        let shipment = sample(status);
        assert!(detect(&shipment, Utc::now()).contains(&PendencyKind::MissingLoadingDate));

        let mut with_date = sample(status);
        with_date.scheduled_loading_at = Some(Utc::now() + Duration::days(1));
        assert!(!detect(&with_date, Utc::now()).contains(&PendencyKind::MissingLoadingDate));
    }

    #[test_case(ShipmentStatus::Loaded ; "loaded")]
    #[test_case(ShipmentStatus::InTransit ; "in transit")]
    #[test_case(ShipmentStatus::Delivered ; "delivered")]
    fn missing_delivery_date_applies_after_loading(status: ShipmentStatus) {
        let shipment = sample(status);
        assert!(detect(&shipment, Utc::now()).contains(&PendencyKind::MissingDeliveryDate));
    }

    #[test]
    fn missing_delivery_date_does_not_apply_while_awaiting() {
        let shipment = sample(ShipmentStatus::AwaitingScheduling);
        assert!(!detect(&shipment, Utc::now()).contains(&PendencyKind::MissingDeliveryDate));
    }

    #[test_case(ShipmentStatus::Scheduled ; "scheduled")]
    #[test_case(ShipmentStatus::AwaitingLoading ; "awaiting loading")]
    fn a_past_loading_date_is_overdue(status: ShipmentStatus) {
        let now = Utc::now();
        let mut shipment = sample(status);
        shipment.scheduled_loading_at = Some(now - Duration::hours(2));
        assert!(detect(&shipment, now).contains(&PendencyKind::LoadingOverdue));

        shipment.scheduled_loading_at = Some(now + Duration::hours(2));
        assert!(!detect(&shipment, now).contains(&PendencyKind::LoadingOverdue));
    }

    #[test]
    fn loading_overdue_does_not_apply_once_loaded() {
        let now = Utc::now();
        let mut shipment = sample(ShipmentStatus::InTransit);
        shipment.scheduled_loading_at = Some(now - Duration::hours(2));
        assert!(!detect(&shipment, now).contains(&PendencyKind::LoadingOverdue));
    }

    #[test]
    fn a_past_delivery_date_in_transit_is_overdue_and_late() {
        let now = Utc::now();
        let mut shipment = sample(ShipmentStatus::InTransit);
        shipment.scheduled_delivery_at = Some(now - Duration::days(1));

        assert!(detect(&shipment, now).contains(&PendencyKind::DeliveryOverdue));
        assert!(shipment.is_late(now));
    }

    #[test]
    fn delivery_overdue_is_evaluated_even_while_awaiting_loading() {
        let now = Utc::now();
        let mut shipment = sample(ShipmentStatus::AwaitingLoading);
        shipment.scheduled_delivery_at = Some(now - Duration::days(1));

        let kinds = detect(&shipment, now);
        assert!(kinds.contains(&PendencyKind::DeliveryOverdue));
        // The loading-stage rules still fire alongside it.
        assert!(kinds.contains(&PendencyKind::MissingLoadingDate));
    }

    #[test_case(ShipmentStatus::Delivered ; "delivered")]
    #[test_case(ShipmentStatus::Cancelled ; "cancelled")]
    #[test_case(ShipmentStatus::Rebilled ; "rebilled")]
    fn closed_shipments_are_never_overdue(status: ShipmentStatus) {
        let now = Utc::now();
        let mut shipment = sample(status);
        shipment.scheduled_delivery_at = Some(now - Duration::days(3));
        shipment.scheduled_loading_at = Some(now - Duration::days(4));

        let kinds = detect(&shipment, now);
        assert!(!kinds.contains(&PendencyKind::DeliveryOverdue));
        assert!(!kinds.contains(&PendencyKind::LoadingOverdue));
        assert!(!shipment.is_late(now));
    }

    #[test]
    fn concurrent_pendencies_come_out_most_critical_first() {
        let now = Utc::now();
        let mut shipment = sample(ShipmentStatus::Scheduled);
        shipment.scheduled_delivery_at = Some(now - Duration::hours(1));

        let kinds = detect(&shipment, now);
        assert_eq!(
            kinds,
            vec![
                PendencyKind::DeliveryOverdue,
                PendencyKind::MissingLoadingDate,
            ]
        );
        assert!(kinds[0].severity() < kinds[1].severity());
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(PendencyKind::DeliveryOverdue.as_str(), "delivery_overdue");
        assert_eq!(PendencyKind::MissingScheduling.to_string(), "Missing scheduling");
        let ranks: Vec<u8> = PendencyKind::iter().map(|k| k.severity()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    proptest! {
        // Whatever the dates say, a closed shipment never raises an overdue
        // pendency or the late badge.
        #[test]
        fn closed_statuses_never_go_overdue(
            status_idx in 0usize..3,
            delivery_offset_minutes in -50_000i64..50_000,
            loading_offset_minutes in -50_000i64..50_000,
            has_delivery in any::<bool>(),
            has_loading in any::<bool>(),
        ) {
            let closed = [
                ShipmentStatus::Delivered,
                ShipmentStatus::Cancelled,
                ShipmentStatus::Rebilled,
            ];
            let now = Utc::now();
            let mut shipment = sample(closed[status_idx]);
            if has_delivery {
                shipment.scheduled_delivery_at =
                    Some(now + Duration::minutes(delivery_offset_minutes));
            }
            if has_loading {
                shipment.scheduled_loading_at =
                    Some(now + Duration::minutes(loading_offset_minutes));
            }

            let kinds = detect(&shipment, now);
            prop_assert!(!kinds.contains(&PendencyKind::DeliveryOverdue));
            prop_assert!(!kinds.contains(&PendencyKind::LoadingOverdue));
            prop_assert!(!shipment.is_late(now));
        }
    }
}
