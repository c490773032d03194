use crate::{
    db::DbPool,
    entities::shipment::{self, LoadingType, ShipmentStatus},
    entities::shipment_history,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, Unchanged,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Input for creating a shipment.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub shipment_number: String,
    pub invoice_number: String,
    pub client_name: String,
    pub carrier_name: Option<String>,
}

/// Result of a state-changing operation.
///
/// `history_recorded` is false when the audit entry could not be written. The
/// primary mutation is still committed in that case; callers surface the
/// flag instead of an error.
#[derive(Debug, Clone)]
pub struct ShipmentChange {
    pub shipment: shipment::Model,
    pub history_recorded: bool,
}

/// Result of rebilling: the closed original and its fresh replacement.
#[derive(Debug, Clone)]
pub struct RebillOutcome {
    pub original: shipment::Model,
    pub replacement: shipment::Model,
    pub history_recorded: bool,
}

/// Partial update of the identifying fields.
#[derive(Debug, Clone, Default)]
pub struct IdentityEdit {
    pub shipment_number: Option<String>,
    pub invoice_number: Option<String>,
    pub client_name: Option<String>,
}

/// Coarse status buckets used by the listing screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGroup {
    Awaiting,
    Loading,
    Route,
    Cancelled,
    Rebilled,
}

impl StatusGroup {
    pub fn statuses(&self) -> &'static [ShipmentStatus] {
        match self {
            StatusGroup::Awaiting => &[
                ShipmentStatus::AwaitingScheduling,
                ShipmentStatus::Scheduled,
            ],
            StatusGroup::Loading => &[ShipmentStatus::AwaitingLoading, ShipmentStatus::Loaded],
            StatusGroup::Route => &[ShipmentStatus::InTransit, ShipmentStatus::Delivered],
            StatusGroup::Cancelled => &[ShipmentStatus::Cancelled],
            StatusGroup::Rebilled => &[ShipmentStatus::Rebilled],
        }
    }
}

/// Filters for the shipment listing.
#[derive(Debug, Clone, Default)]
pub struct ShipmentListFilter {
    pub status: Option<ShipmentStatus>,
    pub group: Option<StatusGroup>,
    pub carrier_name: Option<String>,
    pub without_carrier: bool,
    pub search: Option<String>,
}

/// A cancelled shipment with its cancellation moment derived from history.
#[derive(Debug, Clone)]
pub struct CancelledShipment {
    pub shipment: shipment::Model,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
}

/// Service for managing shipments and their audit ledger
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ShipmentService {
    /// Creates a new shipment service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new shipment in `awaiting_scheduling`
    #[instrument(skip(self))]
    pub async fn create_shipment(
        &self,
        input: NewShipment,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let db = &*self.db_pool;

        let model = shipment::Model::new(
            input.shipment_number,
            input.invoice_number,
            input.client_name,
            input.carrier_name,
        )?;

        let active = shipment::ActiveModel {
            shipment_number: Set(model.shipment_number),
            invoice_number: Set(model.invoice_number),
            client_name: Set(model.client_name),
            carrier_name: Set(model.carrier_name),
            status: Set(model.status),
            label_created: Set(false),
            label_received: Set(false),
            created_at: Set(model.created_at),
            ..Default::default()
        };
        let inserted = active.insert(db).await.map_err(ServiceError::db_error)?;

        let recorded = self
            .append_history(inserted.id, "created", "Shipment created.".to_string(), actor)
            .await;
        self.publish(Event::ShipmentCreated(inserted.id)).await;

        Ok(ShipmentChange {
            shipment: inserted,
            history_recorded: recorded,
        })
    }

    /// Gets a shipment by ID
    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        self.load(shipment_id).await
    }

    /// Lists shipments with filters and pagination, newest first
    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        filter: &ShipmentListFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = shipment::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(shipment::Column::Status.eq(status));
        }
        if let Some(group) = filter.group {
            query = query.filter(
                shipment::Column::Status.is_in(group.statuses().iter().copied()),
            );
        }
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

        let paginator = query
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let shipments = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((shipments, total))
    }

    /// Gets the audit ledger of a shipment, newest entries first
    #[instrument(skip(self))]
    pub async fn get_history(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<shipment_history::Model>, ServiceError> {
        let db = &*self.db_pool;
        // 404 for unknown shipments rather than an empty ledger
        self.load(shipment_id).await?;

        shipment_history::Entity::find()
            .filter(shipment_history::Column::ShipmentId.eq(shipment_id))
            .order_by_desc(shipment_history::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists cancelled shipments with the cancellation moment and actor
    /// derived from the latest "cancelled" ledger entry. The optional period
    /// bounds filter on that derived timestamp.
    #[instrument(skip(self))]
    pub async fn list_cancelled(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<CancelledShipment>, ServiceError> {
        let db = &*self.db_pool;

        let shipments = shipment::Entity::find()
            .filter(shipment::Column::Status.eq(ShipmentStatus::Cancelled))
            .order_by_desc(shipment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if shipments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = shipments.iter().map(|s| s.id).collect();
        let entries = shipment_history::Entity::find()
            .filter(shipment_history::Column::ShipmentId.is_in(ids))
            .filter(shipment_history::Column::Status.eq(ShipmentStatus::Cancelled.as_str()))
            .order_by_asc(shipment_history::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        // Ascending order, so the last write per shipment wins
        let mut latest: HashMap<Uuid, shipment_history::Model> = HashMap::new();
        for entry in entries {
            latest.insert(entry.shipment_id, entry);
        }

        let mut result: Vec<CancelledShipment> = shipments
            .into_iter()
            .map(|shipment| {
                let entry = latest.get(&shipment.id);
                CancelledShipment {
                    cancelled_at: entry.map(|e| e.created_at),
                    cancelled_by: entry.map(|e| e.actor.clone()),
                    shipment,
                }
            })
            .collect();

        if from.is_some() || to.is_some() {
            result.retain(|c| match c.cancelled_at {
                Some(at) => {
                    from.map_or(true, |lower| at >= lower) && to.map_or(true, |upper| at <= upper)
                }
                None => false,
            });
        }

        Ok(result)
    }

    /// Books the delivery date and moves the shipment to `scheduled`
    #[instrument(skip(self))]
    pub async fn schedule_delivery(
        &self,
        shipment_id: Uuid,
        scheduled_for: DateTime<Utc>,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.schedule_delivery(scheduled_for)?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::Scheduled.as_str(),
                format!(
                    "Delivery scheduled for {}",
                    scheduled_for.format("%Y-%m-%d %H:%M")
                ),
                actor,
            )
            .await;
        self.publish(Event::DeliveryScheduled {
            shipment_id,
            scheduled_for,
        })
        .await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Books the loading date without changing the lifecycle status
    #[instrument(skip(self))]
    pub async fn schedule_loading(
        &self,
        shipment_id: Uuid,
        scheduled_for: DateTime<Utc>,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.schedule_loading(scheduled_for)?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "loading_scheduled",
                format!(
                    "Loading scheduled for {}",
                    scheduled_for.format("%Y-%m-%d %H:%M")
                ),
                actor,
            )
            .await;
        self.publish(Event::LoadingScheduled {
            shipment_id,
            scheduled_for,
        })
        .await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Marks the shipment loaded and immediately in transit. Appends one
    /// ledger entry per step of the compound transition.
    #[instrument(skip(self))]
    pub async fn mark_loaded(
        &self,
        shipment_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.mark_loaded()?;
        let updated = self.persist(shipment).await?;

        let loaded_recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::Loaded.as_str(),
                "Shipment loaded.".to_string(),
                actor,
            )
            .await;
        let transit_recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::InTransit.as_str(),
                "Shipment out for delivery.".to_string(),
                actor,
            )
            .await;
        self.publish(Event::ShipmentLoaded(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: loaded_recorded && transit_recorded,
        })
    }

    /// Confirms delivery
    #[instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        shipment_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.mark_delivered()?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::Delivered.as_str(),
                format!("Delivery confirmed at {}", Utc::now().format("%Y-%m-%d %H:%M")),
                actor,
            )
            .await;
        self.publish(Event::ShipmentDelivered(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Cancels the shipment, recording the reason in its notes
    #[instrument(skip(self))]
    pub async fn cancel_shipment(
        &self,
        shipment_id: Uuid,
        reason: &str,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "cancellation reason must not be empty".to_string(),
            ));
        }

        let mut shipment = self.load(shipment_id).await?;
        shipment.cancel(reason)?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::Cancelled.as_str(),
                format!("Cancelled. Reason: {}", reason.trim()),
                actor,
            )
            .await;
        self.publish(Event::ShipmentCancelled {
            shipment_id,
            reason: reason.trim().to_string(),
        })
        .await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Reopens a cancelled shipment into `awaiting_scheduling`
    #[instrument(skip(self))]
    pub async fn restore_shipment(
        &self,
        shipment_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.restore()?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "restored",
                "Shipment restored from cancelled status.".to_string(),
                actor,
            )
            .await;
        self.publish(Event::ShipmentRestored(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Closes the shipment as rebilled and creates its replacement under the
    /// new numbers, carrying over the client name.
    ///
    /// The replacement is inserted before the original is touched: if that
    /// insert fails the whole operation aborts with the original unchanged.
    #[instrument(skip(self))]
    pub async fn rebill_shipment(
        &self,
        shipment_id: Uuid,
        new_shipment_number: &str,
        new_invoice_number: &str,
        actor: &str,
    ) -> Result<RebillOutcome, ServiceError> {
        let db = &*self.db_pool;

        let mut original = self.load(shipment_id).await?;
        original.mark_rebilled()?;

        let replacement = shipment::Model::new(
            new_shipment_number,
            new_invoice_number,
            original.client_name.clone(),
            None,
        )?;
        let replacement_active = shipment::ActiveModel {
            shipment_number: Set(replacement.shipment_number),
            invoice_number: Set(replacement.invoice_number),
            client_name: Set(replacement.client_name),
            carrier_name: Set(None),
            status: Set(ShipmentStatus::AwaitingScheduling),
            label_created: Set(false),
            label_received: Set(false),
            created_at: Set(replacement.created_at),
            ..Default::default()
        };
        let inserted = replacement_active
            .insert(db)
            .await
            .map_err(ServiceError::db_error)?;

        let updated_original = self.persist(original).await?;

        let original_recorded = self
            .append_history(
                shipment_id,
                ShipmentStatus::Rebilled.as_str(),
                format!(
                    "Rebilled into new shipment {}, new invoice {}.",
                    inserted.shipment_number, inserted.invoice_number
                ),
                actor,
            )
            .await;
        let replacement_recorded = self
            .append_history(
                inserted.id,
                "created",
                format!("Created from shipment {}.", updated_original.shipment_number),
                actor,
            )
            .await;
        self.publish(Event::ShipmentRebilled {
            original_id: shipment_id,
            replacement_id: inserted.id,
        })
        .await;

        Ok(RebillOutcome {
            original: updated_original,
            replacement: inserted,
            history_recorded: original_recorded && replacement_recorded,
        })
    }

    /// Assigns a carrier, snapshotting its current name onto the shipment
    #[instrument(skip(self))]
    pub async fn assign_carrier(
        &self,
        shipment_id: Uuid,
        carrier_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let db = &*self.db_pool;

        let carrier = crate::entities::carrier::Entity::find_by_id(carrier_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Carrier {} not found", carrier_id)))?;

        let mut shipment = self.load(shipment_id).await?;
        shipment.assign_carrier(&carrier.name)?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "carrier_assigned",
                format!("Carrier assigned: {}.", carrier.name),
                actor,
            )
            .await;
        self.publish(Event::CarrierAssigned {
            shipment_id,
            carrier_name: carrier.name,
        })
        .await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Sets how the freight will be loaded
    #[instrument(skip(self))]
    pub async fn set_loading_type(
        &self,
        shipment_id: Uuid,
        loading_type: LoadingType,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.set_loading_type(loading_type)?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "loading_type_set",
                format!("Loading type set to {}.", loading_type),
                actor,
            )
            .await;
        self.publish(Event::LoadingTypeSet {
            shipment_id,
            loading_type,
        })
        .await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Confirms the shipment label was created
    #[instrument(skip(self))]
    pub async fn confirm_label_created(
        &self,
        shipment_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.confirm_label_created()?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "label_created",
                "Shipment label created.".to_string(),
                actor,
            )
            .await;
        self.publish(Event::LabelCreated(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Confirms the shipment label was received back
    #[instrument(skip(self))]
    pub async fn confirm_label_received(
        &self,
        shipment_id: Uuid,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        shipment.confirm_label_received()?;
        let updated = self.persist(shipment).await?;

        let recorded = self
            .append_history(
                shipment_id,
                "label_received",
                "Shipment label received.".to_string(),
                actor,
            )
            .await;
        self.publish(Event::LabelReceived(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Edits the identifying fields, recording field-level diffs in the ledger
    #[instrument(skip(self))]
    pub async fn update_identity(
        &self,
        shipment_id: Uuid,
        edit: IdentityEdit,
        actor: &str,
    ) -> Result<ShipmentChange, ServiceError> {
        let mut shipment = self.load(shipment_id).await?;
        let changes = shipment.edit_identity(
            edit.shipment_number.as_deref(),
            edit.invoice_number.as_deref(),
            edit.client_name.as_deref(),
        )?;
        shipment.validate().map_err(ServiceError::from)?;
        let updated = self.persist(shipment).await?;

        let description = if changes.is_empty() {
            "Edit: no fields changed.".to_string()
        } else {
            format!("Edit: {}.", changes.join(" | "))
        };
        let recorded = self
            .append_history(shipment_id, "shipment_edited", description, actor)
            .await;
        self.publish(Event::ShipmentEdited(shipment_id)).await;

        Ok(ShipmentChange {
            shipment: updated,
            history_recorded: recorded,
        })
    }

    /// Deletes a shipment together with its whole ledger
    #[instrument(skip(self))]
    pub async fn delete_shipment(&self, shipment_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.load(shipment_id).await?;

        // Ledger first, then the shipment. The FK cascade would cover this,
        // but doing it explicitly keeps the contract visible.
        shipment_history::Entity::delete_many()
            .filter(shipment_history::Column::ShipmentId.eq(shipment_id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        shipment::Entity::delete_by_id(shipment_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        self.publish(Event::ShipmentDeleted(shipment_id)).await;
        Ok(())
    }

    async fn load(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        shipment::Entity::find_by_id(shipment_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))
    }

    /// Writes every column of the mutated model back.
    async fn persist(&self, shipment: shipment::Model) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let active = shipment::ActiveModel {
            id: Unchanged(shipment.id),
            shipment_number: Set(shipment.shipment_number),
            invoice_number: Set(shipment.invoice_number),
            client_name: Set(shipment.client_name),
            carrier_name: Set(shipment.carrier_name),
            status: Set(shipment.status),
            loading_type: Set(shipment.loading_type),
            scheduled_delivery_at: Set(shipment.scheduled_delivery_at),
            scheduled_loading_at: Set(shipment.scheduled_loading_at),
            loaded_at: Set(shipment.loaded_at),
            dispatched_at: Set(shipment.dispatched_at),
            label_created: Set(shipment.label_created),
            label_created_at: Set(shipment.label_created_at),
            label_received: Set(shipment.label_received),
            label_received_at: Set(shipment.label_received_at),
            notes: Set(shipment.notes),
            created_at: Set(shipment.created_at),
            updated_at: Set(shipment.updated_at),
        };
        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Appends one ledger entry. Failure is tolerated: the primary mutation
    /// has already been committed, so the miss is logged and reported through
    /// the returned flag instead of an error.
    async fn append_history(
        &self,
        shipment_id: Uuid,
        status: &str,
        description: String,
        actor: &str,
    ) -> bool {
        let db = &*self.db_pool;
        let entry = shipment_history::ActiveModel {
            shipment_id: Set(shipment_id),
            status: Set(status.to_string()),
            description: Set(description),
            actor: Set(actor.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        match entry.insert(db).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    %shipment_id,
                    status,
                    error = %e,
                    "history append failed after a successful shipment update"
                );
                false
            }
        }
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}

/// Case-insensitive match over the three searchable identifier columns.
pub(crate) fn search_condition(term: &str) -> Condition {
    let needle = format!("%{}%", term.trim().to_lowercase());
    Condition::any()
        .add(
            Expr::expr(Func::lower(Expr::col(shipment::Column::ShipmentNumber)))
                .like(needle.clone()),
        )
        .add(
            Expr::expr(Func::lower(Expr::col(shipment::Column::InvoiceNumber)))
                .like(needle.clone()),
        )
        .add(Expr::expr(Func::lower(Expr::col(shipment::Column::ClientName))).like(needle))
}
