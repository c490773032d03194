use crate::{
    db::DbPool,
    entities::carrier,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, Unchanged};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Input for registering a carrier.
#[derive(Debug, Clone)]
pub struct NewCarrier {
    pub name: String,
    pub tax_id: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Partial update of a carrier record.
#[derive(Debug, Clone, Default)]
pub struct CarrierUpdate {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Service for managing the carrier registry
#[derive(Clone)]
pub struct CarrierService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl CarrierService {
    /// Creates a new carrier service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers a carrier
    #[instrument(skip(self))]
    pub async fn create_carrier(&self, input: NewCarrier) -> Result<carrier::Model, ServiceError> {
        let db = &*self.db_pool;

        let model = carrier::Model {
            id: Uuid::new_v4(),
            name: input.name,
            tax_id: input.tax_id,
            email: input.email,
            phone: input.phone,
            created_at: Utc::now(),
        };
        model.validate()?;

        let active = carrier::ActiveModel {
            id: Set(model.id),
            name: Set(model.name),
            tax_id: Set(model.tax_id),
            email: Set(model.email),
            phone: Set(model.phone),
            created_at: Set(model.created_at),
        };
        let inserted = active.insert(db).await.map_err(ServiceError::db_error)?;

        self.publish(Event::CarrierCreated(inserted.id)).await;
        Ok(inserted)
    }

    /// Gets a carrier by ID
    #[instrument(skip(self))]
    pub async fn get_carrier(&self, carrier_id: Uuid) -> Result<carrier::Model, ServiceError> {
        self.load(carrier_id).await
    }

    /// Lists all carriers in alphabetical order
    #[instrument(skip(self))]
    pub async fn list_carriers(&self) -> Result<Vec<carrier::Model>, ServiceError> {
        let db = &*self.db_pool;
        carrier::Entity::find()
            .order_by_asc(carrier::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Updates a carrier's registry data.
    ///
    /// Shipments keep the carrier name they were assigned under; updates here
    /// never rewrite those snapshots.
    #[instrument(skip(self))]
    pub async fn update_carrier(
        &self,
        carrier_id: Uuid,
        update: CarrierUpdate,
    ) -> Result<carrier::Model, ServiceError> {
        let db = &*self.db_pool;
        let mut carrier = self.load(carrier_id).await?;

        if let Some(name) = update.name {
            carrier.name = name;
        }
        if let Some(tax_id) = update.tax_id {
            carrier.tax_id = tax_id;
        }
        if let Some(email) = update.email {
            carrier.email = email;
        }
        if let Some(phone) = update.phone {
            carrier.phone = if phone.trim().is_empty() {
                None
            } else {
                Some(phone)
            };
        }
        carrier.validate()?;

        let active = carrier::ActiveModel {
            id: Unchanged(carrier.id),
            name: Set(carrier.name),
            tax_id: Set(carrier.tax_id),
            email: Set(carrier.email),
            phone: Set(carrier.phone),
            created_at: Set(carrier.created_at),
        };
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        self.publish(Event::CarrierUpdated(updated.id)).await;
        Ok(updated)
    }

    /// Removes a carrier from the registry
    #[instrument(skip(self))]
    pub async fn delete_carrier(&self, carrier_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.load(carrier_id).await?;

        carrier::Entity::delete_by_id(carrier_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        self.publish(Event::CarrierDeleted(carrier_id)).await;
        Ok(())
    }

    async fn load(&self, carrier_id: Uuid) -> Result<carrier::Model, ServiceError> {
        let db = &*self.db_pool;
        carrier::Entity::find_by_id(carrier_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Carrier {} not found", carrier_id)))
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}
